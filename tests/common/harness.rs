//! tests/common/harness.rs
#![allow(dead_code)]

use mockgoose::{Connection, ConnectionEvent, EventKind, Result, Session};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::oneshot;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "mockgoose=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Upper bound for any single lifecycle to settle in tests.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// One observed emission: the event and the readiness code seen by the listener.
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    pub kind: EventKind,
    pub ready_state: u8,
    pub error: Option<mockgoose::Error>,
}

/// Records every event a connection emits, together with the readiness
/// the listener observed at delivery time.
#[derive(Clone, Default)]
pub struct EventRecorder {
    seen: Arc<Mutex<Vec<Observed>>>,
}

impl EventRecorder {
    pub fn attach(connection: &Connection) -> Self {
        let recorder = Self::default();
        for kind in EventKind::ALL {
            let seen = recorder.seen.clone();
            connection.on(kind, move |conn: &Connection, event: &ConnectionEvent| {
                seen.lock().unwrap().push(Observed {
                    kind: event.kind(),
                    ready_state: conn.ready_state().code(),
                    error: event.error().cloned(),
                });
            });
        }
        recorder
    }

    pub fn events(&self) -> Vec<Observed> {
        self.seen.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<(EventKind, u8)> {
        self.events()
            .into_iter()
            .map(|observed| (observed.kind, observed.ready_state))
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events().iter().filter(|observed| observed.kind == kind).count()
    }
}

/// Builds a completion callback and the receiver it reports to.
pub fn callback() -> (
    impl FnOnce(Result<Connection>) + Send + 'static,
    oneshot::Receiver<Result<Connection>>,
) {
    let (tx, rx) = oneshot::channel();
    let callback = move |result: Result<Connection>| {
        let _ = tx.send(result);
    };
    (callback, rx)
}

/// Drives the session until a callback result arrives, failing the test if it never does.
pub async fn recv_callback(
    session: &Session,
    rx: oneshot::Receiver<Result<Connection>>,
) -> Result<Connection> {
    tokio::time::timeout(SETTLE_TIMEOUT, async {
        session.idle().await.expect("session scheduler closed");
        rx.await
    })
    .await
    .expect("callback was not invoked in time")
    .expect("callback was dropped without being invoked")
}

/// Awaits the open attempt of `connection`, failing the test on timeout.
pub async fn settle(connection: &Connection) -> Result<()> {
    tokio::time::timeout(SETTLE_TIMEOUT, connection.opened())
        .await
        .expect("connection did not settle in time")
}

/// Waits for the first delivery of `kind` and returns what the listener saw.
pub async fn next_event(connection: &Connection, kind: EventKind) -> Observed {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    connection.once(kind, move |conn: &Connection, event: &ConnectionEvent| {
        if let Some(tx) = tx.lock().unwrap().take() {
            let _ = tx.send(Observed {
                kind: event.kind(),
                ready_state: conn.ready_state().code(),
                error: event.error().cloned(),
            });
        }
    });
    // Awaiting the connection lets its deferred lifecycle run.
    let _ = settle(connection).await;
    tokio::time::timeout(SETTLE_TIMEOUT, rx)
        .await
        .expect("event was not emitted in time")
        .expect("listener dropped")
}
