//! The idempotent `connect` entry point and its accepted call shapes.

pub mod common;

use common::harness::{callback, init_tracing, recv_callback, settle};
use mockgoose::{Connection, Model, Options, ReadyState, Session};
use serde_json::json;

/// A session with a default connection and a stored document, mirroring the
/// typical application bootstrap.
struct ConnectedFixture {
    session: Session,
    connection: Connection,
    model: Model,
}

impl ConnectedFixture {
    async fn new() -> Self {
        init_tracing();
        let session = Session::new();
        let connection = session.connect("mongodb://localhost:27017/TestingDB");
        assert_eq!(session.connections().len(), 1);

        let model = session.model("simple");
        model
            .create(json!({"name": "one", "value": "one"}))
            .await
            .unwrap();

        Self {
            session,
            connection,
            model,
        }
    }
}

fn options() -> Options {
    json!({"db": "something"}).as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_connection_is_always_the_same_instance() {
    let fixture = ConnectedFixture::new().await;
    let again = fixture.session.connect("mongodb://localhost:27017/TestingDB2");

    assert_eq!(again, fixture.connection);
    assert_eq!(again.key(), "mongodb://localhost:27017/TestingDB");
    assert_eq!(fixture.session.connections().len(), 1);
}

#[tokio::test]
async fn test_host_database_port_options_and_callback() {
    let fixture = ConnectedFixture::new().await;
    let (cb, rx) = callback();
    fixture.session.connect_with_callback(
        ("mongodb://localhost/", "TestingDB", "8080", options()),
        cb,
    );

    let result = recv_callback(&fixture.session, rx).await.unwrap();
    assert_eq!(result, fixture.connection);
}

#[tokio::test]
async fn test_connect_reports_no_error() {
    let fixture = ConnectedFixture::new().await;
    let (cb, rx) = callback();
    fixture
        .session
        .connect_with_callback("mongodb://localhost:27017/TestingDB", cb);

    let result = recv_callback(&fixture.session, rx).await.unwrap();
    assert_eq!(result.ready_state(), ReadyState::Connected);
}

#[tokio::test]
async fn test_host_only() {
    let fixture = ConnectedFixture::new().await;
    let connection = fixture.session.connect("mongodb://localhost:27017/TestingDB");
    assert_eq!(connection, fixture.connection);
}

#[tokio::test]
async fn test_host_database() {
    let fixture = ConnectedFixture::new().await;
    fixture
        .session
        .connect(("mongodb://localhost:27017/", "TestingDB"));
}

#[tokio::test]
async fn test_host_database_and_callback() {
    let fixture = ConnectedFixture::new().await;
    let (cb, rx) = callback();
    fixture
        .session
        .connect_with_callback(("mongodb://localhost:27017/", "TestingDB"), cb);
    assert!(recv_callback(&fixture.session, rx).await.is_ok());
}

#[tokio::test]
async fn test_host_database_port() {
    let fixture = ConnectedFixture::new().await;
    fixture
        .session
        .connect(("mongodb://localhost:27017/", "TestingDB", 8080u16));
}

#[tokio::test]
async fn test_host_database_port_and_callback() {
    let fixture = ConnectedFixture::new().await;
    let (cb, rx) = callback();
    fixture
        .session
        .connect_with_callback(("mongodb://localhost:27017/", "TestingDB", "8080"), cb);
    assert!(recv_callback(&fixture.session, rx).await.is_ok());
}

#[tokio::test]
async fn test_host_database_port_options() {
    let fixture = ConnectedFixture::new().await;
    fixture.session.connect((
        "mongodb://localhost:27017/",
        "TestingDB",
        8080u16,
        options(),
    ));
}

#[tokio::test]
async fn test_same_model_instance_lowercase() {
    let fixture = ConnectedFixture::new().await;
    assert_eq!(fixture.session.model("simple"), fixture.model);
    assert_eq!(fixture.session.model("Simple"), fixture.model);
    assert_eq!(fixture.model.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_first_connect_with_full_shape_uses_positional_values() {
    init_tracing();
    let session = Session::new();
    let (cb, rx) = callback();
    let connection = session.connect_with_callback(
        ("mongodb://localhost/", "TestingDB", "8080", options()),
        cb,
    );

    let result = recv_callback(&session, rx).await.unwrap();
    assert_eq!(result, connection);

    let target = connection.target().unwrap();
    assert_eq!(target.database(), "TestingDB");
    assert_eq!(target.port(), 8080);
    assert_eq!(target.options()["db"], json!("something"));
}

#[tokio::test]
async fn test_connect_callback_on_failing_session() {
    init_tracing();
    let session = Session::builder().simulate_error(true).build();
    let (cb, rx) = callback();
    let connection = session.connect_with_callback("mongodb://localhost:27017/TestingDB", cb);

    assert!(recv_callback(&session, rx).await.is_err());
    assert_eq!(connection.ready_state(), ReadyState::Disconnected);

    // A repeat call reports the same settled failure.
    let (cb, rx) = callback();
    session.connect_with_callback("mongodb://localhost:27017/TestingDB", cb);
    assert!(recv_callback(&session, rx).await.is_err());
    assert!(settle(&connection).await.is_err());
}

#[tokio::test]
async fn test_models_wait_for_the_connection() {
    init_tracing();
    let session = Session::new();
    session.connect("mongodb://localhost:27017/TestingDB");

    // Created before the lifecycle has run; completes once the connection opens.
    let doc = session
        .model("simple")
        .create(json!({"name": "two"}))
        .await
        .unwrap();
    assert_eq!(doc["name"], json!("two"));
    assert_eq!(doc["_id"].as_str().map(str::len), Some(24));
}
