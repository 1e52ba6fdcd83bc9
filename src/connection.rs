//! 定义了单个模拟的逻辑连接。
//! Defines a single simulated logical connection.

use crate::{
    core::{
        events::{ConnectionEvent, EventChannel, EventKind, ListenerId},
        lifecycle::{LifecycleDriver, StateValidator},
        state::ReadyState,
        target::ConnectionTarget,
    },
    error::{Error, Result},
    session::SessionContext,
    store::Model,
};
use dashmap::DashMap;
use std::{
    fmt,
    sync::{Arc, Weak},
};
use tokio::sync::watch;
use tracing::{trace, warn};

/// The settled result of the open attempt of a connection.
/// 连接打开尝试的最终结果。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OpenOutcome {
    Pending,
    Opened,
    Failed(Error),
}

struct ConnectionInner {
    id: u64,
    key: String,
    target: Option<ConnectionTarget>,
    context: Arc<SessionContext>,
    state: watch::Sender<ReadyState>,
    outcome: watch::Sender<OpenOutcome>,
    events: EventChannel<Connection>,
    models: DashMap<String, Model>,
}

/// A handle to one logical connection.
///
/// Handles are cheap to clone; two handles compare equal only when they refer
/// to the same connection. The readiness state and event channel are driven
/// exclusively by the lifecycle driver; callers read the state and subscribe.
///
/// 一个逻辑连接的句柄。
///
/// 句柄克隆开销很小；只有当两个句柄指向同一个连接时才相等。
/// 就绪状态和事件通道只由生命周期驱动器驱动；调用方只读取状态和订阅事件。
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

/// A non-owning reference to a connection.
/// 对连接的非拥有引用。
#[derive(Clone)]
pub(crate) struct WeakConnection {
    inner: Weak<ConnectionInner>,
}

impl WeakConnection {
    pub(crate) fn upgrade(&self) -> Option<Connection> {
        self.inner.upgrade().map(|inner| Connection { inner })
    }
}

impl Connection {
    pub(crate) fn new(
        context: Arc<SessionContext>,
        key: String,
        target: Option<ConnectionTarget>,
    ) -> Self {
        let id = context.next_connection_id();
        let (state, _) = watch::channel(ReadyState::Disconnected);
        let (outcome, _) = watch::channel(OpenOutcome::Pending);
        Self {
            inner: Arc::new(ConnectionInner {
                id,
                key,
                target,
                context,
                state,
                outcome,
                events: EventChannel::new(),
                models: DashMap::new(),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn context(&self) -> &Arc<SessionContext> {
        &self.inner.context
    }

    /// Session-unique id, used in logs.
    /// 会话内唯一的ID，用于日志。
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The identity key: the normalized target, or the raw input when the
    /// arguments could not be normalized.
    ///
    /// 标识键：规范化后的目标；若参数无法规范化则为原始输入。
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// The normalized target, absent when normalization failed.
    /// 规范化后的目标；规范化失败时不存在。
    pub fn target(&self) -> Option<&ConnectionTarget> {
        self.inner.target.as_ref()
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.inner.state.borrow()
    }

    /// Registers a listener invoked on every `kind` event.
    /// 注册一个在每次 `kind` 事件时调用的监听器。
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Connection, &ConnectionEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, listener)
    }

    /// Registers a listener invoked on the next `kind` event only.
    /// 注册一个只在下一次 `kind` 事件时调用的监听器。
    pub fn once<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Connection, &ConnectionEvent) + Send + Sync + 'static,
    {
        self.inner.events.once(kind, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.events.listener_count(kind)
    }

    pub fn remove_all_listeners(&self) {
        self.inner.events.remove_all_listeners();
    }

    /// Waits until the open attempt of this connection has settled.
    ///
    /// Awaiting it releases the deferred lifecycles of the session. Resolves
    /// once every event and the completion callback of the attempt have run.
    /// Returns the failure of the attempt, if any.
    ///
    /// 等待此连接的打开尝试结束。
    ///
    /// 等待时会释放会话中延迟的生命周期。在该尝试的所有事件和完成回调都执行完毕后
    /// 返回。若尝试失败则返回该错误。
    pub async fn opened(&self) -> Result<()> {
        self.inner.context.scheduler().release();
        let mut rx = self.inner.outcome.subscribe();
        let outcome = rx
            .wait_for(|outcome| *outcome != OpenOutcome::Pending)
            .await
            .map_err(|_| Error::ChannelClosed)?;
        match &*outcome {
            OpenOutcome::Failed(err) => Err(err.clone()),
            _ => Ok(()),
        }
    }

    /// Waits until the readiness state equals `state`.
    /// 等待就绪状态变为 `state`。
    pub async fn wait_for_state(&self, state: ReadyState) -> Result<()> {
        self.inner.context.scheduler().release();
        let mut rx = self.inner.state.subscribe();
        rx.wait_for(|current| *current == state)
            .await
            .map(|_| ())
            .map_err(|_| Error::ChannelClosed)
    }

    /// Closes the connection: `disconnecting` then `disconnected`.
    ///
    /// Waits for a pending open attempt first. Closing a connection that is
    /// already disconnected succeeds without emitting events.
    ///
    /// 关闭连接：先 `disconnecting` 后 `disconnected`。
    ///
    /// 会先等待未完成的打开尝试。关闭一个已断开的连接会直接成功且不发出事件。
    pub async fn close(&self) -> Result<()> {
        LifecycleDriver::close(self).await
    }

    /// Returns the model registered under `name` on this connection, falling
    /// back to the session-level model of the same name, and defining a new
    /// connection-bound model when neither exists. Names are case-insensitive.
    ///
    /// 返回此连接上以 `name` 注册的模型；若没有则回退到会话级同名模型；
    /// 两者都不存在时定义一个绑定到此连接的新模型。名称不区分大小写。
    pub fn model(&self, name: &str) -> Model {
        let key = Model::registry_key(name);
        if let Some(model) = self.defined_model(&key) {
            return model;
        }
        if let Some(model) = self.inner.context.model(&key) {
            return model;
        }
        self.inner
            .models
            .entry(key)
            .or_insert_with(|| Model::bound_to_connection(name, self.downgrade()))
            .clone()
    }

    /// The model this connection itself defined under `key`, if any.
    pub(crate) fn defined_model(&self, key: &str) -> Option<Model> {
        self.inner.models.get(key).map(|model| model.clone())
    }

    /// 尝试转换到新状态
    /// Attempts a validated transition, atomically with respect to other transitions.
    pub(crate) fn transition_to(&self, new_state: ReadyState) -> Result<ReadyState> {
        let mut old_state = ReadyState::Disconnected;
        let applied = self.inner.state.send_if_modified(|current| {
            old_state = *current;
            if StateValidator::is_valid_transition(*current, new_state) {
                *current = new_state;
                true
            } else {
                false
            }
        });

        if applied {
            trace!(conn_id = self.id(), from = %old_state, to = %new_state, "State transition successful");
            Ok(old_state)
        } else {
            warn!(
                conn_id = self.id(),
                current_state = %old_state,
                attempted_state = %new_state,
                "Invalid state transition attempted"
            );
            Err(Error::InvalidTransition {
                from: old_state,
                to: new_state,
            })
        }
    }

    pub(crate) fn emit(&self, event: ConnectionEvent) -> usize {
        self.inner.events.emit(self, &event)
    }

    pub(crate) fn settle(&self, outcome: OpenOutcome) {
        self.inner.outcome.send_replace(outcome);
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Connection {}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("key", &self.inner.key)
            .field("ready_state", &self.ready_state())
            .field("events", &self.inner.events)
            .finish()
    }
}
