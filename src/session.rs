//! 会话 - 连接工厂的公共入口
//! Session - The public entry point of the connection factory
//!
//! 会话是一个显式的上下文对象，拥有自己的连接注册表、默认连接槽位、
//! 模型注册表、数据存储以及模拟失败配置。不同会话之间不共享任何状态。
//!
//! A session is an explicit context object owning its connection registry,
//! default-connection slot, model registry, data store, and simulated-failure
//! configuration. Nothing is shared between sessions.

use crate::{
    config::{Config, TargetDefaults},
    connection::Connection,
    core::{
        lifecycle::{LifecycleDriver, LifecycleScheduler, OpenCallback},
        target::{ConnectArgs, ConnectionTarget},
    },
    error::Result,
    store::{DataStore, MemoryStore, Model},
};
use dashmap::DashMap;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tracing::{info, warn};

pub mod registry;

use registry::{ConnectionRegistry, Resolution};

/// State shared by a session and every connection it creates.
/// 会话及其创建的所有连接共享的状态。
pub(crate) struct SessionContext {
    config: Config,
    store: Arc<dyn DataStore>,
    models: DashMap<String, Model>,
    scheduler: LifecycleScheduler,
    next_connection_id: AtomicU64,
}

impl SessionContext {
    pub(crate) fn new(config: Config, store: Arc<dyn DataStore>) -> Self {
        Self {
            config,
            store,
            models: DashMap::new(),
            scheduler: LifecycleScheduler::new(),
            next_connection_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    pub(crate) fn scheduler(&self) -> &LifecycleScheduler {
        &self.scheduler
    }

    pub(crate) fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Session-level model lookup by registry key.
    pub(crate) fn model(&self, key: &str) -> Option<Model> {
        self.models.get(key).map(|model| model.clone())
    }
}

/// A handle to a simulated driver session.
///
/// Cloning the handle shares the session.
///
/// 模拟驱动会话的句柄。克隆句柄会共享同一个会话。
#[derive(Clone)]
pub struct Session {
    context: Arc<SessionContext>,
    registry: Arc<ConnectionRegistry>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.context.config)
            .field("registry", &self.registry)
            .field("models", &self.context.models.len())
            .field("scheduler", &self.context.scheduler)
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a session with the default configuration and an in-memory store.
    /// 使用默认配置和内存存储创建会话。
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn config(&self) -> &Config {
        self.context.config()
    }

    pub fn store(&self) -> Arc<dyn DataStore> {
        self.context.store().clone()
    }

    /// 建立默认连接
    /// Returns the default connection, creating it on first call.
    ///
    /// The open lifecycle is queued, not started: it runs once the caller
    /// awaits the session or one of its connections, so listeners registered
    /// before that observe every event.
    ///
    /// Only the call that creates the default connection schedules an open
    /// lifecycle; later calls return the same connection whatever their
    /// arguments, and existing listeners are not notified again.
    ///
    /// 只有创建默认连接的那次调用会调度打开生命周期；之后的调用无论参数如何
    /// 都返回同一个连接，已有的监听器不会再次收到通知。
    pub fn connect(&self, args: impl Into<ConnectArgs>) -> Connection {
        self.connect_inner(args.into(), None)
    }

    /// Like [`connect`](Self::connect), reporting the outcome to `callback`.
    ///
    /// When the default connection already exists, `callback` receives the
    /// settled outcome of its existing open attempt.
    ///
    /// 与 [`connect`](Self::connect) 相同，并将结果报告给 `callback`。
    /// 默认连接已存在时，`callback` 接收其已有打开尝试的最终结果。
    pub fn connect_with_callback<F>(&self, args: impl Into<ConnectArgs>, callback: F) -> Connection
    where
        F: FnOnce(Result<Connection>) + Send + 'static,
    {
        self.connect_inner(args.into(), Some(Box::new(callback)))
    }

    /// 创建额外连接
    /// Always creates, registers, and opens a new connection.
    pub fn create_connection(&self, args: impl Into<ConnectArgs>) -> Connection {
        self.create_connection_inner(args.into(), None)
    }

    /// Like [`create_connection`](Self::create_connection), reporting the
    /// outcome to `callback`.
    pub fn create_connection_with_callback<F>(
        &self,
        args: impl Into<ConnectArgs>,
        callback: F,
    ) -> Connection
    where
        F: FnOnce(Result<Connection>) + Send + 'static,
    {
        self.create_connection_inner(args.into(), Some(Box::new(callback)))
    }

    fn connect_inner(&self, args: ConnectArgs, callback: Option<OpenCallback>) -> Connection {
        let mut pending = None;
        let Resolution {
            connection,
            created,
        } = self.registry.resolve_default(|| {
            let (connection, target) = self.build_connection(&args);
            pending = Some(target);
            connection
        });

        match (created, pending) {
            (true, Some(target)) => {
                LifecycleDriver::schedule_open(connection.clone(), target, callback);
            }
            _ => {
                if let Some(callback) = callback {
                    LifecycleDriver::schedule_report(connection.clone(), callback);
                }
            }
        }
        connection
    }

    fn create_connection_inner(&self, args: ConnectArgs, callback: Option<OpenCallback>) -> Connection {
        let mut pending = None;
        let Resolution { connection, .. } = self.registry.resolve_named(|| {
            let (connection, target) = self.build_connection(&args);
            pending = Some(target);
            connection
        });

        if let Some(target) = pending {
            LifecycleDriver::schedule_open(connection.clone(), target, callback);
        }
        connection
    }

    /// Normalizes `args` and builds an unopened connection. A normalization
    /// failure is carried along for the lifecycle to report; it is never
    /// raised here.
    ///
    /// 规范化 `args` 并构建一个未打开的连接。规范化失败会交由生命周期报告，
    /// 不会在此处抛出。
    fn build_connection(
        &self,
        args: &ConnectArgs,
    ) -> (Connection, Result<ConnectionTarget>) {
        let target = args.normalize(&self.context.config().defaults);
        let (key, resolved) = match &target {
            Ok(target) => (target.key(), Some(target.clone())),
            Err(err) => {
                warn!(input = args.raw_uri(), %err, "Connection arguments rejected, failure deferred");
                (args.raw_uri().to_string(), None)
            }
        };
        (Connection::new(self.context.clone(), key, resolved), target)
    }

    /// The default connection, if `connect` has been called.
    /// 默认连接（如果已调用过 `connect`）。
    pub fn connection(&self) -> Option<Connection> {
        self.registry.default_connection()
    }

    /// All connections of this session, in creation order.
    /// 此会话的所有连接，按创建顺序排列。
    pub fn connections(&self) -> Vec<Connection> {
        self.registry.connections()
    }

    /// Returns the model registered under `name`. Names are case-insensitive.
    ///
    /// A session-level model wins; otherwise the first connection, in creation
    /// order, that defined a model of that name provides it. When neither
    /// exists a session-level model is defined, operating on the default
    /// connection.
    ///
    /// 返回以 `name` 注册的模型，名称不区分大小写。优先返回会话级模型；否则由
    /// 按创建顺序第一个定义了该名称模型的连接提供；两者都不存在时定义一个使用
    /// 默认连接的会话级模型。
    pub fn model(&self, name: &str) -> Model {
        let key = Model::registry_key(name);
        if let Some(model) = self.context.model(&key) {
            return model;
        }
        if let Some(model) = self
            .connections()
            .iter()
            .find_map(|connection| connection.defined_model(&key))
        {
            return model;
        }
        self.context
            .models
            .entry(key)
            .or_insert_with(|| Model::bound_to_default(name, Arc::downgrade(&self.registry)))
            .clone()
    }

    /// 等待会话空闲
    /// Lets every deferred lifecycle of the session run, and waits until all of
    /// them, completion callbacks included, have finished.
    ///
    /// Lifecycles only advance while the caller awaits the session or one of
    /// its connections; this is the way to drive them when the caller only
    /// observes through callbacks or listeners.
    ///
    /// 让会话所有延迟的生命周期运行，并等待它们（包括完成回调）全部结束。
    /// 生命周期只在调用方等待会话或其连接时推进；当调用方只通过回调或监听器
    /// 观察时，用此方法驱动它们。
    pub async fn idle(&self) -> Result<()> {
        self.context.scheduler().idle().await
    }

    /// Closes every connection of the session. All connections are closed even
    /// when one fails; the first failure is returned.
    ///
    /// 关闭会话的所有连接。即使某个连接失败也会关闭所有连接；返回第一个失败。
    pub async fn disconnect(&self) -> Result<()> {
        let connections = self.connections();
        info!(connections = connections.len(), "Disconnecting session");

        let mut first_error = None;
        for connection in connections {
            if let Err(err) = connection.close().await {
                warn!(conn_id = connection.id(), %err, "Failed to close connection");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Builder for a [`Session`].
/// [`Session`] 的构建器。
#[derive(Default)]
pub struct SessionBuilder {
    config: Config,
    store: Option<Arc<dyn DataStore>>,
}

impl SessionBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Makes every open attempt of the session fail.
    /// 使会话的每次打开尝试都失败。
    pub fn simulate_error(mut self, simulate_error: bool) -> Self {
        self.config.lifecycle.simulate_error = simulate_error;
        self
    }

    pub fn open_delay(mut self, delay: Duration) -> Self {
        self.config.lifecycle.open_delay = delay;
        self
    }

    pub fn defaults(mut self, defaults: TargetDefaults) -> Self {
        self.config.defaults = defaults;
        self
    }

    /// Replaces the in-memory store with another data layer.
    /// 用另一个数据层替换内存存储。
    pub fn store<S: DataStore>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn shared_store(mut self, store: Arc<dyn DataStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Session {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn DataStore>);
        Session {
            context: Arc::new(SessionContext::new(self.config, store)),
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }
}
