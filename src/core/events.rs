//! 连接事件通道 - 每个连接的发布/订阅机制
//! Connection Event Channel - Per-connection publish/subscribe mechanism
//!
//! 事件名是一个封闭的枚举集合。监听器分为持久监听器和一次性监听器两种模式，
//! 按注册顺序同步调用。
//!
//! Event names form a closed enumerated set. Listeners are either persistent or
//! one-shot and are invoked synchronously, in registration order.

use crate::error::Error;
use std::{
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::trace;

/// The closed set of event names a connection can emit.
/// 连接可以发出的封闭事件名集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connecting,
    Connected,
    Open,
    Error,
    Disconnecting,
    Disconnected,
}

impl EventKind {
    /// All event kinds, in lifecycle order.
    /// 所有事件类型，按生命周期顺序排列。
    pub const ALL: [EventKind; 6] = [
        EventKind::Connecting,
        EventKind::Connected,
        EventKind::Open,
        EventKind::Error,
        EventKind::Disconnecting,
        EventKind::Disconnected,
    ];

    /// The driver-facing event name.
    /// 面向驱动程序的事件名。
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Connecting => "connecting",
            EventKind::Connected => "connected",
            EventKind::Open => "open",
            EventKind::Error => "error",
            EventKind::Disconnecting => "disconnecting",
            EventKind::Disconnected => "disconnected",
        }
    }

    /// Looks an event kind up by its driver-facing name.
    /// 通过面向驱动程序的事件名查找事件类型。
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An emitted event together with its payload.
/// 带有载荷的已发出事件。
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connecting,
    Connected,
    Open,
    /// The open attempt failed. The error is never absent.
    /// 打开尝试失败。错误总是存在。
    Error(Error),
    Disconnecting,
    Disconnected,
}

impl ConnectionEvent {
    /// The kind listeners subscribe to.
    /// 监听器订阅的事件类型。
    pub fn kind(&self) -> EventKind {
        match self {
            ConnectionEvent::Connecting => EventKind::Connecting,
            ConnectionEvent::Connected => EventKind::Connected,
            ConnectionEvent::Open => EventKind::Open,
            ConnectionEvent::Error(_) => EventKind::Error,
            ConnectionEvent::Disconnecting => EventKind::Disconnecting,
            ConnectionEvent::Disconnected => EventKind::Disconnected,
        }
    }

    /// Returns the error carried by an `Error` event.
    /// 返回 `Error` 事件携带的错误。
    pub fn error(&self) -> Option<&Error> {
        match self {
            ConnectionEvent::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// Handle returned by a subscription, used to unsubscribe.
/// 订阅返回的句柄，用于取消订阅。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Delivery mode of a listener.
/// 监听器的投递模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerMode {
    /// Invoked on every matching emission.
    /// 每次匹配的事件发出时都会调用。
    Persistent,
    /// Invoked on the first matching emission, then removed.
    /// 在第一次匹配的事件发出时调用，然后移除。
    Once,
}

/// Listener callback. `S` is the emitting object handed to every listener.
/// 监听器回调。`S` 是传递给每个监听器的发出者对象。
pub type Listener<S> = Arc<dyn Fn(&S, &ConnectionEvent) + Send + Sync>;

struct ListenerEntry<S> {
    id: ListenerId,
    kind: EventKind,
    mode: ListenerMode,
    callback: Listener<S>,
}

impl<S> Clone for ListenerEntry<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind,
            mode: self.mode,
            callback: Arc::clone(&self.callback),
        }
    }
}

/// A per-object event channel.
///
/// The listener list is only locked while it is read or modified, never while
/// a listener runs, so listeners may subscribe or unsubscribe re-entrantly.
/// An emission delivers to the snapshot of listeners taken when it started.
///
/// 每个对象的事件通道。
///
/// 监听器列表只在读取或修改时加锁，监听器运行时从不持有锁，
/// 因此监听器可以重入地订阅或取消订阅。一次发出会投递给发出开始时的监听器快照。
pub struct EventChannel<S> {
    listeners: Mutex<Vec<ListenerEntry<S>>>,
    next_id: AtomicU64,
}

impl<S> fmt::Debug for EventChannel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("listeners_count", &self.lock().len())
            .finish()
    }
}

impl<S> Default for EventChannel<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> EventChannel<S> {
    /// Creates a channel with no listeners.
    /// 创建一个没有监听器的通道。
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ListenerEntry<S>>> {
        // A listener panicking cannot leave the list half-updated: it never
        // runs under the lock.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self, kind: EventKind, mode: ListenerMode, callback: Listener<S>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(ListenerEntry {
            id,
            kind,
            mode,
            callback,
        });
        trace!(event = %kind, ?mode, ?id, "Listener registered");
        id
    }

    /// 注册持久监听器
    /// Registers a persistent listener.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&S, &ConnectionEvent) + Send + Sync + 'static,
    {
        self.subscribe(kind, ListenerMode::Persistent, Arc::new(listener))
    }

    /// 注册一次性监听器
    /// Registers a listener that is delivered at most once.
    pub fn once<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&S, &ConnectionEvent) + Send + Sync + 'static,
    {
        self.subscribe(kind, ListenerMode::Once, Arc::new(listener))
    }

    /// 移除监听器
    /// Removes a listener. Returns `false` if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }

    /// Removes every listener for every event.
    /// 移除所有事件的所有监听器。
    pub fn remove_all_listeners(&self) {
        self.lock().clear();
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.lock().iter().filter(|entry| entry.kind == kind).count()
    }

    /// 发出事件
    /// Emits an event to every listener registered for its kind.
    ///
    /// Returns the number of listeners invoked. Once-listeners are taken out of
    /// the live list in the same critical section that builds the snapshot, so
    /// two concurrent emissions can never both deliver to the same one.
    ///
    /// 返回被调用的监听器数量。一次性监听器在构建快照的同一临界区内从列表中移除，
    /// 因此两个并发的发出永远不会同时投递给同一个一次性监听器。
    pub fn emit(&self, source: &S, event: &ConnectionEvent) -> usize {
        let kind = event.kind();
        let snapshot: Vec<ListenerEntry<S>> = {
            let mut listeners = self.lock();
            let snapshot = listeners
                .iter()
                .filter(|entry| entry.kind == kind)
                .cloned()
                .collect();
            listeners.retain(|entry| !(entry.kind == kind && entry.mode == ListenerMode::Once));
            snapshot
        };

        trace!(event = %kind, listeners = snapshot.len(), "Emitting event");
        for entry in &snapshot {
            (entry.callback)(source, event);
        }
        snapshot.len()
    }
}
