//! 连接注册表 - 会话内的连接集合与默认连接槽位
//! Connection Registry - The connections of a session and its default-connection slot

use crate::connection::Connection;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// The result of resolving a connection.
/// 解析连接的结果。
#[derive(Debug, Clone)]
pub struct Resolution {
    pub connection: Connection,
    /// `true` when the connection was created by this resolution and its
    /// lifecycle still has to be scheduled.
    ///
    /// 当连接由本次解析创建、其生命周期尚需调度时为 `true`。
    pub created: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    connections: Vec<Connection>,
    default: Option<Connection>,
}

/// Ordered connections of one session plus its default connection.
///
/// Appends are visible immediately, independent of when the lifecycle of the
/// appended connection completes.
///
/// 一个会话的有序连接及其默认连接。追加操作立即可见，与被追加连接的生命周期何时完成无关。
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 解析默认连接
    /// Returns the default connection, creating it with `make` on first use.
    ///
    /// Once a default exists it is returned unchanged; `make` is not called,
    /// whatever target the caller had in mind.
    ///
    /// 默认连接存在后会原样返回，不会调用 `make`，无论调用方期望的目标是什么。
    pub fn resolve_default(&self, make: impl FnOnce() -> Connection) -> Resolution {
        let mut state = self.lock();
        if let Some(existing) = &state.default {
            debug!(conn_id = existing.id(), "Reusing default connection");
            return Resolution {
                connection: existing.clone(),
                created: false,
            };
        }

        let connection = make();
        debug!(conn_id = connection.id(), key = connection.key(), "Registered default connection");
        state.connections.push(connection.clone());
        state.default = Some(connection.clone());
        Resolution {
            connection,
            created: true,
        }
    }

    /// 解析具名连接
    /// Always registers a new connection built by `make`.
    pub fn resolve_named(&self, make: impl FnOnce() -> Connection) -> Resolution {
        let connection = make();
        debug!(conn_id = connection.id(), key = connection.key(), "Registered additional connection");
        self.lock().connections.push(connection.clone());
        Resolution {
            connection,
            created: true,
        }
    }

    pub fn default_connection(&self) -> Option<Connection> {
        self.lock().default.clone()
    }

    /// Snapshot of all connections, in creation order.
    /// 所有连接的快照，按创建顺序排列。
    pub fn connections(&self) -> Vec<Connection> {
        self.lock().connections.clone()
    }
}
