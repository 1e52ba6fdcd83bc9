//! 生命周期驱动器 - 异步推进连接的就绪状态
//! Lifecycle Driver - Asynchronously advances the readiness state of connections
//!
//! 驱动器是唯一修改连接状态、发出事件和调用完成回调的地方。
//! 打开序列总是排入会话的调度器，从不在创建连接的调用中执行，
//! 这样调用方在工厂调用返回后注册的监听器也能收到早期事件。
//!
//! The driver is the only place that mutates connection state, emits events
//! and invokes completion callbacks. The open sequence is always queued on the
//! session's scheduler, never run in the call that created the connection, so
//! listeners registered after the factory call returns still observe the early
//! events.

use crate::{
    connection::{Connection, OpenOutcome},
    core::{
        events::ConnectionEvent, lifecycle::StateValidator, state::ReadyState,
        target::ConnectionTarget,
    },
    error::{Error, Result},
};
use tracing::{debug, info, warn};

/// Completion callback of a factory call.
/// 工厂调用的完成回调。
pub type OpenCallback = Box<dyn FnOnce(Result<Connection>) + Send + 'static>;

pub(crate) struct LifecycleDriver;

impl LifecycleDriver {
    /// Queues the open sequence of a freshly created connection on its session.
    /// 在会话上为新创建的连接排队打开序列。
    pub(crate) fn schedule_open(
        connection: Connection,
        target: Result<ConnectionTarget>,
        callback: Option<OpenCallback>,
    ) {
        debug!(conn_id = connection.id(), key = connection.key(), "Scheduling open");
        let weak = connection.downgrade();
        connection.context().scheduler().enqueue(async move {
            if let Some(connection) = weak.upgrade() {
                Self::open(connection, target, callback).await;
            }
        });
    }

    /// Reports the settled outcome of an existing connection to a callback,
    /// without running a new lifecycle.
    ///
    /// 将已有连接的最终结果报告给回调，不运行新的生命周期。
    pub(crate) fn schedule_report(connection: Connection, callback: OpenCallback) {
        let weak = connection.downgrade();
        connection.context().scheduler().enqueue(async move {
            if let Some(connection) = weak.upgrade() {
                let result = connection.opened().await.map(|()| connection.clone());
                callback(result);
            }
        });
    }

    /// 执行打开序列
    /// Executes the open sequence: `connecting`, then `connected` + `open` or `error`.
    async fn open(
        connection: Connection,
        target: Result<ConnectionTarget>,
        callback: Option<OpenCallback>,
    ) {
        let lifecycle = connection.context().config().lifecycle.clone();
        if !lifecycle.open_delay.is_zero() {
            tokio::time::sleep(lifecycle.open_delay).await;
        }

        let result = Self::establish(&connection, target, lifecycle.simulate_error).await;
        Self::finish_open(&connection, result, callback);
    }

    async fn establish(
        connection: &Connection,
        target: Result<ConnectionTarget>,
        simulate_error: bool,
    ) -> Result<()> {
        connection.transition_to(ReadyState::Connecting)?;
        connection.emit(ConnectionEvent::Connecting);

        let target = target?;
        if simulate_error {
            return Err(Error::SimulatedFailure {
                target: target.key(),
            });
        }
        connection.context().store().open(&target).await
    }

    /// Fires the terminal events and the callback from one place, so events
    /// and callback always agree on the outcome.
    ///
    /// 在同一处发出终结事件并调用回调，使事件和回调对结果的报告始终一致。
    fn finish_open(connection: &Connection, result: Result<()>, callback: Option<OpenCallback>) {
        let result = result.and_then(|()| connection.transition_to(ReadyState::Connected).map(|_| ()));

        match result {
            Ok(()) => {
                info!(conn_id = connection.id(), key = connection.key(), "Connection open");
                connection.emit(ConnectionEvent::Connected);
                connection.emit(ConnectionEvent::Open);
                if let Some(callback) = callback {
                    callback(Ok(connection.clone()));
                }
                connection.settle(OpenOutcome::Opened);
            }
            Err(err) => {
                if connection.ready_state() == ReadyState::Connecting {
                    // Only fails if another transition raced us; already logged.
                    let _ = connection.transition_to(ReadyState::Disconnected);
                }
                warn!(conn_id = connection.id(), key = connection.key(), %err, "Connection failed");
                connection.emit(ConnectionEvent::Error(err.clone()));
                if let Some(callback) = callback {
                    callback(Err(err.clone()));
                }
                connection.settle(OpenOutcome::Failed(err));
            }
        }
    }

    /// 执行关闭序列
    /// Executes the close sequence: `disconnecting`, then `disconnected`.
    pub(crate) async fn close(connection: &Connection) -> Result<()> {
        // A failed attempt leaves the connection disconnected, handled below.
        let _ = connection.opened().await;

        if connection.transition_to(ReadyState::Disconnecting).is_err() {
            // Already closed, or another close is under way.
            if !StateValidator::is_closing(connection.ready_state()) {
                return Err(Error::NotConnected);
            }
            return connection.wait_for_state(ReadyState::Disconnected).await;
        }
        connection.emit(ConnectionEvent::Disconnecting);

        let result = match connection.target() {
            Some(target) => connection.context().store().close(target).await,
            None => Ok(()),
        };

        connection.transition_to(ReadyState::Disconnected)?;
        info!(conn_id = connection.id(), key = connection.key(), "Connection closed");
        connection.emit(ConnectionEvent::Disconnected);
        result
    }
}
