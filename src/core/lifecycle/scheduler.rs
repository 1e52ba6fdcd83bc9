//! 生命周期调度器 - 会话拥有的延迟任务队列
//! Lifecycle Scheduler - The session-owned queue of deferred lifecycle tasks
//!
//! 工厂调用只把生命周期任务放入队列，从不启动它们。只有当调用方等待会话或
//! 其某个连接的操作时（`opened`、`close`、模型操作、`Session::idle`），任务才会
//! 被释放执行，因此在调用方让出控制权之前不会发出任何事件，无论运行时是单线程、
//! 多线程还是根本不存在。
//!
//! Factory calls only enqueue lifecycle tasks; they never start them. Tasks are
//! released when the caller awaits an operation of the session or of one of its
//! connections (`opened`, `close`, model operations, `Session::idle`), so no event
//! fires before the caller yields, whether the runtime is current-thread,
//! multi-thread, or absent.

use crate::error::{Error, Result};
use std::{
    collections::VecDeque,
    fmt,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::{runtime::Handle, sync::watch, task::JoinSet};
use tracing::{debug, error, warn};

type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Decrements the in-flight count when a task finishes, panics, or is dropped.
/// 任务完成、panic 或被丢弃时递减进行中计数。
struct InFlightGuard(Arc<watch::Sender<usize>>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// Deferred lifecycle tasks of one session.
/// 一个会话的延迟生命周期任务。
pub(crate) struct LifecycleScheduler {
    queue: Mutex<VecDeque<Task>>,
    /// Tasks enqueued but not yet finished.
    /// 已入队但尚未完成的任务数。
    in_flight: Arc<watch::Sender<usize>>,
}

impl fmt::Debug for LifecycleScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleScheduler")
            .field("queued", &self.lock().len())
            .field("in_flight", &*self.in_flight.borrow())
            .finish()
    }
}

impl Default for LifecycleScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleScheduler {
    pub(crate) fn new() -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            queue: Mutex::new(VecDeque::new()),
            in_flight: Arc::new(in_flight),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 入队任务
    /// Queues a task without running any part of it.
    pub(crate) fn enqueue<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.send_modify(|count| *count += 1);
        let guard = InFlightGuard(self.in_flight.clone());
        self.lock().push_back(Box::pin(async move {
            let _guard = guard;
            task.await;
        }));
    }

    pub(crate) fn queued(&self) -> usize {
        self.lock().len()
    }

    /// 释放排队的任务
    /// Starts every queued task, in enqueue order.
    ///
    /// Called from the async operations callers await, never from a factory call.
    /// 只从调用方等待的异步操作中调用，从不在工厂调用中调用。
    pub(crate) fn release(&self) {
        let tasks: Vec<Task> = self.lock().drain(..).collect();
        if tasks.is_empty() {
            return;
        }
        debug!(tasks = tasks.len(), "Releasing deferred lifecycle tasks");
        Self::spawn_all(tasks);
    }

    /// Releases queued tasks and waits until every task of the session has
    /// finished, including tasks released by other callers.
    ///
    /// 释放排队的任务，并等待会话的所有任务完成，包括由其他调用方释放的任务。
    pub(crate) async fn idle(&self) -> Result<()> {
        self.release();
        let mut rx = self.in_flight.subscribe();
        rx.wait_for(|count| *count == 0)
            .await
            .map(|_| ())
            .map_err(|_| Error::ChannelClosed)
    }

    /// Runs tasks on the current runtime, or on a dedicated current-thread
    /// runtime when the awaiting caller is outside any tokio runtime.
    ///
    /// 在当前运行时上运行任务；等待中的调用方不在任何 tokio 运行时中时，
    /// 在专用的单线程运行时上运行。
    fn spawn_all(tasks: Vec<Task>) {
        if let Ok(handle) = Handle::try_current() {
            for task in tasks {
                handle.spawn(task);
            }
            return;
        }

        warn!("No tokio runtime on the awaiting thread, driving lifecycle on a dedicated thread");
        let spawned = std::thread::Builder::new()
            .name("mockgoose-lifecycle".to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(async move {
                        let mut set = JoinSet::new();
                        for task in tasks {
                            set.spawn(task);
                        }
                        while set.join_next().await.is_some() {}
                    }),
                    Err(err) => error!(%err, "Failed to build lifecycle runtime"),
                }
            });
        // The closure, and with it every task, is dropped on failure; the
        // in-flight guards keep `idle` from hanging.
        if let Err(err) = spawned {
            error!(error = %Error::RuntimeUnavailable(err.to_string()), "Lifecycle tasks dropped");
        }
    }
}
