//! 连接生命周期模块
//! Connection Lifecycle Module
//!
//! 该模块包含就绪状态转换表、驱动打开/关闭序列的生命周期驱动器，
//! 以及持有延迟任务的会话调度器。
//!
//! This module contains the readiness transition table, the lifecycle driver
//! that runs the open and close sequences, and the per-session scheduler that
//! holds deferred tasks.

mod driver;
mod scheduler;
mod validation;

pub(crate) use driver::LifecycleDriver;
pub(crate) use scheduler::LifecycleScheduler;
pub use driver::OpenCallback;
pub use validation::StateValidator;
