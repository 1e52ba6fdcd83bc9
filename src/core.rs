//! The core state machine and event-dispatch layer.
//! 核心状态机与事件分发层。

pub mod events;
pub mod lifecycle;
pub mod state;
pub mod target;
