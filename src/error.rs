//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::core::state::ReadyState;
use thiserror::Error;

/// The primary error type for the connection simulator.
/// 连接模拟器的主要错误类型。
///
/// Errors are cloneable so that a single failure can be delivered both to the
/// `error` event listeners and to the completion callback.
///
/// 错误类型可克隆，以便同一个失败既能发送给 `error` 事件监听器，也能发送给完成回调。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The session was configured to fail every connection attempt.
    /// 会话被配置为使所有连接尝试失败。
    #[error("simulated connection failure for {target}")]
    SimulatedFailure { target: String },

    /// The connection string could not be parsed as a URI.
    /// 连接字符串无法解析为URI。
    #[error("invalid connection uri: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// A port argument was not a valid TCP port.
    /// 端口参数不是有效的TCP端口。
    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    /// The connection string did not name a host.
    /// 连接字符串没有指定主机。
    #[error("connection string has no host: {0:?}")]
    MissingHost(String),

    /// A readiness transition was rejected by the lifecycle table.
    /// 就绪状态转换被生命周期表拒绝。
    #[error("invalid readiness transition from {from:?} to {to:?}")]
    InvalidTransition { from: ReadyState, to: ReadyState },

    /// The operation requires an open connection.
    /// 该操作需要一个已打开的连接。
    #[error("connection not established")]
    NotConnected,

    /// The bound connection failed to open; carries the original failure.
    /// 绑定的连接打开失败；携带原始错误。
    #[error("connection failed to open: {0}")]
    ConnectionFailed(Box<Error>),

    /// The connection behind a handle no longer exists.
    /// 句柄背后的连接已不存在。
    #[error("Connection is closed or dropped")]
    ConnectionClosed,

    /// A document passed to a model was not an object.
    /// 传给模型的文档不是对象。
    #[error("document for model {0:?} must be an object")]
    InvalidDocument(String),

    /// A session-level model was used before any default connection existed.
    /// 在默认连接存在之前使用了会话级模型。
    #[error("model {0:?} is not bound to a connection")]
    ModelUnbound(String),

    /// The data-layer collaborator reported a failure.
    /// 数据层协作者报告了失败。
    #[error("data store error: {0}")]
    Store(String),

    /// An internal channel was closed unexpectedly.
    /// 内部通道意外关闭。
    #[error("Internal channel is broken")]
    ChannelClosed,

    /// No async runtime could be found or started to drive a lifecycle.
    /// 找不到或无法启动用于驱动生命周期的异步运行时。
    #[error("no async runtime available: {0}")]
    RuntimeUnavailable(String),
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
