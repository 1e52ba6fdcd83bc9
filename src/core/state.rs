//! Defines the readiness state of a simulated connection.
//!
//! 定义模拟连接的就绪状态。

use std::fmt;

/// The readiness state of a connection.
/// 连接的就绪状态。
///
/// The discriminants are the values a real driver exposes as `readyState`,
/// so they are part of the public contract.
///
/// 判别值即真实驱动程序暴露的 `readyState` 值，因此属于公共契约的一部分。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ReadyState {
    /// No connection attempt is in progress, or the last one failed or closed.
    /// 没有正在进行的连接尝试，或上一次尝试失败或已关闭。
    #[default]
    Disconnected = 0,

    /// The connection is open and usable.
    /// 连接已打开且可用。
    Connected = 1,

    /// An open attempt is in progress.
    /// 正在进行打开尝试。
    Connecting = 2,

    /// The connection is being closed.
    /// 连接正在关闭。
    Disconnecting = 3,
}

impl ReadyState {
    /// Returns the numeric `readyState` value.
    /// 返回数值形式的 `readyState`。
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Maps a numeric `readyState` value back to the state.
    /// 将数值形式的 `readyState` 映射回状态。
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Disconnected),
            1 => Some(Self::Connected),
            2 => Some(Self::Connecting),
            3 => Some(Self::Disconnecting),
            _ => None,
        }
    }

    /// The driver-facing state name.
    /// 面向驱动程序的状态名。
    pub fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Connecting => "connecting",
            Self::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ReadyState> for u8 {
    fn from(state: ReadyState) -> Self {
        state.code()
    }
}
