//! 定义了会话和连接生命周期的可配置参数。
//! Defines configurable parameters for sessions and the connection lifecycle.

use std::time::Duration;

/// A structure containing all configurable parameters for a session.
///
/// 包含会话所有可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Values used when a connection string leaves a component out.
    /// 连接字符串省略某个组成部分时使用的值。
    pub defaults: TargetDefaults,

    /// Lifecycle simulation parameters.
    /// 生命周期模拟参数。
    pub lifecycle: LifecycleConfig,
}

/// Defaults applied by the argument normalizer.
///
/// 参数规范化器使用的默认值。
#[derive(Debug, Clone)]
pub struct TargetDefaults {
    /// Scheme assumed for a bare `host[:port]` input.
    /// 裸 `host[:port]` 输入所使用的协议。
    pub scheme: String,
    /// Port used when neither the URI nor the arguments carry one.
    /// URI和参数中都没有端口时使用的端口。
    pub port: u16,
    /// Database used when neither the URI nor the arguments name one.
    /// URI和参数中都没有数据库名时使用的数据库。
    pub database: String,
}

/// Lifecycle simulation parameters.
///
/// 生命周期模拟参数。
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// When set, every open attempt on the session fails with
    /// [`Error::SimulatedFailure`](crate::error::Error::SimulatedFailure).
    /// Fixed for the lifetime of the session.
    ///
    /// 设置后，会话上的每次打开尝试都会失败。在会话生命周期内固定不变。
    pub simulate_error: bool,
    /// Extra delay inserted before the first transition of an open attempt.
    /// The driver always yields once before transitioning; this adds time on top.
    ///
    /// 在打开尝试的第一次状态转换之前插入的额外延迟。
    /// 驱动器总是在转换前让出一次；此值在其基础上增加时间。
    pub open_delay: Duration,
}

impl Default for TargetDefaults {
    fn default() -> Self {
        Self {
            scheme: "mongodb".to_string(),
            port: 27017,
            database: "test".to_string(),
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            simulate_error: false,
            open_delay: Duration::ZERO,
        }
    }
}
