//! 就绪状态验证逻辑模块
//! Readiness State Validation Logic Module
//!
//! 该模块定义合法的就绪状态转换表，并提供状态分类判断。
//!
//! This module defines the table of legal readiness transitions and provides
//! state classification helpers for the lifecycle driver.

use crate::core::state::ReadyState;

/// 状态验证器，负责所有状态相关的验证和检查逻辑
/// State validator responsible for all state-related validation and check logic
pub struct StateValidator;

impl StateValidator {
    /// 验证状态转换是否合法
    /// Validate if state transition is legal
    pub fn is_valid_transition(current_state: ReadyState, new_state: ReadyState) -> bool {
        use ReadyState::*;

        match (current_state, new_state) {
            // 打开尝试
            // Open attempt
            (Disconnected, Connecting) => true,
            (Connecting, Connected) => true,
            (Connecting, Disconnected) => true,

            // 关闭路径
            // Close path
            (Connected, Disconnecting) => true,
            (Disconnecting, Disconnected) => true,

            // 其他转换都是无效的，包括同状态转换
            // All other transitions are invalid, including same-state ones
            _ => false,
        }
    }

    /// 检查是否可以执行数据操作
    /// Check if data operations are allowed
    pub fn can_operate(state: ReadyState) -> bool {
        matches!(state, ReadyState::Connected)
    }

    /// 检查连接是否正在关闭或已关闭
    /// Check if the connection is closing or closed
    pub fn is_closing(state: ReadyState) -> bool {
        matches!(state, ReadyState::Disconnecting | ReadyState::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReadyState::*;

    #[test]
    fn test_open_sequence_is_valid() {
        assert!(StateValidator::is_valid_transition(Disconnected, Connecting));
        assert!(StateValidator::is_valid_transition(Connecting, Connected));
        assert!(StateValidator::is_valid_transition(Connecting, Disconnected));
    }

    #[test]
    fn test_connecting_cannot_be_skipped() {
        assert!(!StateValidator::is_valid_transition(Disconnected, Connected));
        assert!(!StateValidator::is_valid_transition(Disconnected, Disconnecting));
        assert!(!StateValidator::is_valid_transition(Connected, Connecting));
    }

    #[test]
    fn test_close_sequence() {
        assert!(StateValidator::is_valid_transition(Connected, Disconnecting));
        assert!(StateValidator::is_valid_transition(Disconnecting, Disconnected));
        assert!(!StateValidator::is_valid_transition(Connected, Disconnected));
        assert!(!StateValidator::is_valid_transition(Disconnecting, Connected));
    }

    #[test]
    fn test_same_state_is_rejected() {
        for state in [Disconnected, Connected, Connecting, Disconnecting] {
            assert!(!StateValidator::is_valid_transition(state, state));
        }
    }

    #[test]
    fn test_state_classification() {
        assert!(StateValidator::can_operate(Connected));
        assert!(!StateValidator::can_operate(Disconnecting));
        assert!(StateValidator::is_closing(Disconnected));
        assert!(!StateValidator::is_closing(Connecting));
    }
}
