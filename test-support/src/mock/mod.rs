//! Mock 实现模块
//!
//! 提供各子系统测试用的 Mock 实现

pub mod clock;
pub mod fault;
