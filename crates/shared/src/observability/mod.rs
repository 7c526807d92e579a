//! 可观测性模块
//!
//! 所有入口（基准、集成测试、下游二进制）通过同一个函数初始化日志。

pub mod tracing;

pub use self::tracing::init;
pub use crate::config::ObservabilityConfig;
