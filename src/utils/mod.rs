//! 工具模块
//!
//! - `logger`: 服务自身运行日志 (tracing) 的初始化

pub mod logger;
