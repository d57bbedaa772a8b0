//! 数据模型模块
//!
//! 包含所有核心数据结构:
//! - errors: 错误类型定义 (存储、轮转、采集、配置错误)
//! - log_record: 日志记录模型 (级别、记录、查询参数)
//!
//! # 设计原则
//!
//! 1. **存在即合理**: 每个字段都有明确目的,无冗余
//! 2. **错误处理**: 每个失败域有独立的错误类型,提供完整上下文
//! 3. **不可变性**: 日志记录一经写入不可修改,只有追加与整体重写

pub mod errors;
pub mod log_record;

// 重导出常用类型,简化外部引用
pub use errors::{CollectError, ConfigError, RotationError, StorageError};
pub use log_record::{LogLevel, LogQuery, LogRecord, NewLogRecord};
