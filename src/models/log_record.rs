//! 日志记录模型
//!
//! 定义持久化日志条目的数据结构,作为存储、轮转与查询的统一载体。
//! 遵循"存在即合理"原则,每个字段都有明确用途。

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 日志级别枚举
///
/// 输入大小写不敏感,持久化与输出统一为小写。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// 所有合法级别的小写名称,按严重程度升序
    pub const VALID: [&'static str; 4] = ["debug", "info", "warn", "error"];

    /// 级别的小写名称
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// 根据日志行内容推断级别
    ///
    /// 大小写不敏感的子串匹配,优先级 error > warn > debug,
    /// 未命中任何标记时默认 info。
    pub fn infer_from_line(line: &str) -> Self {
        let lowered = line.to_lowercase();
        if lowered.contains("error") {
            LogLevel::Error
        } else if lowered.contains("warn") {
            LogLevel::Warn
        } else if lowered.contains("debug") {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 持久化的日志记录
///
/// 一经写入即不可变,仅支持追加与整体重写(轮转/截断)。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// ISO-8601时间戳,写入时由存储层补齐
    pub timestamp: String,
    /// 日志级别
    pub level: LogLevel,
    /// 日志消息
    pub message: String,
    /// 附加上下文 (开放的键值映射),可选
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Map<String, serde_json::Value>>,
}

impl LogRecord {
    /// 解析记录自身的时间戳
    ///
    /// 缺失或无法解析时返回 None,调用方据此决定过滤行为。
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// 待写入的日志记录
///
/// 时间戳可缺省,由存储层在写入时刻补齐。
#[derive(Debug, Clone)]
pub struct NewLogRecord {
    pub timestamp: Option<String>,
    pub level: LogLevel,
    pub message: String,
    pub meta: Option<serde_json::Map<String, serde_json::Value>>,
}

impl NewLogRecord {
    /// 构造一条不带时间戳的新记录,交由存储层补齐
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            level,
            message: message.into(),
            meta: None,
        }
    }

    /// 附加上下文信息
    pub fn with_meta(mut self, meta: serde_json::Map<String, serde_json::Value>) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// 日志查询参数
///
/// 全部可选且可自由组合(AND语义),直接映射HTTP查询字符串。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogQuery {
    /// 级别过滤 (小写化后精确匹配)
    pub level: Option<String>,
    /// 全文检索 (对序列化后的整条记录做大小写不敏感子串匹配)
    pub search: Option<String>,
    /// 起始时间 (含)
    pub from: Option<String>,
    /// 截止时间 (含)
    pub to: Option<String>,
    /// 页码,从1开始
    pub page: Option<usize>,
    /// 每页条数
    pub limit: Option<usize>,
}

/// 解析时间戳字符串
///
/// 依次尝试 RFC3339、无时区的日期时间、纯日期(视为当日零点UTC)。
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}
