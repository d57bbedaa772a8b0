use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 日志存储相关错误
///
/// 处理日志文件读写与序列化过程中的失败场景。
/// 读路径在服务边界降级为空结果,写路径上报给调用方。
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum StorageError {
    /// 文件I/O失败
    ///
    /// 可能原因:
    /// - 日志目录不可写
    /// - 磁盘空间不足
    /// - 文件被外部进程占用
    #[error("日志文件I/O失败: {0}")]
    IoFailed(String),

    /// 序列化/反序列化失败
    ///
    /// 将日志记录转换为JSON或从JSON解析失败
    #[error("日志数据序列化失败: {0}")]
    SerializationFailed(String),

    /// 非法的日志源名称
    ///
    /// 源名称为空或包含路径分隔符,拒绝映射为文件路径
    #[error("非法的日志源名称: {0}")]
    InvalidSource(String),
}

/// 日志轮转相关错误
///
/// 单个文件的轮转失败被捕获并记录,不中断整个扫描。
#[derive(Debug, Error)]
pub enum RotationError {
    /// 备份或截断时的文件I/O失败
    #[error("轮转I/O失败: {0}")]
    IoFailed(String),

    /// 日志文件内容无法解析
    #[error("日志文件解析失败: {0}")]
    ParseFailed(String),
}

/// 容器日志采集相关错误
///
/// 外部进程调用失败被Poller边界捕获,不影响其他容器与后续轮次。
#[derive(Debug, Error)]
pub enum CollectError {
    /// 外部进程启动失败
    ///
    /// 可能原因: docker未安装、不在PATH中、权限不足
    #[error("外部进程启动失败: {0}")]
    SpawnFailed(String),

    /// 外部进程以非零状态退出
    #[error("日志采集命令退出异常 (code {code:?}): {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    /// 外部进程执行超时
    #[error("日志采集命令超时 ({0}ms)")]
    TimedOut(u64),
}

/// 服务配置相关错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量的值无法解析
    #[error("配置项 {key} 的值无效: {value}")]
    InvalidValue { key: String, value: String },
}

/// 实现从std::io::Error到StorageError的转换
impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoFailed(err.to_string())
    }
}

/// 实现从serde_json::Error到StorageError的转换
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for RotationError {
    fn from(err: std::io::Error) -> Self {
        RotationError::IoFailed(err.to_string())
    }
}

impl From<serde_json::Error> for RotationError {
    fn from(err: serde_json::Error) -> Self {
        RotationError::ParseFailed(err.to_string())
    }
}

impl From<std::io::Error> for CollectError {
    fn from(err: std::io::Error) -> Self {
        CollectError::SpawnFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StorageError = io_err.into();
        assert!(matches!(err, StorageError::IoFailed(_)));
    }

    #[test]
    fn test_collect_error_display() {
        let err = CollectError::CommandFailed {
            code: Some(1),
            stderr: "no such container".to_string(),
        };
        assert!(err.to_string().contains("no such container"));
    }
}
