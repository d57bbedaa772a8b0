//! 服务配置
//!
//! 从环境变量 (可由 .env 文件注入) 加载全部可调参数,缺省时
//! 使用与原部署一致的默认值。配置加载失败即拒绝启动 —
//! 不完整的配置等同于无用。

use std::env;
use std::path::PathBuf;

use crate::models::ConfigError;

/// 日志服务配置
///
/// 存在即合理: 每个字段对应一个明确的运行时旋钮
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 日志文件存储目录
    pub log_dir: PathBuf,
    /// 单文件记录数上限 (写入截断阈值,亦是轮转阈值)
    pub max_records_per_file: usize,
    /// 每个源保留的轮转备份数上限
    pub max_backup_files: usize,
    /// Docker日志采集间隔 (毫秒)
    pub docker_poll_interval_ms: u64,
    /// 轮转扫描间隔 (毫秒)
    pub rotation_interval_ms: u64,
    /// HTTP监听端口
    pub port: u16,
    /// 受监控容器的短名称列表
    pub containers: Vec<String>,
    /// 短名称到实际容器名的展开模板,`{}` 为占位符
    pub container_name_template: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            max_records_per_file: 1000,
            max_backup_files: 5,
            docker_poll_interval_ms: 60_000,
            rotation_interval_ms: 300_000,
            port: 8080,
            containers: vec![
                "backend".to_string(),
                "frontend".to_string(),
                "db".to_string(),
            ],
            container_name_template: "hrease-{}-1".to_string(),
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    ///
    /// 读取的变量:
    /// - `LOG_DIR`: 日志目录 (默认: logs)
    /// - `MAX_RECORDS_PER_FILE`: 单文件记录上限 (默认: 1000)
    /// - `MAX_BACKUP_FILES`: 备份保留数 (默认: 5)
    /// - `DOCKER_POLL_INTERVAL_MS`: 采集间隔 (默认: 60000)
    /// - `ROTATION_INTERVAL_MS`: 轮转扫描间隔 (默认: 300000)
    /// - `PORT`: 监听端口 (默认: 8080)
    /// - `DOCKER_CONTAINERS`: 逗号分隔的容器短名称
    /// - `CONTAINER_NAME_TEMPLATE`: 容器名模板 (默认: hrease-{}-1)
    ///
    /// # 错误处理
    /// 变量缺失时使用默认值 (不报错);存在但无法解析时返回 InvalidValue。
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            log_dir: env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            max_records_per_file: parse_env("MAX_RECORDS_PER_FILE", defaults.max_records_per_file)?,
            max_backup_files: parse_env("MAX_BACKUP_FILES", defaults.max_backup_files)?,
            docker_poll_interval_ms: parse_env(
                "DOCKER_POLL_INTERVAL_MS",
                defaults.docker_poll_interval_ms,
            )?,
            rotation_interval_ms: parse_env("ROTATION_INTERVAL_MS", defaults.rotation_interval_ms)?,
            port: parse_env("PORT", defaults.port)?,
            containers: env::var("DOCKER_CONTAINERS")
                .map(|value| parse_container_list(&value))
                .unwrap_or(defaults.containers),
            container_name_template: env::var("CONTAINER_NAME_TEMPLATE")
                .unwrap_or(defaults.container_name_template),
        })
    }

    /// 配置摘要,用于启动日志
    pub fn summary_for_logging(&self) -> String {
        format!(
            "log_dir={} max_records={} max_backups={} poll_ms={} rotate_ms={} port={} containers=[{}]",
            self.log_dir.display(),
            self.max_records_per_file,
            self.max_backup_files,
            self.docker_poll_interval_ms,
            self.rotation_interval_ms,
            self.port,
            self.containers.join(",")
        )
    }
}

/// 解析一个环境变量,缺失用默认值,存在但非法则报错
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

/// 解析逗号分隔的容器名称列表,忽略空白项
fn parse_container_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_deployment() {
        let config = AppConfig::default();
        assert_eq!(config.max_records_per_file, 1000);
        assert_eq!(config.docker_poll_interval_ms, 60_000);
        assert_eq!(config.port, 8080);
        assert_eq!(config.container_name_template, "hrease-{}-1");
    }

    #[test]
    fn test_parse_container_list() {
        assert_eq!(
            parse_container_list("backend, frontend ,,db"),
            vec!["backend".to_string(), "frontend".to_string(), "db".to_string()]
        );
        assert!(parse_container_list("").is_empty());
        assert!(parse_container_list(" , ").is_empty());
    }
}
