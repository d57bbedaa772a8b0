//! Docker日志采集服务
//!
//! 周期性地从一组受监控容器拉取最近的输出行,推断级别后写入
//! 对应的合成日志源 (`docker-<名称>`)。
//!
//! 采集机制通过 `ContainerLogSource` 适配器抽象: Poller核心不关心
//! 日志从哪来,Docker CLI只是其中一种实现,测试中可替换为内存桩。

use async_trait::async_trait;
use chrono::Utc;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::models::{CollectError, LogLevel, NewLogRecord};
use crate::services::log_store::LogRepository;

/// 每次采集拉取的日志行数
pub const TAIL_LINES: u32 = 50;

/// 外部进程调用的超时时间,悬挂的进程不会阻塞后续轮次
const COLLECT_TIMEOUT_MS: u64 = 10_000;

/// 容器日志来源适配器
///
/// 抽象"取回某容器最近N行输出"这一能力,对象安全以便注入。
#[async_trait]
pub trait ContainerLogSource: Send + Sync {
    /// 拉取指定容器最近 `lines` 行日志
    async fn tail(&self, container: &str, lines: u32) -> Result<Vec<String>, CollectError>;
}

/// 基于Docker CLI的日志来源
///
/// 以子进程方式执行 `docker logs <container> --tail <n>`,
/// 超时即放弃本次采集。
pub struct DockerCliSource {
    timeout: Duration,
}

impl DockerCliSource {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_millis(COLLECT_TIMEOUT_MS),
        }
    }
}

impl Default for DockerCliSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerLogSource for DockerCliSource {
    async fn tail(&self, container: &str, lines: u32) -> Result<Vec<String>, CollectError> {
        let output = Command::new("docker")
            .args(["logs", container, "--tail", &lines.to_string()])
            .stdin(Stdio::null())
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| CollectError::TimedOut(self.timeout.as_millis() as u64))??;

        if !output.status.success() {
            return Err(CollectError::CommandFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(split_log_lines(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// 把子进程输出切分为非空日志行
fn split_log_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Docker日志轮询器
///
/// 每个tick并发采集所有受监控容器;单个容器的失败只记录,
/// 不影响其他容器与后续轮次。
pub struct DockerPoller {
    store: Arc<dyn LogRepository>,
    source: Arc<dyn ContainerLogSource>,
    /// 受监控容器的短名称 (如 `backend`)
    containers: Vec<String>,
    /// 短名称到实际容器名的展开模板,`{}` 为占位符
    name_template: String,
}

impl DockerPoller {
    pub fn new(
        store: Arc<dyn LogRepository>,
        source: Arc<dyn ContainerLogSource>,
        containers: Vec<String>,
        name_template: String,
    ) -> Self {
        Self {
            store,
            source,
            containers,
            name_template,
        }
    }

    /// 周期运行采集,直到收到取消信号
    ///
    /// `tokio::time::interval` 的首个tick立即触发,对应启动时的
    /// 一次即时采集。
    pub async fn run(self: Arc<Self>, interval_ms: u64, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.collect_once().await;
                }
                _ = cancel.cancelled() => {
                    info!("Docker采集任务收到取消信号,退出");
                    return;
                }
            }
        }
    }

    /// 执行一轮采集: 并发处理所有容器
    pub async fn collect_once(&self) {
        if self.containers.is_empty() {
            return;
        }
        info!(容器数 = self.containers.len(), "开始采集Docker日志");

        let tasks = self
            .containers
            .iter()
            .map(|name| self.collect_container(name));
        futures::future::join_all(tasks).await;
    }

    /// 采集单个容器的日志并写入其合成源
    async fn collect_container(&self, short_name: &str) {
        let container = self.resolve_container_name(short_name);
        let source = format!("docker-{short_name}");

        let lines = match self.source.tail(&container, TAIL_LINES).await {
            Ok(lines) => lines,
            Err(err) => {
                error!(容器 = %container, 原因 = %err, "容器日志采集失败");
                return;
            }
        };

        debug!(容器 = %container, 行数 = lines.len(), "容器日志采集完成");

        let collected_at = Utc::now().to_rfc3339();
        for line in lines {
            let mut meta = serde_json::Map::new();
            meta.insert("container".to_string(), serde_json::json!(container));
            meta.insert("collected_at".to_string(), serde_json::json!(collected_at));

            let record =
                NewLogRecord::new(LogLevel::infer_from_line(&line), line).with_meta(meta);
            if let Err(err) = self.store.save(&source, record).await {
                error!(源 = %source, 原因 = %err, "容器日志写入失败");
            }
        }
    }

    /// 把容器短名称展开为部署中的实际容器名
    fn resolve_container_name(&self, short_name: &str) -> String {
        self.name_template.replace("{}", short_name)
    }
}
