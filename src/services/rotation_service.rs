//! 日志轮转服务
//!
//! 独立于请求流量的周期性扫描: 把超限的活跃日志文件归档为带时间戳的
//! 备份文件并清空原文件,再按保留上限删除最旧的备份。
//!
//! 备份与清空均采用"写临时文件再改名"的方式落盘,消除原始实现中
//! 备份完成与截断之间崩溃导致记录重复的窗口。

use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::models::{LogRecord, RotationError};
use crate::services::log_store::{FileLogStore, ROTATED_MARKER};

/// 备份文件时间戳的格式 (ISO-8601,冒号替换为短横线以兼容文件系统)
const ROTATED_TS_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3fZ";

/// 日志轮转服务
///
/// 每轮扫描对单个文件的失败只记录不传播,剩余文件继续处理;
/// 扫描在输入不变时幂等,可安全地在下一轮重试。
pub struct RotationService {
    /// 日志仓储: 提供日志目录与按源的写锁
    store: Arc<FileLogStore>,
    /// 触发轮转的记录数阈值
    max_records_per_file: usize,
    /// 每个源保留的备份文件数上限
    max_backup_files: usize,
}

impl RotationService {
    pub fn new(
        store: Arc<FileLogStore>,
        max_records_per_file: usize,
        max_backup_files: usize,
    ) -> Self {
        Self {
            store,
            max_records_per_file,
            max_backup_files,
        }
    }

    /// 日志文件目录
    fn log_dir(&self) -> &Path {
        self.store.log_dir()
    }

    /// 周期运行轮转扫描,直到收到取消信号
    pub async fn run(self: Arc<Self>, interval_ms: u64, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep().await;
                }
                _ = cancel.cancelled() => {
                    info!("轮转任务收到取消信号,退出");
                    return;
                }
            }
        }
    }

    /// 扫描日志目录,轮转所有超限的活跃日志文件
    ///
    /// 返回本轮实际轮转的文件数。
    pub async fn sweep(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(self.log_dir()).await {
            Ok(entries) => entries,
            Err(err) => {
                error!(目录 = %self.log_dir().display(), 原因 = %err, "轮转扫描无法读取日志目录");
                return 0;
            }
        };

        let mut rotated = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(source) = name.strip_suffix(".json") else {
                continue;
            };
            if source.contains(ROTATED_MARKER) {
                continue;
            }

            match self.check_and_rotate(source).await {
                Ok(true) => rotated += 1,
                Ok(false) => {}
                Err(err) => {
                    // 单文件失败不中断扫描,下一轮自然重试
                    error!(源 = %source, 原因 = %err, "轮转失败,跳过该文件");
                }
            }
        }

        if rotated > 0 {
            info!(轮转文件数 = rotated, "轮转扫描完成");
        }
        rotated
    }

    /// 检查单个源文件,超限则执行轮转
    ///
    /// 读取与轮转全程持有该源的写锁,与 `save` 的读-改-写互斥:
    /// 否则一次跨越轮转的写入会把轮转前的记录重写回已清空的
    /// 活跃文件,造成备份与活跃文件间的记录重复。
    async fn check_and_rotate(&self, source: &str) -> Result<bool, RotationError> {
        let lock = self.store.source_lock(source).await;
        let _guard = lock.lock().await;

        let live_path = self.log_dir().join(format!("{source}.json"));
        let content = tokio::fs::read_to_string(&live_path).await?;
        let records: Vec<LogRecord> = serde_json::from_str(&content)?;

        if records.len() < self.max_records_per_file {
            return Ok(false);
        }

        self.rotate_file(source, &live_path, &records).await?;
        let pruned = self.prune_backups(source).await?;
        if pruned > 0 {
            info!(源 = %source, 删除备份数 = pruned, "已清理过期备份");
        }
        Ok(true)
    }

    /// 轮转一个源文件: 全量归档为备份,再把活跃文件重置为空数组
    ///
    /// 两步都是写临时文件后改名,任一时刻崩溃都不会让读取方观察到
    /// 半写状态;备份改名完成前崩溃仅留下可忽略的临时文件。
    async fn rotate_file(
        &self,
        source: &str,
        live_path: &Path,
        records: &[LogRecord],
    ) -> Result<(), RotationError> {
        let timestamp = Utc::now().format(ROTATED_TS_FORMAT).to_string();
        let backup_name = format!("{source}{ROTATED_MARKER}{timestamp}.json");
        let backup_path = self.log_dir().join(&backup_name);

        info!(源 = %source, 备份文件 = %backup_name, 记录数 = records.len(), "轮转日志文件");

        let backup_content = serde_json::to_string_pretty(records)?;
        write_atomic(&backup_path, &backup_content).await?;

        let empty = serde_json::to_string_pretty::<[LogRecord; 0]>(&[])?;
        write_atomic(live_path, &empty).await?;

        Ok(())
    }

    /// 删除某个源最旧的多余备份,保留最多 `max_backup_files` 个
    ///
    /// 按文件名内嵌的时间戳排序 (最旧在前),无法解析的时间戳按
    /// epoch零点处理,即优先被删除。返回删除的文件数。
    pub async fn prune_backups(&self, source: &str) -> Result<usize, RotationError> {
        let prefix = format!("{source}{ROTATED_MARKER}");
        let mut entries = tokio::fs::read_dir(self.log_dir()).await?;

        let mut backups: Vec<(DateTime<Utc>, PathBuf)> = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && name.ends_with(".json") {
                let ts = parse_rotated_timestamp(&name, source)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
                backups.push((ts, entry.path()));
            }
        }

        if backups.len() <= self.max_backup_files {
            return Ok(0);
        }

        backups.sort_by_key(|(ts, _)| *ts);
        let excess = backups.len() - self.max_backup_files;
        let mut deleted = 0;
        for (_, path) in backups.into_iter().take(excess) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!(文件 = %path.display(), "删除过期备份");
                    deleted += 1;
                }
                Err(err) => {
                    warn!(文件 = %path.display(), 原因 = %err, "删除备份失败");
                }
            }
        }
        Ok(deleted)
    }
}

/// 写临时文件后改名,保证目标路径内容的原子替换
async fn write_atomic(path: &Path, content: &str) -> Result<(), RotationError> {
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, content).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// 从备份文件名解析内嵌的轮转时间戳
///
/// 文件名格式: `<source>-rotated-<ISO时间戳,冒号为短横线>.json`
pub fn parse_rotated_timestamp(file_name: &str, source: &str) -> Option<DateTime<Utc>> {
    let prefix = format!("{source}{ROTATED_MARKER}");
    let ts = file_name.strip_prefix(&prefix)?.strip_suffix(".json")?;
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H-%M-%S%.fZ")
        .ok()
        .map(|naive| naive.and_utc())
}
