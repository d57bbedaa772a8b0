//! 日志存储服务
//!
//! 每个日志源对应一个JSON文件 (`<log_dir>/<source>.json`),文件内容为
//! 按到达顺序排列的记录数组。写入采用整文件读-改-重写,超过容量上限时
//! 丢弃最旧的记录;查询支持级别/全文/时间范围过滤与分页。
//!
//! 仓储抽象 (`LogRepository`) 使网关与采集器不感知底层存储形态,
//! 未来可替换为嵌入式KV存储而不触及调用方。

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::{LogQuery, LogRecord, NewLogRecord, StorageError};

/// 默认每页返回的记录数
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// 轮转备份文件名中的标记,含该标记的文件不视为活跃日志源
pub const ROTATED_MARKER: &str = "-rotated-";

/// 日志仓储抽象
///
/// 三个操作覆盖日志子系统的全部交互面:
/// - `save`: 追加一条记录 (必要时截断最旧记录)
/// - `query`: 过滤与分页检索,读路径永不失败,降级为空结果
/// - `list_sources`: 枚举当前存在的日志源
#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn save(&self, source: &str, record: NewLogRecord) -> Result<(), StorageError>;
    async fn query(&self, source: &str, query: &LogQuery) -> Vec<LogRecord>;
    async fn list_sources(&self) -> Vec<String>;
}

/// 基于平面JSON文件的日志仓储实现
///
/// 单进程部署假设: 写入是整文件读-改-重写,跨进程并发写会互相覆盖。
/// 进程内通过按源名划分的异步互斥锁串行化同源写入,消除丢失更新。
pub struct FileLogStore {
    /// 日志文件目录
    log_dir: PathBuf,
    /// 单文件记录数硬上限,写入时超限截断最旧记录
    max_records_per_file: usize,
    /// 按源名划分的写锁,防止同源并发读-改-写竞争
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileLogStore {
    /// 创建日志仓储
    ///
    /// 日志目录不存在时由调用方 (启动流程) 负责创建。
    pub fn new(log_dir: impl Into<PathBuf>, max_records_per_file: usize) -> Self {
        Self {
            log_dir: log_dir.into(),
            max_records_per_file,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// 日志目录路径
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// 校验源名并映射为文件路径
    ///
    /// 源名是不透明标识,但必须能安全地作为文件名:
    /// 拒绝空串与包含路径分隔符或`..`的名称。
    fn source_file(&self, source: &str) -> Result<PathBuf, StorageError> {
        if source.is_empty()
            || source.contains('/')
            || source.contains('\\')
            || source.contains("..")
        {
            return Err(StorageError::InvalidSource(source.to_string()));
        }
        Ok(self.log_dir.join(format!("{source}.json")))
    }

    /// 获取某个源的写锁
    ///
    /// 轮转服务也通过此锁串行化对同一源文件的整体重写,
    /// 避免读-改-写跨越轮转导致记录在备份与活跃文件间重复。
    pub(crate) async fn source_lock(&self, source: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(source.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 读取一个日志文件的全部记录
    ///
    /// 文件不存在视为空日志;内容损坏 (无法解析) 同样降级为空日志并告警,
    /// 下次成功写入会以新内容覆盖损坏文件 (可接受的数据丢失)。
    async fn read_records(&self, path: &Path) -> Result<Vec<LogRecord>, StorageError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str::<Vec<LogRecord>>(&content) {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!(
                    文件 = %path.display(),
                    原因 = %err,
                    "日志文件损坏,按空日志处理"
                );
                Ok(Vec::new())
            }
        }
    }

    /// 整体重写日志文件 (两空格缩进的pretty JSON)
    async fn write_records(&self, path: &Path, records: &[LogRecord]) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(records)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// 对存储序的记录应用过滤、倒序与分页
    fn filter_and_paginate(records: Vec<LogRecord>, query: &LogQuery) -> Vec<LogRecord> {
        let mut records = records;

        // 级别过滤: 小写化后精确匹配,空串视为未提供过滤
        if let Some(level) = query.level.as_deref().filter(|l| !l.is_empty()) {
            let wanted = level.to_lowercase();
            records.retain(|r| r.level.as_str() == wanted);
        }

        // 全文检索: 对序列化后的整条记录做大小写不敏感子串匹配
        if let Some(search) = &query.search {
            let term = search.to_lowercase();
            records.retain(|r| {
                serde_json::to_string(r)
                    .map(|s| s.to_lowercase().contains(&term))
                    .unwrap_or(false)
            });
        }

        // 时间范围过滤: 边界存在时,时间戳缺失或无法解析的记录被排除;
        // 空串视为未提供边界,无法解析的边界不与任何时间戳可比,排除全部记录
        if let Some(raw) = query.from.as_deref().filter(|s| !s.is_empty()) {
            match crate::models::log_record::parse_timestamp(raw) {
                Some(from) => records.retain(|r| r.parsed_timestamp().is_some_and(|ts| ts >= from)),
                None => records.clear(),
            }
        }
        if let Some(raw) = query.to.as_deref().filter(|s| !s.is_empty()) {
            match crate::models::log_record::parse_timestamp(raw) {
                Some(to) => records.retain(|r| r.parsed_timestamp().is_some_and(|ts| ts <= to)),
                None => records.clear(),
            }
        }

        // 最新在前
        records.reverse();

        // 分页: 页码从1开始,越界页返回空而非错误
        let page = query.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = query.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_LIMIT);
        let start = (page - 1).saturating_mul(limit);

        records.into_iter().skip(start).take(limit).collect()
    }
}

#[async_trait]
impl LogRepository for FileLogStore {
    /// 追加一条日志记录
    ///
    /// 记录数达到上限时先丢弃最旧的记录,保证写入后文件最多持有上限条;
    /// 时间戳缺省时以写入时刻补齐。整个读-改-重写周期持有该源的写锁。
    async fn save(&self, source: &str, record: NewLogRecord) -> Result<(), StorageError> {
        let path = self.source_file(source)?;
        let lock = self.source_lock(source).await;
        let _guard = lock.lock().await;

        let mut records = self.read_records(&path).await?;

        // 截断最旧记录,为新记录留出一个位置
        if records.len() >= self.max_records_per_file {
            let keep_from = records.len() + 1 - self.max_records_per_file;
            records.drain(..keep_from);
        }

        records.push(LogRecord {
            timestamp: record
                .timestamp
                .filter(|ts| !ts.is_empty())
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            level: record.level,
            message: record.message,
            meta: record.meta,
        });

        self.write_records(&path, &records).await?;

        debug!(源 = %source, 记录数 = records.len(), "日志已写入");
        Ok(())
    }

    /// 检索某个源的日志
    ///
    /// 源文件不存在或读取失败都返回空列表,绝不向调用方抛错。
    async fn query(&self, source: &str, query: &LogQuery) -> Vec<LogRecord> {
        let path = match self.source_file(source) {
            Ok(path) => path,
            Err(err) => {
                warn!(源 = %source, 原因 = %err, "查询的源名非法");
                return Vec::new();
            }
        };

        match self.read_records(&path).await {
            Ok(records) => Self::filter_and_paginate(records, query),
            Err(err) => {
                warn!(源 = %source, 原因 = %err, "读取日志失败,返回空结果");
                Vec::new()
            }
        }
    }

    /// 枚举当前存在的日志源
    ///
    /// 即日志目录下所有非备份的`.json`文件名,排序保证输出确定。
    async fn list_sources(&self) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(&self.log_dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(目录 = %self.log_dir.display(), 原因 = %err, "枚举日志源失败");
                return Vec::new();
            }
        };

        let mut sources = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(source) = name.strip_suffix(".json") {
                if !source.contains(ROTATED_MARKER) {
                    sources.push(source.to_string());
                }
            }
        }

        sources.sort();
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;

    fn store(dir: &Path, cap: usize) -> FileLogStore {
        FileLogStore::new(dir, cap)
    }

    #[tokio::test]
    async fn test_save_assigns_timestamp_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        store
            .save("frontend", NewLogRecord::new(LogLevel::Info, "启动"))
            .await
            .unwrap();

        let logs = store.query("frontend", &LogQuery::default()).await;
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].timestamp.is_empty());
        assert!(logs[0].parsed_timestamp().is_some());
    }

    #[tokio::test]
    async fn test_save_respects_supplied_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        let mut record = NewLogRecord::new(LogLevel::Warn, "降级");
        record.timestamp = Some("2026-01-02T03:04:05Z".to_string());
        store.save("backend", record).await.unwrap();

        let logs = store.query("backend", &LogQuery::default()).await;
        assert_eq!(logs[0].timestamp, "2026-01-02T03:04:05Z");
    }

    #[tokio::test]
    async fn test_cap_keeps_most_recent_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 3);

        for i in 0..5 {
            store
                .save("backend", NewLogRecord::new(LogLevel::Info, format!("消息{i}")))
                .await
                .unwrap();
        }

        // 文件中恰好持有上限条,且为最近写入的3条 (最新在前)
        let logs = store
            .query("backend", &LogQuery { limit: Some(10), ..Default::default() })
            .await;
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "消息4");
        assert_eq!(logs[2].message, "消息2");
    }

    #[tokio::test]
    async fn test_query_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        store.save("s", NewLogRecord::new(LogLevel::Info, "第一条")).await.unwrap();
        store.save("s", NewLogRecord::new(LogLevel::Info, "第二条")).await.unwrap();

        let logs = store.query("s", &LogQuery::default()).await;
        assert_eq!(logs[0].message, "第二条");
        assert_eq!(logs[1].message, "第一条");
    }

    #[tokio::test]
    async fn test_query_missing_source_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        let logs = store.query("不存在的源", &LogQuery::default()).await;
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn test_query_filters_compose_with_and_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        store.save("s", NewLogRecord::new(LogLevel::Error, "connection TIMEOUT")).await.unwrap();
        store.save("s", NewLogRecord::new(LogLevel::Error, "disk full")).await.unwrap();
        store.save("s", NewLogRecord::new(LogLevel::Info, "timeout recovered")).await.unwrap();

        let query = LogQuery {
            level: Some("ERROR".to_string()),
            search: Some("timeout".to_string()),
            ..Default::default()
        };
        let logs = store.query("s", &query).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "connection TIMEOUT");
    }

    #[tokio::test]
    async fn test_query_empty_level_means_no_filter() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        store.save("s", NewLogRecord::new(LogLevel::Info, "正常")).await.unwrap();
        store.save("s", NewLogRecord::new(LogLevel::Error, "出错")).await.unwrap();

        // `?level=` 这类空参数不构成过滤条件
        let query = LogQuery {
            level: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(store.query("s", &query).await.len(), 2);
    }

    #[tokio::test]
    async fn test_query_unparsable_time_bound_excludes_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        store.save("s", NewLogRecord::new(LogLevel::Info, "一条")).await.unwrap();

        // 无法解析的边界不与任何时间戳可比 → 空结果
        let garbage_from = LogQuery {
            from: Some("不是时间".to_string()),
            ..Default::default()
        };
        assert!(store.query("s", &garbage_from).await.is_empty());

        let garbage_to = LogQuery {
            to: Some("someday".to_string()),
            ..Default::default()
        };
        assert!(store.query("s", &garbage_to).await.is_empty());

        // 空串边界视为未提供
        let empty_bound = LogQuery {
            from: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(store.query("s", &empty_bound).await.len(), 1);
    }

    #[tokio::test]
    async fn test_query_search_matches_meta() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        let mut meta = serde_json::Map::new();
        meta.insert("container".to_string(), serde_json::json!("hrease-db-1"));
        store
            .save("docker-db", NewLogRecord::new(LogLevel::Info, "ready").with_meta(meta))
            .await
            .unwrap();

        let query = LogQuery {
            search: Some("HREASE-DB".to_string()),
            ..Default::default()
        };
        assert_eq!(store.query("docker-db", &query).await.len(), 1);
    }

    #[tokio::test]
    async fn test_query_time_bounds_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        for (ts, msg) in [
            ("2026-08-01T00:00:00Z", "太早"),
            ("2026-08-10T12:00:00Z", "命中"),
            ("2026-08-20T00:00:00Z", "太晚"),
        ] {
            let mut record = NewLogRecord::new(LogLevel::Info, msg);
            record.timestamp = Some(ts.to_string());
            store.save("s", record).await.unwrap();
        }

        let query = LogQuery {
            from: Some("2026-08-10T12:00:00Z".to_string()),
            to: Some("2026-08-10T12:00:00Z".to_string()),
            ..Default::default()
        };
        let logs = store.query("s", &query).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "命中");
    }

    #[tokio::test]
    async fn test_pagination_out_of_range_page_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        for i in 0..5 {
            store.save("s", NewLogRecord::new(LogLevel::Info, format!("m{i}"))).await.unwrap();
        }

        let page2 = LogQuery { page: Some(2), limit: Some(3), ..Default::default() };
        assert_eq!(store.query("s", &page2).await.len(), 2);

        let page9 = LogQuery { page: Some(9), limit: Some(3), ..Default::default() };
        assert!(store.query("s", &page9).await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupted_file_treated_as_empty_then_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);
        tokio::fs::write(dir.path().join("broken.json"), "{ 不是数组")
            .await
            .unwrap();

        assert!(store.query("broken", &LogQuery::default()).await.is_empty());

        // 下一次成功写入会以单条记录覆盖损坏文件
        store.save("broken", NewLogRecord::new(LogLevel::Info, "重生")).await.unwrap();
        let logs = store.query("broken", &LogQuery::default()).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "重生");
    }

    #[tokio::test]
    async fn test_invalid_source_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        let result = store.save("../escape", NewLogRecord::new(LogLevel::Info, "x")).await;
        assert!(matches!(result, Err(StorageError::InvalidSource(_))));
        assert!(store.query("", &LogQuery::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_sources_sorted_and_excludes_backups() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        store.save("frontend", NewLogRecord::new(LogLevel::Info, "a")).await.unwrap();
        store.save("backend", NewLogRecord::new(LogLevel::Info, "b")).await.unwrap();
        tokio::fs::write(
            dir.path().join("backend-rotated-2026-08-23T10-00-00.000Z.json"),
            "[]",
        )
        .await
        .unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "忽略").await.unwrap();

        let sources = store.list_sources().await;
        assert_eq!(sources, vec!["backend".to_string(), "frontend".to_string()]);
    }

    #[tokio::test]
    async fn test_query_idempotent_without_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        store.save("s", NewLogRecord::new(LogLevel::Info, "固定")).await.unwrap();

        let query = LogQuery { search: Some("固定".to_string()), ..Default::default() };
        let first = store.query("s", &query).await;
        let second = store.query("s", &query).await;
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].message, second[0].message);
        assert_eq!(first[0].timestamp, second[0].timestamp);
    }

    #[tokio::test]
    async fn test_file_is_pretty_printed_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1000);

        store.save("fmt", NewLogRecord::new(LogLevel::Info, "样式")).await.unwrap();

        let content = tokio::fs::read_to_string(dir.path().join("fmt.json"))
            .await
            .unwrap();
        assert!(content.starts_with("[\n"));
        assert!(content.contains("  {"));
    }
}
