//! HTTP请求处理器
//!
//! 网关是日志子系统唯一的交互控制点,每个处理器无状态地把
//! 请求翻译为仓储操作。校验失败以机器可读的400返回,存储
//! 失败以500返回,查询路径永远返回200与(可能为空的)列表。

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::models::{LogLevel, LogQuery, NewLogRecord};
use crate::state::AppState;

/// 日志采集请求体
///
/// 所有字段以Option接收,缺失校验在处理器内完成,
/// 以便一次性报告全部必填字段。
#[derive(Debug, Deserialize)]
pub struct IngestPayload {
    pub source: Option<String>,
    pub level: Option<String>,
    pub message: Option<String>,
    pub meta: Option<serde_json::Map<String, serde_json::Value>>,
    pub timestamp: Option<String>,
}

/// POST /api/logs — 接收一条日志
///
/// - 缺少必填字段 → 400 + required列表
/// - 级别非法 → 400 + valid列表
/// - 写入成功 → 201 {success:true}
/// - 存储失败 → 500
pub async fn ingest_log(
    State(state): State<AppState>,
    Json(payload): Json<IngestPayload>,
) -> Response {
    let has = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());

    if !has(&payload.source) || !has(&payload.level) || !has(&payload.message) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Missing required fields",
                "required": ["source", "level", "message"],
            })),
        )
            .into_response();
    }

    let level: LogLevel = match payload.level.as_deref().unwrap_or_default().parse() {
        Ok(level) => level,
        Err(()) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid log level",
                    "valid": LogLevel::VALID,
                })),
            )
                .into_response();
        }
    };

    let source = payload.source.unwrap_or_default();
    let record = NewLogRecord {
        timestamp: payload.timestamp,
        level,
        message: payload.message.unwrap_or_default(),
        meta: payload.meta,
    };

    match state.store.save(&source, record).await {
        Ok(()) => (StatusCode::CREATED, Json(json!({ "success": true }))).into_response(),
        Err(err) => {
            error!(源 = %source, 原因 = %err, "日志写入失败");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to save log" })),
            )
                .into_response()
        }
    }
}

/// GET /api/logs/:source — 按源查询日志
///
/// 查询参数直接映射仓储过滤器;未知源返回空列表而非404。
pub async fn get_logs(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(query): Query<LogQuery>,
) -> Response {
    let logs = state.store.query(&source, &query).await;
    Json(json!({ "logs": logs })).into_response()
}

/// GET /api/sources — 列出当前存在的日志源
pub async fn get_sources(State(state): State<AppState>) -> Response {
    let sources = state.store.list_sources().await;
    Json(json!({ "sources": sources })).into_response()
}
