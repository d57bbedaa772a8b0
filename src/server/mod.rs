//! HTTP网关
//!
//! 基于axum的三个端点,把HTTP请求翻译为日志仓储操作。

pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::state::AppState;

/// 构建API路由
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/logs", post(handlers::ingest_log))
        .route("/api/logs/:source", get(handlers::get_logs))
        .route("/api/sources", get(handlers::get_sources))
        .with_state(state)
}

/// 在给定监听器上运行服务,直到收到取消信号
///
/// 监听器由调用方创建,测试中可绑定临时端口。
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    info!(地址 = %addr, "日志服务开始监听");
    info!("API端点:");
    info!("- POST /api/logs - 接收日志");
    info!("- GET /api/logs/:source - 按源查询日志");
    info!("- GET /api/sources - 列出日志源");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
            info!("HTTP服务收到关闭信号,停止接受新请求");
        })
        .await
}
