use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use hrease_logging::services::{
    AppConfig, DockerCliSource, DockerPoller, FileLogStore, LogRepository, RotationService,
};
use hrease_logging::state::AppState;
use hrease_logging::{server, utils::logger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化服务自身的运行日志
    logger::init()?;

    // 加载 .env (如存在) 与环境变量配置
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    info!("HRease日志收集服务启动中...");
    info!(配置 = %config.summary_for_logging(), "配置加载完成");

    // 日志存储目录不存在时创建
    tokio::fs::create_dir_all(&config.log_dir).await?;

    let file_store = Arc::new(FileLogStore::new(&config.log_dir, config.max_records_per_file));
    let store: Arc<dyn LogRepository> = Arc::clone(&file_store) as Arc<dyn LogRepository>;

    // 取消令牌贯穿所有后台任务与HTTP服务,ctrl-c/SIGTERM触发优雅退出
    let cancel = CancellationToken::new();

    // 轮转扫描: 独立定时器,与请求处理解耦;
    // 与仓储共享按源的写锁,轮转与写入互斥
    let rotation = Arc::new(RotationService::new(
        file_store,
        config.max_records_per_file,
        config.max_backup_files,
    ));
    tokio::spawn(rotation.run(config.rotation_interval_ms, cancel.clone()));

    // Docker日志采集: 首个tick立即执行,对应启动时的即时采集
    let poller = Arc::new(DockerPoller::new(
        Arc::clone(&store),
        Arc::new(DockerCliSource::new()),
        config.containers.clone(),
        config.container_name_template.clone(),
    ));
    tokio::spawn(poller.run(config.docker_poll_interval_ms, cancel.clone()));

    // 监听退出信号
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("收到退出信号,开始优雅关闭");
        shutdown.cancel();
    });

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    server::serve(listener, AppState::new(store), cancel).await?;

    info!("服务已退出");
    Ok(())
}

/// 等待ctrl-c或SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("无法注册SIGTERM处理器");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
