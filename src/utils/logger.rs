use std::io;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化服务自身的运行日志
///
/// 注意区分两套日志: 本模块配置的是服务自身的运行诊断
/// (tracing输出),与业务上收集存储的日志文件无关。
///
/// - 控制台层: 人类可读格式,便于开发调试
/// - 文件层 (可选): 设置 `SERVICE_LOG_DIR` 后按天轮转写入JSON,
///   目录必须与业务日志目录 (`LOG_DIR`) 分开,避免被当作日志源
/// - 环境变量控制: RUST_LOG=debug 可调整日志级别 (默认info)
pub fn init() -> Result<(), io::Error> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(io::stdout)
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    match std::env::var("SERVICE_LOG_DIR") {
        Ok(dir) => {
            // 按天轮转的JSON文件,文件名: hrease-logging.2026-08-23.log
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("hrease-logging")
                .filename_suffix("log")
                .build(&dir)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

            let file_layer = fmt::layer()
                .json()
                .with_writer(file_appender)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false);

            registry.with(file_layer).init();
        }
        Err(_) => registry.init(),
    }

    Ok(())
}
