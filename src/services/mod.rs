//! 服务层模块
//!
//! 包含所有业务逻辑服务:
//! - `log_store`: 日志仓储,按源读写JSON文件并提供过滤查询
//! - `rotation_service`: 周期性轮转超限文件并清理过期备份
//! - `docker_poller`: 周期性采集容器日志并写入仓储
//! - `config_service`: 环境变量驱动的服务配置
//!
//! # 服务架构
//!
//! ```text
//! ┌──────────────────┐   ┌───────────────────┐
//! │   HTTP Gateway   │   │   DockerPoller    │
//! └────────┬─────────┘   └─────────┬─────────┘
//!          │      save/query       │ save
//!          ▼                       ▼
//! ┌──────────────────────────────────────────┐
//! │        LogRepository (FileLogStore)      │
//! └────────────────────┬─────────────────────┘
//!                      │ 每源一个JSON文件
//!                      ▼
//!              <log_dir>/*.json  ◄── RotationService (独立定时扫描)
//! ```

pub mod config_service;
pub mod docker_poller;
pub mod log_store;
pub mod rotation_service;

// 重导出常用类型,简化外部引用
pub use config_service::AppConfig;
pub use docker_poller::{ContainerLogSource, DockerCliSource, DockerPoller};
pub use log_store::{FileLogStore, LogRepository};
pub use rotation_service::RotationService;
