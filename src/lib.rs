//! HRease日志收集服务
//!
//! 一个小而可靠的日志汇聚端: 通过HTTP接收前端/后端日志,
//! 周期性采集Docker容器输出,按源持久化为JSON文件,提供
//! 过滤与分页查询;超限文件自动轮转归档,过期备份自动清理。
//!
//! 模块划分:
//! - `models`: 日志记录与错误类型
//! - `services`: 仓储、轮转、容器采集、配置
//! - `server`: HTTP网关 (axum)
//! - `state`: 应用全局状态
//! - `utils`: 服务自身运行日志

pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod utils;
