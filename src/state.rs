use crate::services::LogRepository;
use std::sync::Arc;

/// 应用全局状态
///
/// 存在即合理: 网关的每个请求都只需要一个能力 —
/// 对日志仓储的访问。仓储以trait对象注入,底层存储可替换。
#[derive(Clone)]
pub struct AppState {
    /// 日志仓储: 唯一的数据存取入口
    pub store: Arc<dyn LogRepository>,
}

impl AppState {
    pub fn new(store: Arc<dyn LogRepository>) -> Self {
        Self { store }
    }
}
