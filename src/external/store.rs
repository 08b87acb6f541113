use crate::error::AppResult;
use crate::models::page::{Page, QueryPage};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// 同步流程依赖的远程记录存储
///
/// 限流返回 `AppError::RateLimited`，其他失败一律返回 `AppError::RemoteError`
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query(
        &self,
        database_id: &str,
        filter: Option<&Value>,
        start_cursor: Option<&str>,
        page_size: Option<u32>,
    ) -> AppResult<QueryPage>;

    async fn create(&self, database_id: &str, properties: Map<String, Value>) -> AppResult<Page>;

    async fn update(&self, page_id: &str, properties: Map<String, Value>) -> AppResult<Page>;
}
