use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::external::store::RecordStore;
use crate::models::page::{Page, fields, props};
use crate::models::pull::PullRecord;
use crate::utils::delay::Delay;
use crate::utils::time::uigf_to_iso;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const PAGE_SIZE: u32 = 100;

/// 分页读取的结果，中途失败时 `error` 有值
#[derive(Debug, Default)]
pub struct FullScan {
    pub pages: Vec<Page>,
    pub error: Option<String>,
}

impl FullScan {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// 物品主数据查找表，每次运行加载一次
#[derive(Debug, Default, Clone)]
pub struct MasterMapping {
    pub by_id: HashMap<String, String>,
    pub by_name: HashMap<String, String>,
}

impl MasterMapping {
    /// 先按 item id 查，再按名称查
    pub fn resolve(&self, item_id: Option<&str>, name: &str) -> Option<&str> {
        item_id
            .and_then(|id| self.by_id.get(id))
            .or_else(|| self.by_name.get(name))
            .map(String::as_str)
    }
}

/// 扫描抽卡记录得到的 Item ID
#[derive(Debug, Default)]
pub struct ExistingIds {
    pub ids: HashSet<String>,
    pub complete: bool,
}

/// 设置、抽卡记录、物品主数据三个库的客户端，带限流重试
#[derive(Clone)]
pub struct SyncClient {
    store: Arc<dyn RecordStore>,
    delay: Arc<dyn Delay>,
    settings_db_id: String,
    gacha_log_db_id: String,
    master_db_id: String,
    max_retries: u32,
    base_delay: Duration,
    request_interval: Duration,
    utc_offset: String,
}

impl SyncClient {
    pub fn new(store: Arc<dyn RecordStore>, delay: Arc<dyn Delay>, config: &Config) -> Self {
        Self {
            store,
            delay,
            settings_db_id: config.notion.settings_db_id.clone(),
            gacha_log_db_id: config.notion.gacha_log_db_id.clone(),
            master_db_id: config.notion.master_db_id.clone(),
            max_retries: config.retry.max_retries,
            base_delay: Duration::from_millis(config.retry.base_delay_ms),
            request_interval: Duration::from_millis(config.import.request_interval_ms),
            utc_offset: config.export.utc_offset(),
        }
    }

    pub fn settings_db_id(&self) -> &str {
        &self.settings_db_id
    }

    pub fn gacha_log_db_id(&self) -> &str {
        &self.gacha_log_db_id
    }

    pub fn master_db_id(&self) -> &str {
        &self.master_db_id
    }

    /// 写入之间的固定间隔
    pub async fn pause(&self) {
        self.delay.sleep(self.request_interval).await;
    }

    /// 遇到限流时退避重试：base、2*base、4*base...
    async fn with_retry<T, F, Fut>(&self, operation: &str, request: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match request().await {
                Err(e) if e.is_rate_limited() => {
                    if attempt >= self.max_retries {
                        return Err(AppError::RemoteError(format!(
                            "{operation}: still rate limited after {} retries",
                            self.max_retries
                        )));
                    }
                    let wait = self.base_delay.saturating_mul(1u32 << attempt.min(16));
                    log::warn!("{operation}: rate limited, waiting {:?} before retry", wait);
                    self.delay.sleep(wait).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    pub async fn query(&self, database_id: &str, filter: Option<&Value>) -> AppResult<Vec<Page>> {
        let page = self
            .with_retry("query database", move || {
                self.store.query(database_id, filter, None, None)
            })
            .await?;
        Ok(page.results)
    }

    /// 读取数据库全部页面，某一页失败时停止并返回已读到的部分
    pub async fn fetch_all(&self, database_id: &str, filter: Option<&Value>) -> FullScan {
        let mut scan = FullScan::default();
        let mut cursor: Option<String> = None;

        loop {
            let start_cursor = cursor.as_deref();
            let result = self
                .with_retry("query database", move || {
                    self.store
                        .query(database_id, filter, start_cursor, Some(PAGE_SIZE))
                })
                .await;

            match result {
                Ok(page) => {
                    scan.pages.extend(page.results);
                    log::debug!("Fetched {} records from {}", scan.pages.len(), database_id);
                    match (page.has_more, page.next_cursor) {
                        (true, Some(next)) => cursor = Some(next),
                        _ => break,
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Scan of {} aborted after {} records: {}",
                        database_id,
                        scan.pages.len(),
                        e
                    );
                    scan.error = Some(e.to_string());
                    break;
                }
            }
        }

        scan
    }

    pub async fn create_page(
        &self,
        database_id: &str,
        properties: Map<String, Value>,
    ) -> AppResult<Page> {
        self.with_retry("create page", move || {
            self.store.create(database_id, properties.clone())
        })
        .await
    }

    pub async fn update_page(&self, page_id: &str, properties: Map<String, Value>) -> AppResult<Page> {
        self.with_retry("update page", move || self.store.update(page_id, properties.clone()))
            .await
    }

    /// 返回 `uid` 的设置页 id，不存在则创建
    ///
    /// 查询和创建不是原子操作，两个会话同时处理同一个新 UID 时可能各建一页
    pub async fn get_or_create_user_page(&self, uid: &str, game_name: &str) -> AppResult<String> {
        let filter = props::rich_text_equals(fields::SETTINGS_UID, uid);
        let existing = self.query(&self.settings_db_id, Some(&filter)).await?;

        if let Some(page) = existing.into_iter().next() {
            log::info!("Found settings page for UID {}", uid);
            return Ok(page.id);
        }

        log::info!("Creating settings page for UID {}", uid);
        let mut properties = Map::new();
        properties.insert(
            fields::SETTINGS_ACCOUNT.into(),
            props::title(&format!("{game_name} User ({uid})")),
        );
        properties.insert(fields::SETTINGS_UID.into(), props::rich_text(uid));
        properties.insert(fields::SETTINGS_GAME.into(), props::select(game_name));
        let page = self.create_page(&self.settings_db_id, properties).await?;
        Ok(page.id)
    }

    pub async fn fetch_existing_item_ids(&self) -> ExistingIds {
        log::info!("Scanning gacha log for existing item ids");
        let scan = self.fetch_all(&self.gacha_log_db_id, None).await;
        let ids = scan
            .pages
            .iter()
            .filter_map(|p| p.rich_text(fields::LOG_ITEM_ID))
            .map(str::to_string)
            .collect();
        ExistingIds {
            ids,
            complete: scan.is_complete(),
        }
    }

    pub async fn master_mapping(&self) -> MasterMapping {
        log::info!("Loading item master");
        let scan = self.fetch_all(&self.master_db_id, None).await;
        let mut mapping = MasterMapping::default();
        for page in &scan.pages {
            if let Some(id) = page.rich_text(fields::MASTER_ITEM_ID) {
                mapping.by_id.insert(id.to_string(), page.id.clone());
            }
            if let Some(name) = page.title(fields::MASTER_NAME) {
                mapping.by_name.insert(name.to_string(), page.id.clone());
            }
        }
        log::info!("Item master loaded: {} entries", mapping.by_id.len());
        mapping
    }

    /// 一条抽卡记录的页面属性，空值或无法解析的可选字段直接省略
    ///
    /// `utc_offset` 为文件声明的时区，为 `None` 时使用配置的时区
    pub fn pull_record_properties(
        &self,
        record: &PullRecord,
        user_page_id: &str,
        master_page_id: Option<&str>,
        utc_offset: Option<&str>,
    ) -> Map<String, Value> {
        let offset = utc_offset.unwrap_or(&self.utc_offset);
        let mut properties = Map::new();
        properties.insert(fields::LOG_ITEM_NAME.into(), props::title(&record.name));
        properties.insert(fields::LOG_ITEM_ID.into(), props::rich_text(&record.id));
        if !record.item_type.is_empty() {
            properties.insert(fields::LOG_ITEM_TYPE.into(), props::select(&record.item_type));
        }
        if let Some(banner) = record.banner() {
            properties.insert(fields::LOG_GACHA_TYPE.into(), props::select(banner));
        }
        if !record.rank_type.is_empty() {
            properties.insert(fields::LOG_RANK.into(), props::select(&record.rank_type));
        }
        if let Some(iso) = record
            .time
            .as_deref()
            .and_then(|t| uigf_to_iso(t, offset))
        {
            properties.insert(fields::LOG_DATE_TIME.into(), props::date(&iso));
        }
        properties.insert(fields::LOG_USER.into(), props::relation(&[user_page_id]));
        if let Some(pity) = record.pity_count {
            properties.insert(fields::LOG_PITY.into(), props::number(pity));
        }
        let referenced: Vec<&str> = master_page_id.into_iter().collect();
        properties.insert(fields::LOG_REFERENCED_ITEM.into(), props::relation(&referenced));
        properties
    }

    pub async fn add_pull_record(
        &self,
        record: &PullRecord,
        user_page_id: &str,
        master_page_id: Option<&str>,
        utc_offset: Option<&str>,
    ) -> AppResult<Page> {
        let properties =
            self.pull_record_properties(record, user_page_id, master_page_id, utc_offset);
        self.create_page(&self.gacha_log_db_id, properties).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use serde_json::json;

    fn client(store: &Arc<InMemoryStore>, delay: &Arc<RecordingDelay>) -> SyncClient {
        let dir = std::env::temp_dir();
        SyncClient::new(store.clone(), delay.clone(), &test_config(&dir))
    }

    fn seed_logs(store: &InMemoryStore, count: usize) {
        for i in 0..count {
            store.seed(LOG_DB, json!({"Item ID": {"rich_text": [{"plain_text": i.to_string()}]}}));
        }
    }

    #[tokio::test]
    async fn test_fetch_all_concatenates_pages_in_order() {
        let store = Arc::new(InMemoryStore::new());
        let delay = Arc::new(RecordingDelay::new());
        seed_logs(&store, 250);

        let scan = client(&store, &delay).fetch_all(LOG_DB, None).await;
        assert!(scan.is_complete());
        assert_eq!(store.query_calls(), 3);
        let ids: Vec<String> = scan
            .pages
            .iter()
            .map(|p| p.rich_text("Item ID").unwrap().to_string())
            .collect();
        let expected: Vec<String> = (0..250).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_fetch_all_returns_partial_on_failure() {
        let store = Arc::new(InMemoryStore::new());
        let delay = Arc::new(RecordingDelay::new());
        seed_logs(&store, 350);
        store.fail_query_call(3);

        let scan = client(&store, &delay).fetch_all(LOG_DB, None).await;
        assert!(!scan.is_complete());
        assert_eq!(scan.pages.len(), 200);
        assert_eq!(scan.pages[199].rich_text("Item ID"), Some("199"));
        assert_eq!(store.query_calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_backs_off_then_succeeds() {
        let store = Arc::new(InMemoryStore::new());
        let delay = Arc::new(RecordingDelay::new());
        store.push_faults([Some(Fault::RateLimited), Some(Fault::RateLimited)]);

        let page = client(&store, &delay)
            .create_page(LOG_DB, Map::new())
            .await
            .unwrap();
        assert!(!page.id.is_empty());
        assert_eq!(store.create_calls(), 3);
        assert_eq!(
            delay.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_retry_exhaustion_escalates_to_remote_error() {
        let store = Arc::new(InMemoryStore::new());
        let delay = Arc::new(RecordingDelay::new());
        store.push_faults([Some(Fault::RateLimited); 4]);

        let err = client(&store, &delay)
            .create_page(LOG_DB, Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RemoteError(_)));
        assert_eq!(store.create_calls(), 4);
        assert_eq!(
            delay.sleeps(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let store = Arc::new(InMemoryStore::new());
        let delay = Arc::new(RecordingDelay::new());
        store.push_faults([Some(Fault::Remote)]);

        let err = client(&store, &delay)
            .update_page("missing", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RemoteError(_)));
        assert_eq!(store.update_calls(), 1);
        assert!(delay.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_create_user_page_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let delay = Arc::new(RecordingDelay::new());
        let client = client(&store, &delay);

        let first = client.get_or_create_user_page("800000001", "原神").await.unwrap();
        let second = client.get_or_create_user_page("800000001", "原神").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.pages(SETTINGS_DB).len(), 1);
        assert_eq!(store.create_calls(), 1);

        let page = &store.pages(SETTINGS_DB)[0];
        assert_eq!(page.title("Account"), Some("原神 User (800000001)"));
        assert_eq!(page.select("Game"), Some("原神"));
    }

    #[tokio::test]
    async fn test_master_mapping_resolves_id_then_name() {
        let store = Arc::new(InMemoryStore::new());
        let delay = Arc::new(RecordingDelay::new());
        let by_id = store.seed(
            MASTER_DB,
            json!({"Item ID": {"rich_text": [{"plain_text": "10000042"}]}, "名前": {"title": [{"plain_text": "刻晴"}]}}),
        );
        let by_name = store.seed(MASTER_DB, json!({"名前": {"title": [{"plain_text": "天空の刃"}]}}));

        let mapping = client(&store, &delay).master_mapping().await;
        assert_eq!(mapping.resolve(Some("10000042"), "whatever"), Some(by_id.as_str()));
        assert_eq!(mapping.resolve(Some("1"), "天空の刃"), Some(by_name.as_str()));
        assert_eq!(mapping.resolve(None, "nothing"), None);
    }

    #[test]
    fn test_pull_record_properties_omit_missing_fields() {
        let store = Arc::new(InMemoryStore::new());
        let delay = Arc::new(RecordingDelay::new());
        let record = PullRecord {
            id: "1".into(),
            item_id: None,
            name: "Amber".into(),
            item_type: String::new(),
            rank_type: "4".into(),
            gacha_type: Some("400".into()),
            uigf_gacha_type: Some("301".into()),
            time: Some("not a time".into()),
            pity_count: None,
        };
        let properties = client(&store, &delay).pull_record_properties(&record, "user-1", None, None);
        assert!(!properties.contains_key("Date Time"));
        assert!(!properties.contains_key("Pity"));
        assert!(!properties.contains_key("Item Type"));
        assert_eq!(properties["Gacha Type"], json!({"select": {"name": "301"}}));
        assert_eq!(properties["Referenced Item"], json!({"relation": []}));

        let record = PullRecord {
            time: Some("2024-01-01 10:00:00".into()),
            pity_count: Some(12),
            ..record
        };
        let properties =
            client(&store, &delay).pull_record_properties(&record, "user-1", Some("master-1"), None);
        assert_eq!(
            properties["Date Time"],
            json!({"date": {"start": "2024-01-01T10:00:00+09:00"}})
        );

        // 文件声明的时区优先于配置
        let declared = client(&store, &delay).pull_record_properties(
            &record,
            "user-1",
            None,
            Some("+08:00"),
        );
        assert_eq!(
            declared["Date Time"],
            json!({"date": {"start": "2024-01-01T10:00:00+08:00"}})
        );
        assert_eq!(properties["Pity"], json!({"number": 12}));
        assert_eq!(properties["Referenced Item"], json!({"relation": [{"id": "master-1"}]}));
    }
}
