//! 服务层测试共用的内存实现

use crate::config::{Config, ExportConfig, ImportConfig, NotionConfig, RetryConfig};
use crate::error::{AppError, AppResult};
use crate::external::store::RecordStore;
use crate::models::page::{Page, QueryPage};
use crate::utils::delay::Delay;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub const SETTINGS_DB: &str = "settings-db";
pub const LOG_DB: &str = "log-db";
pub const MASTER_DB: &str = "master-db";

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    RateLimited,
    Remote,
}

impl Fault {
    fn into_error(self, operation: &str) -> AppError {
        match self {
            Fault::RateLimited => AppError::RateLimited(format!("{operation}: HTTP 429")),
            Fault::Remote => AppError::RemoteError(format!("{operation}: HTTP 500")),
        }
    }
}

#[derive(Default)]
struct Inner {
    databases: HashMap<String, Vec<Page>>,
    next_id: u64,
    /// 每次调用消耗一个，不区分调用类型
    faults: VecDeque<Option<Fault>>,
    /// 第几次查询（从 1 开始）返回远程错误
    fail_query_call: Option<usize>,
    fail_update_pages: HashSet<String>,
    query_calls: usize,
    create_calls: usize,
    update_calls: usize,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, database_id: &str, properties: Value) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("page-{}", inner.next_id);
        inner
            .databases
            .entry(database_id.to_string())
            .or_default()
            .push(Page {
                id: id.clone(),
                properties: properties.as_object().cloned().unwrap_or_default(),
            });
        id
    }

    pub fn push_faults(&self, faults: impl IntoIterator<Item = Option<Fault>>) {
        self.inner.lock().unwrap().faults.extend(faults);
    }

    pub fn fail_query_call(&self, call: usize) {
        self.inner.lock().unwrap().fail_query_call = Some(call);
    }

    pub fn fail_update_for(&self, page_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .fail_update_pages
            .insert(page_id.to_string());
    }

    pub fn pages(&self, database_id: &str) -> Vec<Page> {
        self.inner
            .lock()
            .unwrap()
            .databases
            .get(database_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn query_calls(&self) -> usize {
        self.inner.lock().unwrap().query_calls
    }

    pub fn create_calls(&self) -> usize {
        self.inner.lock().unwrap().create_calls
    }

    pub fn update_calls(&self) -> usize {
        self.inner.lock().unwrap().update_calls
    }
}

fn matches_filter(page: &Page, filter: Option<&Value>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let property = filter["property"].as_str().unwrap_or_default();
    let expected = filter["rich_text"]["equals"].as_str();
    page.rich_text(property) == expected
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn query(
        &self,
        database_id: &str,
        filter: Option<&Value>,
        start_cursor: Option<&str>,
        page_size: Option<u32>,
    ) -> AppResult<QueryPage> {
        let mut inner = self.inner.lock().unwrap();
        inner.query_calls += 1;
        if let Some(Some(fault)) = inner.faults.pop_front() {
            return Err(fault.into_error("query database"));
        }
        if inner.fail_query_call == Some(inner.query_calls) {
            return Err(Fault::Remote.into_error("query database"));
        }

        let matching: Vec<Page> = inner
            .databases
            .get(database_id)
            .map(|pages| {
                pages
                    .iter()
                    .filter(|p| matches_filter(p, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let start: usize = start_cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let size = page_size.unwrap_or(100) as usize;
        let end = (start + size).min(matching.len());
        let has_more = end < matching.len();

        Ok(QueryPage {
            results: matching.get(start..end).map(<[Page]>::to_vec).unwrap_or_default(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    async fn create(&self, database_id: &str, properties: Map<String, Value>) -> AppResult<Page> {
        let mut inner = self.inner.lock().unwrap();
        inner.create_calls += 1;
        if let Some(Some(fault)) = inner.faults.pop_front() {
            return Err(fault.into_error("create page"));
        }
        inner.next_id += 1;
        let page = Page {
            id: format!("page-{}", inner.next_id),
            properties,
        };
        inner
            .databases
            .entry(database_id.to_string())
            .or_default()
            .push(page.clone());
        Ok(page)
    }

    async fn update(&self, page_id: &str, properties: Map<String, Value>) -> AppResult<Page> {
        let mut inner = self.inner.lock().unwrap();
        inner.update_calls += 1;
        if let Some(Some(fault)) = inner.faults.pop_front() {
            return Err(fault.into_error("update page"));
        }
        if inner.fail_update_pages.contains(page_id) {
            return Err(Fault::Remote.into_error("update page"));
        }
        let page = inner
            .databases
            .values_mut()
            .flat_map(|pages| pages.iter_mut())
            .find(|p| p.id == page_id)
            .ok_or_else(|| AppError::RemoteError(format!("update page: {page_id} not found")))?;
        page.properties.extend(properties);
        Ok(page.clone())
    }
}

#[derive(Default)]
pub struct RecordingDelay {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn test_config(dir: &std::path::Path) -> Config {
    Config {
        notion: NotionConfig {
            token: "secret_test".into(),
            version: "2022-06-28".into(),
            base_url: "http://localhost".into(),
            settings_db_id: SETTINGS_DB.into(),
            gacha_log_db_id: LOG_DB.into(),
            master_db_id: MASTER_DB.into(),
        },
        import: ImportConfig {
            max_import_limit: 500,
            cache_file: dir.join("uigf_cache.json").to_string_lossy().into_owned(),
            cache_flush_every: 10,
            request_interval_ms: 400,
            item_master_map_file: dir.join("item_master_map.json").to_string_lossy().into_owned(),
        },
        export: ExportConfig {
            output_dir: dir.to_string_lossy().into_owned(),
            ..ExportConfig::default()
        },
        retry: RetryConfig::default(),
    }
}
