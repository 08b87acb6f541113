use crate::models::page::{fields, props};
use crate::services::sync_client::SyncClient;
use serde::Serialize;
use serde_json::Map;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub scanned: usize,
    /// 出现在多个页面上的 Item ID 数
    pub groups: usize,
    pub flagged: usize,
    pub failed: usize,
    pub scan_complete: bool,
}

/// 标记 `Item ID` 重复的抽卡记录，只打标记，不删除也不合并
#[derive(Clone)]
pub struct DuplicateService {
    client: SyncClient,
}

impl DuplicateService {
    pub fn new(client: SyncClient) -> Self {
        Self { client }
    }

    pub async fn validate(&self) -> ValidationReport {
        let scan = self.client.fetch_all(self.client.gacha_log_db_id(), None).await;

        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for page in &scan.pages {
            if let Some(item_id) = page.rich_text(fields::LOG_ITEM_ID) {
                groups.entry(item_id).or_default().push(page.id.as_str());
            }
        }
        groups.retain(|_, pages| pages.len() > 1);

        let mut report = ValidationReport {
            scanned: scan.pages.len(),
            groups: groups.len(),
            scan_complete: scan.is_complete(),
            ..ValidationReport::default()
        };

        if groups.is_empty() {
            log::info!("No duplicate item ids found in {} records", report.scanned);
            return report;
        }
        log::info!("Found {} duplicated item ids", report.groups);

        for (item_id, page_ids) in &groups {
            for page_id in page_ids {
                let mut properties = Map::new();
                properties.insert(fields::LOG_DUPLICATE_FLAG.into(), props::checkbox(true));
                match self.client.update_page(page_id, properties).await {
                    Ok(_) => {
                        report.flagged += 1;
                        if report.flagged % 5 == 0 {
                            log::info!("Flagging duplicates: {} done", report.flagged);
                        }
                    }
                    Err(e) => {
                        log::error!(
                            "Failed to flag page {} (Item ID {}): {}",
                            page_id,
                            item_id,
                            e
                        );
                        report.failed += 1;
                    }
                }
                self.client.pause().await;
            }
        }

        log::info!(
            "Duplicate validation complete: {} flagged, {} failed",
            report.flagged,
            report.failed
        );
        report
    }
}
