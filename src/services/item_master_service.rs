use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::page::{fields, props};
use crate::models::uigf::ItemMasterInfo;
use crate::services::sync_client::SyncClient;
use crate::utils::uigf_parser::{parse_file, strip_bom};
use serde_json::Map;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

const ICON_BASE_URL: &str = "https://enka.network/ui";

pub fn load_master_map(path: &Path) -> AppResult<BTreeMap<String, ItemMasterInfo>> {
    let bytes = std::fs::read(path).map_err(|e| {
        AppError::ConfigError(format!(
            "cannot read {} (generate it with the mapping fetcher first): {e}",
            path.display()
        ))
    })?;
    Ok(serde_json::from_slice(strip_bom(&bytes))?)
}

/// 为抽卡记录中出现的物品注册物品主数据
#[derive(Clone)]
pub struct ItemMasterService {
    client: SyncClient,
    map_file: PathBuf,
}

impl ItemMasterService {
    pub fn new(client: SyncClient, config: &Config) -> Self {
        Self {
            client,
            map_file: PathBuf::from(&config.import.item_master_map_file),
        }
    }

    pub async fn existing_master_ids(&self) -> HashSet<String> {
        log::info!("Fetching existing item master entries");
        let scan = self.client.fetch_all(self.client.master_db_id(), None).await;
        scan.pages
            .iter()
            .filter_map(|p| p.rich_text(fields::MASTER_ITEM_ID))
            .map(str::to_string)
            .collect()
    }

    /// 返回新注册的条数
    pub async fn register_from_history(&self, uigf_path: impl AsRef<Path>) -> AppResult<usize> {
        let master_map = load_master_map(&self.map_file)?;
        let envelope = parse_file(uigf_path)?;
        if envelope.records.is_empty() {
            return Err(AppError::FormatError(
                "pull history is empty; nothing to register".to_string(),
            ));
        }

        let history_names: HashSet<&str> = envelope
            .records
            .iter()
            .map(|r| r.name.as_str())
            .filter(|n| !n.is_empty())
            .collect();
        let mut existing = self.existing_master_ids().await;

        log::info!("Registering item master entries ({} candidates)", master_map.len());
        let mut registered = 0;
        for (item_id, info) in &master_map {
            let Some(name) = info.name.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };
            if !history_names.contains(name) || existing.contains(item_id) {
                continue;
            }

            let mut properties = Map::new();
            properties.insert(fields::MASTER_NAME.into(), props::title(name));
            properties.insert(fields::MASTER_ITEM_ID.into(), props::rich_text(item_id));
            properties.insert(fields::MASTER_ITEM_TYPE.into(), props::select(&info.item_type));
            properties.insert(
                fields::MASTER_ICON.into(),
                props::external_file(
                    &format!("{}.png", info.icon),
                    &format!("{ICON_BASE_URL}/{}.png", info.icon),
                ),
            );

            match self
                .client
                .create_page(self.client.master_db_id(), properties)
                .await
            {
                Ok(_) => {
                    log::info!("Registered master item: {} ({})", name, info.item_type);
                    existing.insert(item_id.clone());
                    registered += 1;
                    self.client.pause().await;
                }
                Err(e) => log::error!("Failed to register {}: {}", name, e),
            }
        }

        log::info!("Item master update complete: {} new entries", registered);
        Ok(registered)
    }
}
