use crate::config::{Config, ExportConfig};
use crate::error::AppResult;
use crate::models::game::{UigfVersion, game_code_for_name};
use crate::models::page::{Page, fields};
use crate::models::uigf::{ExportItem, V3Document, V3Info, V4Account, V4Document, V4Info};
use crate::services::sync_client::SyncClient;
use crate::utils::time::{UIGF_TIME_FORMAT, iso_to_uigf};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// 单个账号的抽卡记录
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserLogs {
    pub game_code: String,
    pub list: Vec<ExportItem>,
}

struct SettingsEntry {
    uid: String,
    game_code: String,
}

pub fn export_item_from_page(page: &Page) -> ExportItem {
    let id = page.rich_text(fields::LOG_ITEM_ID).map(str::to_string);
    let gacha_type = page.select(fields::LOG_GACHA_TYPE).map(str::to_string);
    ExportItem {
        item_id: id.clone(),
        id,
        name: page.title(fields::LOG_ITEM_NAME).map(str::to_string),
        item_type: page.select(fields::LOG_ITEM_TYPE).map(str::to_string),
        rank_type: page.select(fields::LOG_RANK).map(str::to_string),
        uigf_gacha_type: gacha_type.clone(),
        gacha_id: gacha_type.clone().unwrap_or_default(),
        gacha_type,
        time: page
            .date_start(fields::LOG_DATE_TIME)
            .filter(|s| !s.is_empty())
            .map(iso_to_uigf),
        count: "1".to_string(),
    }
}

/// 按 UID 关联设置页并分组，找不到所属账号的记录直接丢弃
pub fn group_by_uid(settings: &[Page], logs: &[Page]) -> BTreeMap<String, UserLogs> {
    let owners: HashMap<&str, SettingsEntry> = settings
        .iter()
        .map(|page| {
            let entry = SettingsEntry {
                uid: page.rich_text(fields::SETTINGS_UID).unwrap_or_default().to_string(),
                game_code: game_code_for_name(page.select(fields::SETTINGS_GAME).unwrap_or_default())
                    .to_string(),
            };
            (page.id.as_str(), entry)
        })
        .collect();

    let mut grouped: BTreeMap<String, UserLogs> = BTreeMap::new();
    for page in logs {
        let Some(owner) = page
            .relation_id(fields::LOG_USER)
            .and_then(|id| owners.get(id))
        else {
            continue;
        };
        grouped
            .entry(owner.uid.clone())
            .or_insert_with(|| UserLogs {
                game_code: owner.game_code.clone(),
                list: Vec::new(),
            })
            .list
            .push(export_item_from_page(page));
    }
    grouped
}

/// 每个 UID 一个文件：`uigf_v3.0_{uid}_{timestamp}.json`
pub fn build_v3_documents(
    groups: &BTreeMap<String, UserLogs>,
    export: &ExportConfig,
    now: DateTime<Local>,
) -> Vec<(String, V3Document)> {
    let timestamp = now.timestamp();
    groups
        .iter()
        .filter(|(_, logs)| !logs.list.is_empty())
        .map(|(uid, logs)| {
            let document = V3Document {
                info: V3Info {
                    uid: uid.clone(),
                    lang: export.lang.clone(),
                    export_timestamp: timestamp,
                    export_time: now.format(UIGF_TIME_FORMAT).to_string(),
                    export_app: export.app_name.clone(),
                    export_app_version: export.app_version.clone(),
                    uigf_version: UigfVersion::V3.export_tag().to_string(),
                    region_time_zone: export.timezone,
                },
                list: logs.list.clone(),
            };
            (format!("uigf_v3.0_{uid}_{timestamp}.json"), document)
        })
        .collect()
}

/// 所有账号按游戏代码分组写入同一个文件
pub fn build_v4_document(
    groups: &BTreeMap<String, UserLogs>,
    export: &ExportConfig,
    now: DateTime<Local>,
) -> (String, V4Document) {
    let timestamp = now.timestamp();
    let mut games: BTreeMap<String, Vec<V4Account>> = BTreeMap::new();
    for (uid, logs) in groups.iter().filter(|(_, logs)| !logs.list.is_empty()) {
        games
            .entry(logs.game_code.clone())
            .or_default()
            .push(V4Account {
                uid: uid.clone(),
                timezone: export.timezone,
                lang: export.lang.clone(),
                list: logs.list.clone(),
            });
    }
    let document = V4Document {
        info: V4Info {
            version: UigfVersion::V4.export_tag().to_string(),
            export_app: export.app_name.clone(),
            export_app_version: export.app_version.clone(),
            export_timestamp: timestamp,
        },
        games,
    };
    (format!("uigf_v4.1_{timestamp}.json"), document)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    std::fs::write(path, buf)?;
    Ok(())
}

/// 抽卡记录数据库 -> UIGF 文件
#[derive(Clone)]
pub struct ExportService {
    client: SyncClient,
    export: ExportConfig,
}

impl ExportService {
    pub fn new(client: SyncClient, config: &Config) -> Self {
        Self {
            client,
            export: config.export.clone(),
        }
    }

    pub async fn collect(&self) -> BTreeMap<String, UserLogs> {
        log::info!("Fetching user settings");
        let settings = self.client.fetch_all(self.client.settings_db_id(), None).await;
        log::info!("Fetching gacha log");
        let logs = self.client.fetch_all(self.client.gacha_log_db_id(), None).await;
        if !settings.is_complete() || !logs.is_complete() {
            log::warn!("Remote scan was incomplete; the export may be missing records");
        }
        group_by_uid(&settings.pages, &logs.pages)
    }

    /// 写出导出文件，返回文件路径
    pub async fn export(&self, version: UigfVersion) -> AppResult<Vec<PathBuf>> {
        let groups = self.collect().await;
        let now = Local::now();
        let out_dir = PathBuf::from(&self.export.output_dir);
        std::fs::create_dir_all(&out_dir)?;

        let mut written = Vec::new();
        match version {
            UigfVersion::V3 => {
                for (name, document) in build_v3_documents(&groups, &self.export, now) {
                    let path = out_dir.join(name);
                    write_json(&path, &document)?;
                    log::info!(
                        "Exported {} ({} records) to {}",
                        document.info.uid,
                        document.list.len(),
                        path.display()
                    );
                    written.push(path);
                }
            }
            UigfVersion::V4 => {
                let (name, document) = build_v4_document(&groups, &self.export, now);
                let path = out_dir.join(name);
                write_json(&path, &document)?;
                log::info!("Exported {} accounts to {}", groups.len(), path.display());
                written.push(path);
            }
        }
        Ok(written)
    }
}
