//! UIGF 导出文档结构

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 导出文件中的一条记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gacha_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uigf_gacha_type: Option<String>,
    pub gacha_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub count: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V3Info {
    pub uid: String,
    pub lang: String,
    pub export_timestamp: i64,
    pub export_time: String,
    pub export_app: String,
    pub export_app_version: String,
    pub uigf_version: String,
    pub region_time_zone: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V3Document {
    pub info: V3Info,
    pub list: Vec<ExportItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V4Info {
    pub version: String,
    pub export_app: String,
    pub export_app_version: String,
    pub export_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V4Account {
    pub uid: String,
    pub timezone: i32,
    pub lang: String,
    pub list: Vec<ExportItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct V4Document {
    pub info: V4Info,
    /// 按游戏代码（`hk4e`、`hkrpg`、`nap`）分组的账号
    #[serde(flatten)]
    pub games: BTreeMap<String, Vec<V4Account>>,
}

/// `item_master_map.json` 的一项，以 item id 为键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMasterInfo {
    pub icon: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub name: Option<String>,
}
