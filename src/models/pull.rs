use crate::models::common::lenient_string;
use crate::models::game::UigfVersion;
use serde::{Deserialize, Serialize};

/// 文件中 UIGF `list` 的一条原始记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPull {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rank_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gacha_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uigf_gacha_type: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

/// 导入、保底计算、导出共用的抽卡记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRecord {
    pub id: String,
    pub item_id: Option<String>,
    pub name: String,
    pub item_type: String,
    pub rank_type: String,
    pub gacha_type: Option<String>,
    pub uigf_gacha_type: Option<String>,
    pub time: Option<String>,
    pub pity_count: Option<u32>,
}

pub const TOP_RANK: &str = "5";
pub const UNKNOWN_BANNER: &str = "unknown";

impl From<RawPull> for PullRecord {
    fn from(raw: RawPull) -> Self {
        let id = raw.id.or_else(|| raw.item_id.clone()).unwrap_or_default();
        Self {
            id,
            item_id: raw.item_id,
            name: raw.name.unwrap_or_else(|| "Unknown".to_string()),
            item_type: raw.item_type.unwrap_or_default(),
            rank_type: raw.rank_type.unwrap_or_default(),
            gacha_type: raw.gacha_type,
            uigf_gacha_type: raw.uigf_gacha_type,
            time: raw.time.filter(|t| !t.is_empty()),
            pity_count: None,
        }
    }
}

impl PullRecord {
    /// 卡池类型，`uigf_gacha_type` 优先于 `gacha_type`
    pub fn banner(&self) -> Option<&str> {
        self.uigf_gacha_type
            .as_deref()
            .or(self.gacha_type.as_deref())
    }

    /// 保底计数所用的卡池键
    pub fn banner_key(&self) -> &str {
        self.banner().unwrap_or(UNKNOWN_BANNER)
    }

    pub fn is_top_rank(&self) -> bool {
        self.rank_type == TOP_RANK
    }
}

/// 一个 UIGF 文件的解析结果
#[derive(Debug, Clone)]
pub struct ImportEnvelope {
    pub uid: String,
    pub records: Vec<PullRecord>,
    pub version: UigfVersion,
    /// 文件中声明的原始版本字符串
    pub raw_version: String,
    pub game_name: String,
    pub game_code: String,
    /// 文件声明的时区（小时），未声明时为 None
    pub timezone: Option<i32>,
}
