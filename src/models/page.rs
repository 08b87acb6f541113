//! Notion 页面与属性结构

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// 三个数据库的属性名
pub mod fields {
    pub const SETTINGS_ACCOUNT: &str = "Account";
    pub const SETTINGS_UID: &str = "UID";
    pub const SETTINGS_GAME: &str = "Game";

    pub const LOG_ITEM_NAME: &str = "Item Name";
    pub const LOG_ITEM_ID: &str = "Item ID";
    pub const LOG_ITEM_TYPE: &str = "Item Type";
    pub const LOG_GACHA_TYPE: &str = "Gacha Type";
    pub const LOG_RANK: &str = "Rank";
    pub const LOG_DATE_TIME: &str = "Date Time";
    pub const LOG_USER: &str = "UID";
    pub const LOG_PITY: &str = "Pity";
    pub const LOG_REFERENCED_ITEM: &str = "Referenced Item";
    pub const LOG_DUPLICATE_FLAG: &str = "Duplicate Flag";

    pub const MASTER_NAME: &str = "名前";
    pub const MASTER_ITEM_ID: &str = "Item ID";
    pub const MASTER_ITEM_TYPE: &str = "Item Type";
    pub const MASTER_ICON: &str = "Icon";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// 数据库查询的一页结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryPage {
    #[serde(default)]
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

fn first_text(items: &Value) -> Option<&str> {
    let first = items.as_array()?.first()?;
    first["plain_text"]
        .as_str()
        .or_else(|| first["text"]["content"].as_str())
}

impl Page {
    fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn title(&self, name: &str) -> Option<&str> {
        first_text(self.property(name)?.get("title")?)
    }

    pub fn rich_text(&self, name: &str) -> Option<&str> {
        first_text(self.property(name)?.get("rich_text")?)
    }

    pub fn select(&self, name: &str) -> Option<&str> {
        self.property(name)?.get("select")?.get("name")?.as_str()
    }

    pub fn relation_id(&self, name: &str) -> Option<&str> {
        self.property(name)?
            .get("relation")?
            .as_array()?
            .first()?
            .get("id")?
            .as_str()
    }

    pub fn date_start(&self, name: &str) -> Option<&str> {
        self.property(name)?.get("date")?.get("start")?.as_str()
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.property(name)?.get("number")?.as_f64()
    }

    pub fn checkbox(&self, name: &str) -> bool {
        self.property(name)
            .and_then(|p| p.get("checkbox"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// 创建 / 更新请求中的属性值构造
pub mod props {
    use super::*;

    pub fn title(content: &str) -> Value {
        json!({"title": [{"text": {"content": content}}]})
    }

    pub fn rich_text(content: &str) -> Value {
        json!({"rich_text": [{"text": {"content": content}}]})
    }

    pub fn select(name: &str) -> Value {
        json!({"select": {"name": name}})
    }

    pub fn date(start: &str) -> Value {
        json!({"date": {"start": start}})
    }

    pub fn relation(ids: &[&str]) -> Value {
        let ids: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
        json!({"relation": ids})
    }

    pub fn number(n: u32) -> Value {
        json!({"number": n})
    }

    pub fn checkbox(checked: bool) -> Value {
        json!({"checkbox": checked})
    }

    pub fn external_file(name: &str, url: &str) -> Value {
        json!({"files": [{"name": name, "type": "external", "external": {"url": url}}]})
    }

    /// rich_text 属性的相等过滤
    pub fn rich_text_equals(property: &str, value: &str) -> Value {
        json!({"property": property, "rich_text": {"equals": value}})
    }
}
