use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub notion: NotionConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    pub token: String,
    #[serde(default = "default_notion_version")]
    pub version: String,
    #[serde(default = "default_notion_base_url")]
    pub base_url: String,
    pub settings_db_id: String,
    pub gacha_log_db_id: String,
    pub master_db_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// 单次运行最多写入的新记录数
    pub max_import_limit: usize,
    pub cache_file: String,
    pub cache_flush_every: usize,
    /// 每次远程写入后的固定等待（毫秒）
    pub request_interval_ms: u64,
    pub item_master_map_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub app_name: String,
    pub app_version: String,
    pub timezone: i32, // 相对 UTC 的小时数
    pub lang: String,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

fn default_notion_base_url() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_item_master_map_file() -> String {
    "item_master_map.json".to_string()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_import_limit: 500,
            cache_file: "uigf_cache.json".to_string(),
            cache_flush_every: 10,
            request_interval_ms: 400,
            item_master_map_file: default_item_master_map_file(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            app_name: "uigf-notion-app".to_string(),
            app_version: format!("v{}", env!("CARGO_PKG_VERSION")),
            timezone: 9,
            lang: "ja-jp".to_string(),
            output_dir: ".".to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl ExportConfig {
    /// 写入 Notion 时附加的 `+09:00` 形式时区
    pub fn utc_offset(&self) -> String {
        crate::utils::time::format_utc_offset(self.timezone)
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：完全依赖环境变量
                let token = get_env("NOTION_TOKEN")
                    .ok_or("NOTION_TOKEN is not set and config.toml was not found")?;

                Config {
                    notion: NotionConfig {
                        token,
                        version: default_notion_version(),
                        base_url: default_notion_base_url(),
                        settings_db_id: get_env("SETTINGS_DB_ID").unwrap_or_default(),
                        gacha_log_db_id: get_env("GACHA_LOG_DB_ID").unwrap_or_default(),
                        master_db_id: get_env("MASTER_DB_ID").unwrap_or_default(),
                    },
                    import: ImportConfig::default(),
                    export: ExportConfig::default(),
                    retry: RetryConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("cannot read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 环境变量优先于配置文件
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("NOTION_TOKEN") {
            self.notion.token = v;
        }
        if let Some(v) = get_env("NOTION_VERSION") {
            self.notion.version = v;
        }
        if let Some(v) = get_env("NOTION_BASE_URL") {
            self.notion.base_url = v;
        }
        if let Some(v) = get_env("SETTINGS_DB_ID") {
            self.notion.settings_db_id = v;
        }
        if let Some(v) = get_env("GACHA_LOG_DB_ID") {
            self.notion.gacha_log_db_id = v;
        }
        if let Some(v) = get_env("MASTER_DB_ID") {
            self.notion.master_db_id = v;
        }
        if let Some(v) = get_env("MAX_IMPORT_LIMIT")
            && let Ok(n) = v.parse()
        {
            self.import.max_import_limit = n;
        }
        if let Some(v) = get_env("CACHE_FILE") {
            self.import.cache_file = v;
        }
        if let Some(v) = get_env("ITEM_MASTER_MAP_FILE") {
            self.import.item_master_map_file = v;
        }
        if let Some(v) = get_env("EXPORT_APP_VERSION") {
            self.export.app_version = v;
        }
        if let Some(v) = get_env("DEFAULT_TIMEZONE")
            && let Ok(tz) = v.parse()
        {
            self.export.timezone = tz;
        }
        if let Some(v) = get_env("DEFAULT_LANG") {
            self.export.lang = v;
        }
        if let Some(v) = get_env("EXPORT_DIR") {
            self.export.output_dir = v;
        }
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.notion.token.is_empty() {
            log::warn!("NOTION_TOKEN is empty; remote requests will be rejected");
        }
        if !(-12..=14).contains(&self.export.timezone) {
            return Err(format!("timezone offset out of range: {}", self.export.timezone).into());
        }
        if self.import.cache_flush_every == 0 {
            return Err("cache_flush_every must be greater than zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [notion]
        token = "secret"
        settings_db_id = "settings"
        gacha_log_db_id = "log"
        master_db_id = "master"

        [import]
        max_import_limit = 50
        cache_file = "cache.json"
        cache_flush_every = 5
        request_interval_ms = 0
    "#;

    #[test]
    fn test_parse_toml_with_defaults() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.notion.version, "2022-06-28");
        assert_eq!(config.notion.base_url, "https://api.notion.com/v1");
        assert_eq!(config.import.max_import_limit, 50);
        assert_eq!(config.import.item_master_map_file, "item_master_map.json");
        assert_eq!(config.export.timezone, 9);
        assert_eq!(config.export.lang, "ja-jp");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
    }

    #[test]
    fn test_utc_offset() {
        let mut export = ExportConfig::default();
        assert_eq!(export.utc_offset(), "+09:00");
        export.timezone = -5;
        assert_eq!(export.utc_offset(), "-05:00");
        export.timezone = 0;
        assert_eq!(export.utc_offset(), "+00:00");
    }

    #[test]
    fn test_validate_rejects_bad_timezone() {
        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.export.timezone = 20;
        assert!(config.validate().is_err());
    }
}
