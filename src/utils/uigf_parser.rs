use crate::error::{AppError, AppResult};
use crate::models::common::value_to_string;
use crate::models::game::{Game, UigfVersion, game_name_for_code};
use crate::models::pull::{ImportEnvelope, PullRecord, RawPull};
use serde_json::Value;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DEFAULT_VERSION: &str = "v3.0";
const DEFAULT_GAME_CODE: &str = "hk4e";

pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

pub fn parse_file(path: impl AsRef<Path>) -> AppResult<ImportEnvelope> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        AppError::FormatError(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_bytes(&bytes)
}

/// 解析 UIGF 3.0 / 4.x 文档
pub fn parse_bytes(bytes: &[u8]) -> AppResult<ImportEnvelope> {
    let doc: Value = serde_json::from_slice(strip_bom(bytes))
        .map_err(|e| AppError::FormatError(format!("invalid JSON: {e}")))?;

    let info = doc.get("info").cloned().unwrap_or(Value::Null);
    let raw_version = non_empty_str(&info, "uigf_version")
        .or_else(|| non_empty_str(&info, "version"))
        .unwrap_or(DEFAULT_VERSION)
        .to_string();
    let version = UigfVersion::detect(&raw_version);

    let (uid, list, game_code, timezone) = match version {
        UigfVersion::V4 => {
            let (game, block) = Game::ALL
                .into_iter()
                .find_map(|game| {
                    doc.get(game.code())
                        .and_then(Value::as_array)
                        .and_then(|blocks| blocks.first())
                        .map(|block| (game, block))
                })
                .ok_or_else(|| {
                    AppError::FormatError(format!(
                        "no account data under any known game key ({raw_version})"
                    ))
                })?;
            (
                block.get("uid").and_then(value_to_string),
                block.get("list"),
                game.code().to_string(),
                block.get("timezone").and_then(timezone_hours),
            )
        }
        UigfVersion::V3 => (
            info.get("uid").and_then(value_to_string),
            doc.get("list"),
            non_empty_str(&info, "s_game")
                .unwrap_or(DEFAULT_GAME_CODE)
                .to_string(),
            info.get("region_time_zone").and_then(timezone_hours),
        ),
    };

    let uid = uid.ok_or_else(|| {
        AppError::FormatError(format!("uid not found (version {raw_version})"))
    })?;
    let records = parse_list(list)?;
    let game_name = game_name_for_code(&game_code);

    Ok(ImportEnvelope {
        uid,
        records,
        version,
        raw_version,
        game_name,
        game_code,
        timezone,
    })
}

// 时区可能是数字也可能是字符串
fn timezone_hours(value: &Value) -> Option<i32> {
    let hours: i32 = match value {
        Value::Number(n) => n.as_i64().and_then(|h| i32::try_from(h).ok())?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (-12..=14).contains(&hours).then_some(hours)
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn parse_list(list: Option<&Value>) -> AppResult<Vec<PullRecord>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    let entries = list
        .as_array()
        .ok_or_else(|| AppError::FormatError("`list` is not an array".to_string()))?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            serde_json::from_value::<RawPull>(entry.clone())
                .map(PullRecord::from)
                .map_err(|e| AppError::FormatError(format!("list[{i}]: {e}")))
        })
        .collect()
}
