use chrono::{DateTime, NaiveDateTime};

pub const UIGF_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// 整数小时时区 -> `+09:00` / `-05:00`
pub fn format_utc_offset(hours: i32) -> String {
    let sign = if hours < 0 { '-' } else { '+' };
    format!("{}{:02}:00", sign, hours.abs())
}

/// `2024-01-01 10:00:00` + `+09:00` -> `2024-01-01T10:00:00+09:00`，无法解析时返回 None
pub fn uigf_to_iso(time: &str, offset: &str) -> Option<String> {
    let naive = NaiveDateTime::parse_from_str(time.trim(), UIGF_TIME_FORMAT).ok()?;
    Some(format!("{}{}", naive.format("%Y-%m-%dT%H:%M:%S"), offset))
}

/// [`uigf_to_iso`] 的逆操作：保留本地时间，去掉时区和小数秒
pub fn iso_to_uigf(iso: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return dt.naive_local().format(UIGF_TIME_FORMAT).to_string();
    }
    let replaced = iso.replace('T', " ");
    let without_offset = replaced.split('+').next().unwrap_or_default();
    without_offset
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}
