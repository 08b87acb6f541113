use crate::models::pull::PullRecord;
use std::collections::HashMap;

/// 按时间顺序排序并计算每条记录的保底计数
///
/// 所有 id 都是整数时按 id 排序，否则按 `time` 排序。每个卡池单独计数，出 5 星后清零
pub fn calculate_pity(records: &mut [PullRecord]) {
    let all_numeric = records.iter().all(|r| r.id.parse::<u128>().is_ok());
    if all_numeric {
        records.sort_by_cached_key(|r| r.id.parse::<u128>().unwrap_or_default());
    } else {
        records.sort_by(|a, b| {
            a.time
                .as_deref()
                .unwrap_or_default()
                .cmp(b.time.as_deref().unwrap_or_default())
        });
    }

    let mut counters: HashMap<String, u32> = HashMap::new();
    for record in records.iter_mut() {
        let counter = counters.entry(record.banner_key().to_string()).or_insert(0);
        *counter += 1;
        record.pity_count = Some(*counter);
        if record.is_top_rank() {
            *counter = 0;
        }
    }
}
