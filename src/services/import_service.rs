use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::pull::ImportEnvelope;
use crate::services::duplicate_service::{DuplicateService, ValidationReport};
use crate::services::sync_client::SyncClient;
use crate::utils::dedup_cache::DedupCache;
use crate::utils::pity::calculate_pity;
use crate::utils::time::format_utc_offset;
use crate::utils::uigf_parser::parse_file;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub uid: String,
    pub game_name: String,
    pub version: String,
    pub total: usize,
    pub written: usize,
    /// 去重缓存中已存在而跳过的条数
    pub skipped: usize,
    pub failed: usize,
    /// 达到写入上限后剩余未写入的新记录数
    pub remaining: usize,
    pub limit_reached: bool,
    pub validation: Option<ValidationReport>,
}

/// UIGF 文件 -> 保底计算 -> 去重 -> 抽卡记录数据库
#[derive(Clone)]
pub struct ImportService {
    client: SyncClient,
    cache: DedupCache,
    max_import_limit: usize,
    cache_flush_every: usize,
}

impl ImportService {
    pub fn new(client: SyncClient, config: &Config) -> Self {
        Self {
            client,
            cache: DedupCache::new(&config.import.cache_file),
            max_import_limit: config.import.max_import_limit,
            cache_flush_every: config.import.cache_flush_every.max(1),
        }
    }

    pub async fn import_file(
        &self,
        path: impl AsRef<Path>,
        skip_validation: bool,
    ) -> AppResult<ImportReport> {
        let envelope = parse_file(path)?;
        self.import(envelope, skip_validation).await
    }

    pub async fn import(
        &self,
        envelope: ImportEnvelope,
        skip_validation: bool,
    ) -> AppResult<ImportReport> {
        let ImportEnvelope {
            uid,
            mut records,
            raw_version,
            game_name,
            timezone,
            ..
        } = envelope;
        log::info!("Detected {} / {} (UID: {})", raw_version, game_name, uid);
        // 文件声明了时区就用文件的，否则用配置
        let utc_offset = timezone.map(format_utc_offset);

        let master = self.client.master_mapping().await;
        let user_page_id = self.client.get_or_create_user_page(&uid, &game_name).await?;

        let mut existing = self.load_existing_ids().await?;

        log::info!("Calculating pity counts");
        calculate_pity(&mut records);

        let mut report = ImportReport {
            uid,
            game_name,
            version: raw_version,
            total: records.len(),
            ..ImportReport::default()
        };
        log::info!("Starting import (limit: {} records)", self.max_import_limit);

        for (index, record) in records.iter().enumerate() {
            if existing.contains(&record.id) {
                report.skipped += 1;
                continue;
            }
            if report.written >= self.max_import_limit {
                report.limit_reached = true;
                report.remaining = records[index..]
                    .iter()
                    .filter(|r| !existing.contains(&r.id))
                    .count();
                log::warn!(
                    "Import limit of {} reached; {} new records left for the next run",
                    self.max_import_limit,
                    report.remaining
                );
                break;
            }

            let master_page_id = master.resolve(record.item_id.as_deref(), &record.name);
            match self
                .client
                .add_pull_record(
                    record,
                    &user_page_id,
                    master_page_id,
                    utc_offset.as_deref(),
                )
                .await
            {
                Ok(_) => {
                    report.written += 1;
                    log::info!(
                        "[{}/{}] Added {} (pity: {})",
                        index + 1,
                        report.total,
                        record.name,
                        record.pity_count.unwrap_or_default()
                    );
                    existing.insert(record.id.clone());
                    if report.written % self.cache_flush_every == 0 {
                        self.persist(&existing);
                    }
                    self.client.pause().await;
                }
                Err(e) => {
                    log::error!("Failed to add record (ID: {}): {}", record.id, e);
                    report.failed += 1;
                }
            }
        }

        self.persist(&existing);
        log::info!(
            "Import complete: {} written, {} skipped, {} failed",
            report.written,
            report.skipped,
            report.failed
        );

        if !skip_validation {
            let validator = DuplicateService::new(self.client.clone());
            report.validation = Some(validator.validate().await);
        }

        Ok(report)
    }

    /// 读取去重缓存，缓存为空时全量扫描远端
    ///
    /// 扫描中断时返回错误，不写入也不缓存部分结果
    async fn load_existing_ids(&self) -> AppResult<HashSet<String>> {
        let cached = self.cache.load();
        if !cached.is_empty() {
            log::info!("Loaded {} ids from dedup cache", cached.len());
            return Ok(cached);
        }

        let scanned = self.client.fetch_existing_item_ids().await;
        if !scanned.complete {
            // 缓存保持为空，下次运行会重新全量扫描
            log::error!(
                "Remote scan stopped after {} ids; aborting import without writing",
                scanned.ids.len()
            );
            return Err(AppError::RemoteError(format!(
                "gacha log scan incomplete ({} ids read)",
                scanned.ids.len()
            )));
        }
        self.persist(&scanned.ids);
        Ok(scanned.ids)
    }

    fn persist(&self, ids: &HashSet<String>) {
        if let Err(e) = self.cache.save(ids) {
            log::error!("Failed to save dedup cache {}: {}", self.cache.path().display(), e);
        }
    }
}
