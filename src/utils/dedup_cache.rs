use crate::error::{AppError, AppResult};
use crate::utils::uigf_parser::strip_bom;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 本地记录已写入抽卡记录数据库的 id
#[derive(Debug, Clone)]
pub struct DedupCache {
    path: PathBuf,
}

impl DedupCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 缓存缺失或损坏时返回空集合，由调用方重新扫描
    pub fn load(&self) -> HashSet<String> {
        match self.try_load() {
            Ok(ids) => ids,
            Err(e) => {
                log::warn!("Ignoring dedup cache {}: {}", self.path.display(), e);
                HashSet::new()
            }
        }
    }

    fn try_load(&self) -> AppResult<HashSet<String>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(AppError::CacheCorrupt(e.to_string())),
        };
        let ids: Vec<String> = serde_json::from_slice(strip_bom(&bytes))
            .map_err(|e| AppError::CacheCorrupt(e.to_string()))?;
        Ok(ids.into_iter().collect())
    }

    pub fn save(&self, ids: &HashSet<String>) -> AppResult<()> {
        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();
        // 与旧版工具保持一致：带 BOM 写出
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend(serde_json::to_vec(&sorted)?);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        log::debug!("Saved {} ids to {}", ids.len(), self.path.display());
        Ok(())
    }
}
