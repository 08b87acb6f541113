use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Format error: {0}")]
    FormatError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Remote error: {0}")]
    RemoteError(String),

    #[error("Cache corrupt: {0}")]
    CacheCorrupt(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 远端是否要求降速（HTTP 429）
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::RateLimited(_))
    }
}
