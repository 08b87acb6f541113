use crate::config::NotionConfig;
use crate::error::{AppError, AppResult};
use crate::external::store::RecordStore;
use crate::models::page::{Page, QueryPage};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};

#[derive(Debug, Deserialize)]
struct NotionErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Notion REST API 客户端
#[derive(Clone)]
pub struct NotionApi {
    client: Client,
    config: NotionConfig,
}

impl NotionApi {
    pub fn new(config: NotionConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("uigf-notion-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> AppResult<Value> {
        let response = request
            .bearer_auth(&self.config.token)
            .header("Notion-Version", &self.config.version)
            .send()
            .await
            .map_err(|e| AppError::RemoteError(format!("{operation}: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimited(format!("{operation}: HTTP 429")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<NotionErrorBody>(&text)
                .ok()
                .and_then(|b| match (b.code, b.message) {
                    (Some(code), Some(message)) => Some(format!("{code}: {message}")),
                    (None, Some(message)) => Some(message),
                    (Some(code), None) => Some(code),
                    (None, None) => None,
                })
                .unwrap_or(text);
            return Err(AppError::RemoteError(format!(
                "{operation}: HTTP {}: {detail}",
                status.as_u16()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::RemoteError(format!("{operation}: invalid response body: {e}")))
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, operation: &str) -> AppResult<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::RemoteError(format!("{operation}: unexpected response shape: {e}")))
}

#[async_trait]
impl RecordStore for NotionApi {
    async fn query(
        &self,
        database_id: &str,
        filter: Option<&Value>,
        start_cursor: Option<&str>,
        page_size: Option<u32>,
    ) -> AppResult<QueryPage> {
        let mut body = json!({});
        if let Some(size) = page_size {
            body["page_size"] = json!(size);
        }
        if let Some(cursor) = start_cursor {
            body["start_cursor"] = json!(cursor);
        }
        if let Some(filter) = filter {
            body["filter"] = filter.clone();
        }

        let request = self
            .client
            .post(self.url(&format!("databases/{database_id}/query")))
            .json(&body);
        let value = self.send(request, "query database").await?;
        decode(value, "query database")
    }

    async fn create(&self, database_id: &str, properties: Map<String, Value>) -> AppResult<Page> {
        let body = json!({
            "parent": {"database_id": database_id},
            "properties": properties,
        });
        let request = self.client.post(self.url("pages")).json(&body);
        let value = self.send(request, "create page").await?;
        decode(value, "create page")
    }

    async fn update(&self, page_id: &str, properties: Map<String, Value>) -> AppResult<Page> {
        let body = json!({"properties": properties});
        let request = self
            .client
            .patch(self.url(&format!("pages/{page_id}")))
            .json(&body);
        let value = self.send(request, "update page").await?;
        decode(value, "update page")
    }
}
