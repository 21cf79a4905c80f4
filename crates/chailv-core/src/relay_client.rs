use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;

use crate::api::{ChatRequest, CHAT_PATH};
use crate::prompt::FALLBACK_TEXT;

/// Client for the relay endpoint
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask one policy question with both tables attached.
    ///
    /// A body that is not JSON is treated as absent. Non-success statuses
    /// become errors carrying the status code and the relay's `error` field.
    pub async fn chat(
        &self,
        user_message: &str,
        region_table: &str,
        standard_table: &str,
    ) -> Result<String> {
        let request = ChatRequest {
            user_message: Some(user_message.to_string()),
            region_table: Some(region_table.to_string()),
            standard_table: Some(standard_table.to_string()),
        };

        let url = format!("{}{}", self.base_url, CHAT_PATH);
        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        let bytes = response.bytes().await.unwrap_or_default();
        let data: Option<Value> = serde_json::from_slice(&bytes).ok();

        if !status.is_success() {
            let detail = data
                .as_ref()
                .and_then(|d| d.get("error"))
                .and_then(Value::as_str)
                .filter(|e| !e.is_empty())
                .map(|e| format!(": {}", e))
                .unwrap_or_default();
            return Err(anyhow!("Request failed ({}){}", status.as_u16(), detail));
        }

        let text = data
            .as_ref()
            .and_then(|d| d.get("text"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(FALLBACK_TEXT);
        tracing::debug!(chars = text.chars().count(), "relay answered");
        Ok(text.to_string())
    }
}
