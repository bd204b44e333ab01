use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::{AgentflowError, Result, tools::Tool, utils};

const MAX_BODY_CHARS: usize = 4000;
const TIMEOUT_SECS: u64 = 15;

/// Fetches a URL over HTTP GET and returns its (truncated) body.
pub struct HttpGetTool {
    http: Client,
}

impl HttpGetTool {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for HttpGetTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for HttpGetTool {
    fn name(&self) -> &str {
        "http_get"
    }

    fn description(&self) -> &str {
        "Fetch the content of a web page or JSON API with an HTTP GET request."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["url"],
            "properties": {
                "url": { "type": "string", "description": "http or https URL" }
            }
        })
    }

    async fn execute(
        &self,
        input: Value,
    ) -> Result<Value> {
        let url = input.get("url").and_then(Value::as_str).ok_or_else(|| AgentflowError::Tool("http_get requires a 'url' string".to_string()))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AgentflowError::Tool(format!("unsupported url '{}'", url)));
        }

        let response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| AgentflowError::Tool(format!("request failed: {}", e)))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| AgentflowError::Tool(format!("failed to read body: {}", e)))?;

        Ok(json!({
            "status": status,
            "body": utils::truncate(&body, MAX_BODY_CHARS),
        }))
    }

    fn timeout_secs(&self) -> u64 {
        TIMEOUT_SECS + 5
    }
}
