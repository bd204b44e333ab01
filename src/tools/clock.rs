use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::{Result, tools::Tool};

/// Reports the current UTC time.
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in UTC."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        _input: Value,
    ) -> Result<Value> {
        let now = Utc::now();
        Ok(json!({
            "iso": now.to_rfc3339_opts(SecondsFormat::Secs, true),
            "timestamp": now.timestamp(),
            "date": now.format("%Y-%m-%d").to_string(),
            "time": now.format("%H:%M:%S").to_string(),
        }))
    }
}
