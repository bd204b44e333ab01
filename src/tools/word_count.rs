use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{AgentflowError, Result, tools::Tool};

/// Counts words, characters and lines of a text.
pub struct WordCountTool;

#[async_trait]
impl Tool for WordCountTool {
    fn name(&self) -> &str {
        "word_count"
    }

    fn description(&self) -> &str {
        "Count the words, characters and lines in a piece of text."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["text"],
            "properties": {
                "text": { "type": "string" }
            }
        })
    }

    async fn execute(
        &self,
        input: Value,
    ) -> Result<Value> {
        let text = input.get("text").and_then(Value::as_str).ok_or_else(|| AgentflowError::Tool("word_count requires a 'text' string".to_string()))?;

        Ok(json!({
            "words": text.split_whitespace().count(),
            "characters": text.chars().count(),
            "lines": text.lines().count(),
        }))
    }
}
