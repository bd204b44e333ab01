use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    AgentflowError, Result,
    runtime::Context,
    workflow::{actions::ActionType, node::NodeId, template},
};

use super::{Action, ActionOutput};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransformOperation {
    Uppercase,
    Lowercase,
    Trim,
    JsonParse,
    Length,
}

impl TransformOperation {
    fn apply(
        &self,
        value: Value,
    ) -> Result<Value> {
        let text = || match &value {
            Value::String(s) => s.clone(),
            v => template::value_to_string(v),
        };
        match self {
            TransformOperation::Uppercase => Ok(Value::String(text().to_uppercase())),
            TransformOperation::Lowercase => Ok(Value::String(text().to_lowercase())),
            TransformOperation::Trim => Ok(Value::String(text().trim().to_string())),
            TransformOperation::JsonParse => match &value {
                Value::String(s) => serde_json::from_str(s).map_err(|e| AgentflowError::Action(format!("json_parse failed: {}", e))),
                _ => Ok(value.clone()),
            },
            TransformOperation::Length => {
                let len = match &value {
                    Value::Array(items) => items.len(),
                    Value::Object(map) => map.len(),
                    _ => text().chars().count(),
                };
                Ok(json!(len))
            }
        }
    }
}

/// Reshapes context data: resolves a string or JSON template and optionally
/// applies one operation to the result.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransformAction {
    template: Value,
    #[serde(default)]
    operation: Option<TransformOperation>,
}

#[async_trait]
#[typetag::serde]
impl Action for TransformAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["template"],
            "properties": {
                "template": {
                    "description": "String or JSON value, may reference {{variables}}"
                },
                "operation": {
                    "type": "string",
                    "enum": ["uppercase", "lowercase", "trim", "json_parse", "length"]
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Transform
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        _: NodeId,
    ) -> Result<ActionOutput> {
        let resolved = ctx.resolve_value(&self.template);
        let output = match &self.operation {
            Some(op) => op.apply(resolved)?,
            None => resolved,
        };
        Ok(ActionOutput::success(json!({ "output": output })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{llm::mock::ScriptedLlm, workflow::actions::tests::run_action};

    async fn transform(
        config: Value,
        trigger: Value,
    ) -> Result<Value> {
        let action = TransformAction::create(config)?;
        let out = run_action(&action, Arc::new(ScriptedLlm::new(Vec::<String>::new())), Some(trigger)).await?;
        Ok(out.outputs["output"].clone())
    }

    #[tokio::test]
    async fn test_string_template() {
        let out = transform(json!({"template": "  Hello {{trigger.name}}  ", "operation": "trim"}), json!({"name": "Bo"})).await.unwrap();
        assert_eq!(out, "Hello Bo");

        let out = transform(json!({"template": "{{trigger.name}}", "operation": "uppercase"}), json!({"name": "Bo"})).await.unwrap();
        assert_eq!(out, "BO");
    }

    #[tokio::test]
    async fn test_json_template() {
        let out = transform(json!({"template": {"greeting": "hi {{trigger.name}}", "tags": ["a", "b"]}}), json!({"name": "Bo"})).await.unwrap();
        assert_eq!(out, json!({"greeting": "hi Bo", "tags": ["a", "b"]}));

        let out = transform(json!({"template": {"a": 1, "b": 2}, "operation": "length"}), json!({})).await.unwrap();
        assert_eq!(out, json!(2));
    }

    #[tokio::test]
    async fn test_json_parse() {
        let out = transform(json!({"template": "{\"n\": {{trigger.n}}}", "operation": "json_parse"}), json!({"n": 7})).await.unwrap();
        assert_eq!(out, json!({"n": 7}));

        let err = transform(json!({"template": "not json", "operation": "json_parse"}), json!({})).await.unwrap_err();
        assert!(matches!(err, AgentflowError::Action(_)));
    }
}
