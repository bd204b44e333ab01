use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    Result,
    runtime::Context,
    workflow::{
        actions::{Action, ActionOutput, ActionType},
        node::NodeId,
        template,
    },
};

use super::models::ComparisonOperator;

/// Compares two resolved values and selects the `true` or `false` branch.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConditionAction {
    #[serde(default)]
    left_value: Value,
    #[serde(default)]
    operator: ComparisonOperator,
    #[serde(default)]
    right_value: Value,
}

impl ConditionAction {
    fn operand(
        ctx: &Context,
        value: &Value,
    ) -> String {
        match value {
            Value::String(s) => ctx.resolve(s),
            Value::Null => String::new(),
            v => template::value_to_string(v),
        }
    }
}

#[async_trait]
#[typetag::serde]
impl Action for ConditionAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "leftValue": {
                    "type": ["string", "number", "boolean", "null"]
                },
                "operator": {
                    "type": "string",
                    "enum": ["==", "!=", ">", "<", "contains"]
                },
                "rightValue": {
                    "type": ["string", "number", "boolean", "null"]
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Condition
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        nid: NodeId,
    ) -> Result<ActionOutput> {
        let left = Self::operand(&ctx, &self.left_value);
        let right = Self::operand(&ctx, &self.right_value);
        let result = self.operator.evaluate(&left, &right);
        debug!(node = %nid, left = %left, right = %right, operator = self.operator.as_ref(), result, "condition evaluated");

        Ok(ActionOutput::branch(
            json!({
                "result": result,
                "left": left,
                "right": right,
                "operator": self.operator.as_ref(),
            }),
            result,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{llm::mock::ScriptedLlm, workflow::actions::tests::run_action, workflow::edge::FixedHandle};

    fn llm() -> Arc<ScriptedLlm> {
        Arc::new(ScriptedLlm::new(Vec::<String>::new()))
    }

    #[tokio::test]
    async fn test_numeric_condition() {
        let action = ConditionAction::create(json!({"leftValue": "{{trigger.score}}", "operator": ">", "rightValue": 70})).unwrap();
        let out = run_action(&action, llm(), Some(json!({"score": 85}))).await.unwrap();

        assert_eq!(out.outputs, json!({"result": true, "left": "85", "right": "70", "operator": ">"}));
        assert_eq!(out.branch, Some(FixedHandle::True));
    }

    #[tokio::test]
    async fn test_default_operator_is_equality() {
        let action = ConditionAction::create(json!({"leftValue": "{{trigger.kind}}", "rightValue": "bug"})).unwrap();
        let out = run_action(&action, llm(), Some(json!({"kind": "feature"}))).await.unwrap();
        assert_eq!(out.outputs["operator"], "==");
        assert_eq!(out.branch, Some(FixedHandle::False));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        assert!(ConditionAction::create(json!({"leftValue": "a", "operator": ">=", "rightValue": "b"})).is_err());
    }
}
