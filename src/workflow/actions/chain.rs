//! Nodes backed by the chain primitives.
//!
//! Chain templates use `{name}` placeholders. `{{path}}` tokens in templates
//! are resolved against the context before the template is parsed. The
//! `{name}` variables are the execution's top-level context entries overlaid
//! with the node's `variables`, whose values may reference `{{path}}` tokens.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{
    Result,
    chains::{ChainStep, Destination, LlmChain, PromptTemplate, RouterChain, SequentialChain},
    runtime::Context,
    workflow::{actions::ActionType, node::NodeId},
};

use super::{Action, ActionOutput};

fn chain_values(
    ctx: &Context,
    variables: &Map<String, Value>,
) -> Map<String, Value> {
    let mut values = ctx.vars();
    for (key, value) in variables {
        values.insert(key.clone(), ctx.resolve_value(value));
    }
    values
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LlmChainAction {
    template: String,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    variables: Map<String, Value>,
}

#[async_trait]
#[typetag::serde]
impl Action for LlmChainAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        PromptTemplate::parse(action.template.as_str())?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["template"],
            "properties": {
                "template": { "type": "string" },
                "systemPrompt": { "type": "string" },
                "temperature": { "type": "number" },
                "variables": { "type": "object" }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::LlmChain
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        _: NodeId,
    ) -> Result<ActionOutput> {
        let mut chain = LlmChain::new(PromptTemplate::parse(ctx.resolve_template(&self.template))?).with_temperature(self.temperature);
        if let Some(system) = &self.system_prompt {
            chain = chain.with_system_prompt(ctx.resolve(system));
        }

        let values = chain_values(&ctx, &self.variables);
        let llm = ctx.services().llm.clone();
        let out = chain.run(llm.as_ref(), &values).await?;
        Ok(ActionOutput::success(json!({
            "output": out.text,
            "prompt": out.prompt,
        })))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SequentialChainAction {
    steps: Vec<ChainStep>,
    #[serde(default)]
    variables: Map<String, Value>,
}

#[async_trait]
#[typetag::serde]
impl Action for SequentialChainAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        SequentialChain::new(action.steps.clone())?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["steps"],
            "properties": {
                "steps": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "required": ["template"],
                        "properties": {
                            "template": { "type": "string" },
                            "systemPrompt": { "type": "string" },
                            "outputKey": { "type": "string" }
                        }
                    }
                },
                "variables": { "type": "object" }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::SequentialChain
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        _: NodeId,
    ) -> Result<ActionOutput> {
        let steps = self
            .steps
            .iter()
            .map(|step| ChainStep {
                template: ctx.resolve_template(&step.template),
                ..step.clone()
            })
            .collect();
        let chain = SequentialChain::new(steps)?;
        let values = chain_values(&ctx, &self.variables);
        let llm = ctx.services().llm.clone();
        let out = chain.run(llm.as_ref(), &values).await?;
        Ok(ActionOutput::success(serde_json::to_value(out)?))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RouterChainAction {
    /// text to route, may reference `{{path}}` tokens
    input: String,
    destinations: Vec<Destination>,
    #[serde(default)]
    default_destination: Option<String>,
    #[serde(default)]
    variables: Map<String, Value>,
}

#[async_trait]
#[typetag::serde]
impl Action for RouterChainAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        RouterChain::new(action.destinations.clone(), action.default_destination.clone())?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["input", "destinations"],
            "properties": {
                "input": { "type": "string" },
                "destinations": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": { "type": "string" },
                            "description": { "type": "string" },
                            "template": { "type": "string" },
                            "systemPrompt": { "type": "string" }
                        }
                    }
                },
                "defaultDestination": { "type": "string" },
                "variables": { "type": "object" }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::RouterChain
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        _: NodeId,
    ) -> Result<ActionOutput> {
        let destinations = self
            .destinations
            .iter()
            .map(|d| Destination {
                template: ctx.resolve_template(&d.template),
                ..d.clone()
            })
            .collect();
        let router = RouterChain::new(destinations, self.default_destination.clone())?;
        let input = ctx.resolve(&self.input);
        let values = chain_values(&ctx, &self.variables);
        let llm = ctx.services().llm.clone();
        let out = router.run(llm.as_ref(), &input, &values).await?;
        Ok(ActionOutput::success(json!({
            "output": out.text,
            "destination": out.destination,
            "prompt": out.prompt,
        })))
    }
}
