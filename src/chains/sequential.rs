use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    AgentflowError, Result,
    chains::{LlmChain, PromptTemplate},
    llm::LlmClient,
};

/// One step of a [`SequentialChain`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStep {
    pub template: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// variable name the step's output is stored under, `step_<n>` by default
    #[serde(default)]
    pub output_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    pub key: String,
    pub prompt: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialOutput {
    /// output of the last step
    pub output: String,
    pub steps: Vec<StepOutput>,
}

/// Steps run in order. Each step sees the initial variables, every earlier
/// step's output under its key, and the previous step's output as `previous`.
#[derive(Debug, Clone)]
pub struct SequentialChain {
    steps: Vec<(String, LlmChain)>,
}

impl SequentialChain {
    pub fn new(steps: Vec<ChainStep>) -> Result<Self> {
        if steps.is_empty() {
            return Err(AgentflowError::Chain("sequential chain needs at least one step".to_string()));
        }

        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(i, step)| {
                let key = step.output_key.filter(|k| !k.trim().is_empty()).unwrap_or_else(|| format!("step_{}", i + 1));
                let mut chain = LlmChain::new(PromptTemplate::parse(step.template)?);
                if let Some(system) = step.system_prompt {
                    chain = chain.with_system_prompt(system);
                }
                Ok((key, chain))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            steps,
        })
    }

    pub async fn run(
        &self,
        llm: &dyn LlmClient,
        values: &Map<String, Value>,
    ) -> Result<SequentialOutput> {
        let mut values = values.clone();
        let mut outputs = Vec::with_capacity(self.steps.len());

        for (key, chain) in &self.steps {
            let out = chain.run(llm, &values).await?;
            values.insert(key.clone(), Value::String(out.text.clone()));
            values.insert("previous".to_string(), Value::String(out.text.clone()));
            outputs.push(StepOutput {
                key: key.clone(),
                prompt: out.prompt,
                text: out.text,
            });
        }

        Ok(SequentialOutput {
            output: outputs.last().map(|o| o.text.clone()).unwrap_or_default(),
            steps: outputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::mock::{ScriptedLlm, last_user_text};

    fn step(
        template: &str,
        key: Option<&str>,
    ) -> ChainStep {
        ChainStep {
            template: template.to_string(),
            system_prompt: None,
            output_key: key.map(|k| k.to_string()),
        }
    }

    #[tokio::test]
    async fn test_steps_see_earlier_outputs() {
        let llm = ScriptedLlm::new(["An outline", "A draft", "A title"]);
        let chain = SequentialChain::new(vec![
            step("Outline an essay on {topic}", Some("outline")),
            step("Draft from: {outline}", None),
            step("Title for {previous} (outline: {outline}, draft: {step_2})", None),
        ])
        .unwrap();

        let out = chain.run(&llm, json!({"topic": "rivers"}).as_object().unwrap()).await.unwrap();

        assert_eq!(out.output, "A title");
        assert_eq!(out.steps.iter().map(|s| s.key.as_str()).collect::<Vec<_>>(), vec!["outline", "step_2", "step_3"]);
        let requests = llm.requests();
        assert_eq!(last_user_text(&requests[1]), "Draft from: An outline");
        assert_eq!(last_user_text(&requests[2]), "Title for A draft (outline: An outline, draft: A draft)");
    }

    #[tokio::test]
    async fn test_missing_variable_aborts() {
        let llm = ScriptedLlm::new(["one"]);
        let chain = SequentialChain::new(vec![step("{topic}", None), step("{nope}", None)]).unwrap();
        let err = chain.run(&llm, json!({"topic": "x"}).as_object().unwrap()).await.unwrap_err();
        assert!(matches!(err, AgentflowError::Chain(_)));
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(SequentialChain::new(vec![]).is_err());
    }
}
