use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    Result,
    chains::{ChainOutput, PromptTemplate},
    llm::{self, LlmClient},
};

/// A prompt template bound to an optional system prompt.
#[derive(Debug, Clone)]
pub struct LlmChain {
    prompt: PromptTemplate,
    system_prompt: Option<String>,
    temperature: Option<f32>,
}

impl LlmChain {
    pub fn new(prompt: PromptTemplate) -> Self {
        Self {
            prompt,
            system_prompt: None,
            temperature: None,
        }
    }

    pub fn with_system_prompt(
        mut self,
        system_prompt: impl Into<String>,
    ) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(
        mut self,
        temperature: Option<f32>,
    ) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub async fn run(
        &self,
        llm: &dyn LlmClient,
        values: &Map<String, Value>,
    ) -> Result<ChainOutput> {
        let prompt = self.prompt.format(values)?;
        debug!(prompt = %prompt, "llm chain prompt");

        let text = llm::complete(llm, self.system_prompt.as_deref(), &prompt, self.temperature).await?;
        Ok(ChainOutput {
            text,
            prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::mock::{ScriptedLlm, system_text};

    #[tokio::test]
    async fn test_llm_chain() {
        let llm = ScriptedLlm::new(["Purr."]);
        let chain = LlmChain::new(PromptTemplate::parse("One word about {animal}").unwrap()).with_system_prompt("Be terse.");

        let out = chain.run(&llm, json!({"animal": "cats"}).as_object().unwrap()).await.unwrap();

        assert_eq!(out.text, "Purr.");
        assert_eq!(out.prompt, "One word about cats");
        assert_eq!(system_text(&llm.requests()[0]), "Be terse.");
    }

    #[tokio::test]
    async fn test_llm_chain_missing_variable_skips_model() {
        let llm = ScriptedLlm::new(["unused"]);
        let chain = LlmChain::new(PromptTemplate::parse("About {animal}").unwrap());

        assert!(chain.run(&llm, &Map::new()).await.is_err());
        assert_eq!(llm.calls(), 0);
    }
}
