use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    AgentflowError, Result,
    chains::{LlmChain, PromptTemplate},
    llm::{self, LlmClient},
};

/// A named route with the prompt run when it is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// prompt template; `{input}` is the routed input
    #[serde(default = "default_destination_template")]
    pub template: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_destination_template() -> String {
    "{input}".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterOutput {
    /// chosen destination; `None` when the input was answered directly
    pub destination: Option<String>,
    pub text: String,
    pub prompt: String,
}

/// Lets the model pick a destination for an input, then runs it.
#[derive(Debug, Clone)]
pub struct RouterChain {
    destinations: Vec<Destination>,
    default_destination: Option<String>,
}

impl RouterChain {
    pub fn new(
        destinations: Vec<Destination>,
        default_destination: Option<String>,
    ) -> Result<Self> {
        if let Some(default) = &default_destination
            && !destinations.iter().any(|d| &d.name == default)
        {
            return Err(AgentflowError::Chain(format!("default destination '{}' is not a destination", default)));
        }
        Ok(Self {
            destinations,
            default_destination,
        })
    }

    fn routing_prompt(
        &self,
        input: &str,
    ) -> String {
        let mut prompt = String::from("Choose the most suitable destination for the input below.\n\nDestinations:\n");
        for d in &self.destinations {
            prompt.push_str(&format!("- {}: {}\n", d.name, d.description));
        }
        prompt.push_str(&format!("\nInput: {}\n\nRespond with the destination name only.", input));
        prompt
    }

    fn find(
        &self,
        reply: &str,
    ) -> Option<&Destination> {
        let choice = reply.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.').trim();
        self.destinations.iter().find(|d| d.name.eq_ignore_ascii_case(choice))
    }

    pub async fn run(
        &self,
        llm: &dyn LlmClient,
        input: &str,
        values: &Map<String, Value>,
    ) -> Result<RouterOutput> {
        let reply = llm::complete(llm, None, &self.routing_prompt(input), Some(0.0)).await?;
        debug!(reply = %reply, "router reply");

        let destination = match self.find(&reply) {
            Some(d) => Some(d),
            None => self.default_destination.as_ref().and_then(|name| self.destinations.iter().find(|d| &d.name == name)),
        };

        let Some(destination) = destination else {
            info!(reply = %reply, "no destination matched, answering directly");
            let text = llm::complete(llm, None, input, None).await?;
            return Ok(RouterOutput {
                destination: None,
                text,
                prompt: input.to_string(),
            });
        };

        let mut chain = LlmChain::new(PromptTemplate::parse(destination.template.as_str())?);
        if let Some(system) = &destination.system_prompt {
            chain = chain.with_system_prompt(system.clone());
        }
        let mut values = values.clone();
        values.insert("input".to_string(), Value::String(input.to_string()));

        let out = chain.run(llm, &values).await?;
        Ok(RouterOutput {
            destination: Some(destination.name.clone()),
            text: out.text,
            prompt: out.prompt,
        })
    }
}
