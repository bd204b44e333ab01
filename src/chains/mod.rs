//! Chain primitives: format a prompt, call the model, return text.

mod llm_chain;
mod router;
mod sequential;
mod template;

pub use llm_chain::LlmChain;
pub use router::{Destination, RouterChain, RouterOutput};
pub use sequential::{ChainStep, SequentialChain, SequentialOutput, StepOutput};
pub use template::PromptTemplate;

use serde::{Deserialize, Serialize};

/// Result of an [`LlmChain`] run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainOutput {
    pub text: String,
    /// the formatted prompt sent to the model
    pub prompt: String,
}
