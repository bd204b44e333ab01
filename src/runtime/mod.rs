mod channel;
mod context;
mod services;

pub use channel::{Channel, ChannelEvent, ChannelOptions};
pub use context::Context;
pub use services::Services;

#[cfg(test)]
pub(crate) use context::tests::context_with;

/// execution id
pub type ExecutionId = String;
