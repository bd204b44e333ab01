mod execution;
mod workflow;

pub use workflow::Workflow;
