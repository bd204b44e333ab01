pub mod actions;
pub mod edge;
mod execution;
mod executor;
pub mod node;
pub mod template;
mod workflow;

pub use execution::{ExecutionStatus, NodeExecutionLog, WorkflowExecution};
pub use executor::WorkflowExecutor;
pub use workflow::Workflow;
