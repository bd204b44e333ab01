mod action;

pub use action::AgentAction;
