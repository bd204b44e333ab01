mod action;
mod models;

pub use action::ConditionAction;
pub use models::ComparisonOperator;
