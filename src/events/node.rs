/// Progress of a single node. Timestamps are milliseconds since the epoch.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    Running(i64),
    /// reached again on a branch that already ran it
    Skipped,
    Succeeded(i64),
    Error(String),
}

impl NodeEvent {
    pub fn str(&self) -> &str {
        match self {
            NodeEvent::Running(_) => "Running",
            NodeEvent::Skipped => "Skipped",
            NodeEvent::Succeeded(_) => "Succeeded",
            NodeEvent::Error(_) => "Error",
        }
    }
}
