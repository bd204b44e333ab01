use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeModel {
    pub id: String,
    pub source: String,
    pub target: String,
    /// `true` / `false` on the outgoing edges of a condition node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
}
