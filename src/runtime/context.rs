use std::sync::{Arc, RwLock};

use serde_json::{Map, Value, json};

use crate::{
    ShareLock,
    events::{GraphEvent, Log, Message},
    runtime::{Channel, ExecutionId, Services},
    utils,
    workflow::{node::NodeId, template},
};

/// Variables and collaborators of one execution.
///
/// The variable map starts as `{"trigger": <trigger data>}` and gains one entry
/// per executed node, keyed by node id and by slugified label.
#[derive(Clone)]
pub struct Context {
    eid: ExecutionId,
    trigger: Option<Value>,
    vars: ShareLock<Value>,
    services: Arc<Services>,
    channel: Arc<Channel>,
}

impl Context {
    pub fn new(
        eid: ExecutionId,
        trigger: Option<Value>,
        services: Arc<Services>,
        channel: Arc<Channel>,
    ) -> Self {
        let seed = json!({ "trigger": trigger.clone().unwrap_or(Value::Null) });
        Self {
            eid,
            trigger,
            vars: Arc::new(RwLock::new(seed)),
            services,
            channel,
        }
    }

    pub fn eid(&self) -> ExecutionId {
        self.eid.to_owned()
    }

    /// Trigger data supplied with the execution, if any.
    pub fn trigger(&self) -> Option<&Value> {
        self.trigger.as_ref().filter(|v| !v.is_null())
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<Value> {
        self.vars.read().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
    }

    pub fn set(
        &self,
        key: impl Into<String>,
        value: Value,
    ) {
        let mut vars = self.vars.write().unwrap_or_else(|e| e.into_inner());
        if let Value::Object(map) = &mut *vars {
            map.insert(key.into(), value);
        }
    }

    /// Store a node's output under its id and, when it differs, its slugified label.
    pub fn add_output(
        &self,
        nid: &str,
        label: &str,
        output: Value,
    ) {
        let slug = utils::slugify(label);
        if !slug.is_empty() && slug != nid {
            self.set(slug, output.clone());
        }
        self.set(nid, output);
    }

    /// Snapshot of all variables.
    pub fn vars(&self) -> Map<String, Value> {
        match &*self.vars.read().unwrap_or_else(|e| e.into_inner()) {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Resolve `{{path}}` tokens against the current variables.
    pub fn resolve(
        &self,
        text: &str,
    ) -> String {
        template::resolve(text, &self.vars.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Resolve `{{path}}` tokens in a chain template, leaving its `{name}`
    /// placeholders and escaped braces intact.
    pub fn resolve_template(
        &self,
        text: &str,
    ) -> String {
        template::resolve_escaped(text, &self.vars.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Resolve `{{path}}` tokens in every string of a JSON value.
    pub fn resolve_value(
        &self,
        value: &Value,
    ) -> Value {
        template::resolve_in_value(value, &self.vars.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    pub fn emit(
        &self,
        nid: NodeId,
        event: GraphEvent,
    ) {
        self.channel.emit(Message {
            eid: self.eid.clone(),
            nid,
            event,
        });
    }

    pub fn emit_log(
        &self,
        nid: NodeId,
        content: String,
    ) {
        self.channel.emit_log(Log {
            eid: self.eid.clone(),
            nid,
            content,
            timestamp: chrono::Utc::now().timestamp_millis(),
        });
    }
}
