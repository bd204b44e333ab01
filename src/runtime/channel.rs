use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, RwLock},
};

use tracing::warn;

use crate::{
    AgentflowError, Result, ShareLock,
    events::{AgentEvent, Event, GraphEvent, Log, Message},
    runtime::ExecutionId,
};

macro_rules! dispatch_event {
    ($handles:expr, $item:expr) => {
        let handlers = $handles.read().unwrap_or_else(|e| e.into_inner()).clone();
        for handle in handlers.iter() {
            if catch_unwind(AssertUnwindSafe(|| (handle)($item))).is_err() {
                warn!("event handler panicked, ignoring");
            }
        }
    };
}

pub type WorkflowEventHandle = Arc<dyn Fn(&Event<Message>) + Send + Sync>;
pub type WorkflowLogHandle = Arc<dyn Fn(&Event<Log>) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// use the glob pattern to match the execution id
    /// eg. eid1*
    pub eid: String,

    /// use the glob pattern to match the node id
    /// eg. nid1*
    pub nid: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            eid: "*".to_string(),
            nid: "*".to_string(),
        }
    }
}

#[allow(unused)]
impl ChannelOptions {
    pub fn new(
        eid: String,
        nid: String,
    ) -> Self {
        Self {
            eid,
            nid,
        }
    }

    pub fn with_eid(eid: String) -> Self {
        Self {
            eid,
            nid: "*".to_string(),
        }
    }

    pub fn with_nid(nid: String) -> Self {
        Self {
            eid: "*".to_string(),
            nid,
        }
    }
}

/// Fan-out of execution events and logs to registered handlers.
///
/// Handlers run synchronously on the emitting task. A panicking handler is
/// logged and skipped; it never affects the execution that emitted the event.
#[derive(Clone, Default)]
pub struct Channel {
    events: ShareLock<Vec<WorkflowEventHandle>>,
    logs: ShareLock<Vec<WorkflowLogHandle>>,
}

impl Channel {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            logs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub(crate) fn emit(
        &self,
        message: Message,
    ) {
        let event = Event::new(&message);
        dispatch_event!(self.events, &event);
    }

    pub(crate) fn emit_log(
        &self,
        log: Log,
    ) {
        let event = Event::new(&log);
        dispatch_event!(self.logs, &event);
    }

    fn push_event_handle(
        &self,
        handle: WorkflowEventHandle,
    ) {
        self.events.write().unwrap_or_else(|e| e.into_inner()).push(handle);
    }

    fn push_log_handle(
        &self,
        handle: WorkflowLogHandle,
    ) {
        self.logs.write().unwrap_or_else(|e| e.into_inner()).push(handle);
    }
}

#[derive(Clone)]
pub struct ChannelEvent {
    channel: Arc<Channel>,

    glob: (globset::GlobMatcher, globset::GlobMatcher),
}

#[allow(unused)]
impl ChannelEvent {
    pub fn channel(
        channel: Arc<Channel>,
        options: ChannelOptions,
    ) -> Result<Self> {
        let matcher = |pattern: &str| {
            globset::Glob::new(pattern)
                .map(|g| g.compile_matcher())
                .map_err(|e| AgentflowError::Engine(format!("invalid channel pattern '{}': {}", pattern, e)))
        };

        Ok(Self {
            glob: (matcher(&options.eid)?, matcher(&options.nid)?),
            channel,
        })
    }

    pub fn on_complete(
        &self,
        f: impl Fn(ExecutionId) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.push_event_handle(Arc::new(move |e| {
            if e.event.is_complete() && is_match(&glob, &e.eid, &e.nid) {
                f(e.eid.clone());
            }
        }));
    }

    pub fn on_error(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.push_event_handle(Arc::new(move |e| {
            if e.event.is_error() && is_match(&glob, &e.eid, &e.nid) {
                f(e);
            }
        }));
    }

    pub fn on_event(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.push_event_handle(Arc::new(move |e| {
            if is_match(&glob, &e.eid, &e.nid) {
                f(e);
            }
        }));
    }

    /// Tool-calling loop events only.
    pub fn on_agent(
        &self,
        f: impl Fn(&ExecutionId, &AgentEvent) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.push_event_handle(Arc::new(move |e| {
            if let GraphEvent::Agent(agent_event) = &e.event
                && is_match(&glob, &e.eid, &e.nid)
            {
                f(&e.eid, agent_event);
            }
        }));
    }

    pub fn on_log(
        &self,
        f: impl Fn(&Event<Log>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.push_log_handle(Arc::new(move |e| {
            if is_match(&glob, &e.eid, &e.nid) {
                f(e);
            }
        }));
    }
}

fn is_match(
    glob: &(globset::GlobMatcher, globset::GlobMatcher),
    eid: &str,
    nid: &str,
) -> bool {
    let (pat_eid, pat_nid) = glob;
    pat_eid.is_match(eid) && pat_nid.is_match(nid)
}
