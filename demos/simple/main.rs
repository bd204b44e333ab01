use agentflow::{ChannelEvent, ChannelOptions, Config, EngineBuilder, WorkflowModel, logging};
use serde_json::json;

#[tokio::main]
async fn main() -> agentflow::Result<()> {
    let config = Config::from_env()?;
    logging::init_tracing(&config.log)?;

    let engine = EngineBuilder::new().config(config).build()?;

    let text = include_str!("./workflow.json");
    let workflow_model = WorkflowModel::from_json(text)?;
    engine.deploy(&workflow_model)?;

    let events = ChannelEvent::channel(engine.channel(), ChannelOptions::default())?;
    events.on_event(|e| {
        println!("[{}] {}", e.nid, e.event.name());
    });
    events.on_log(|e| {
        println!("[{}] log: {}", e.nid, e.content);
    });
    events.on_complete(|eid| {
        println!("Workflow completed, eid: {}", eid);
    });

    let execution = engine.execute(&workflow_model.id, Some(json!({"topic": "owls", "words": 120}))).await?;
    println!("Status: {:?}", execution.status);
    println!("Outputs: {:#}", serde_json::Value::Object(execution.context));

    Ok(())
}
