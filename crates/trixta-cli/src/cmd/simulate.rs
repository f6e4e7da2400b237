use crate::output::{print_json, print_table};
use crate::scenario::{Scenario, Step};
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;
use trixta_core::config::EngineConfig;
use trixta_core::event::EngineEvent;
use trixta_core::state::TrixtaState;
use trixta_core::status::OperationStatus;
use trixta_engine::{event_channel, intake, ChannelCall, LoopbackChannels, Supervisor};

const LISTENER_WAIT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
struct Report {
    events: Vec<EngineEvent>,
    calls: Vec<ChannelCall>,
    state: TrixtaState,
}

pub fn run(scenario: &Path, config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let scenario = Scenario::load(scenario)?;
    let config = EngineConfig::load_or_default(config).context("failed to load config")?;

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(simulate(scenario, config))?;

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Engine run
// ---------------------------------------------------------------------------

async fn simulate(scenario: Scenario, config: EngineConfig) -> anyhow::Result<Report> {
    let naming = config.naming();
    let (handle, intake) = intake();
    let channels = Arc::new(LoopbackChannels::new(handle.clone()));
    for (role, contract) in &scenario.contracts {
        channels.set_join_response(naming.topic(role), contract.clone());
    }
    for (role, reason) in &scenario.join_failures {
        channels.fail_join(naming.topic(role), reason.clone());
    }
    for reply in &scenario.replies {
        channels.set_reply(naming.topic(&reply.role), reply.event.as_str(), reply.outcome());
    }

    let (sink, mut events) = event_channel();
    let mut state = TrixtaState::new(config.instances.clone());
    let engine = Supervisor::start_with(handle.clone(), intake, config, channels.clone(), sink);

    if !scenario.roles.is_empty() {
        handle.declare_roles(scenario.roles)?;
    }
    for (i, step) in scenario.steps.into_iter().enumerate() {
        let n = i + 1;
        debug!(index = n, ?step, "running scenario step");
        match step {
            Step::DeclareRole(role) => handle.declare_role(role)?,
            Step::SubmitAction(submission) => handle.submit_action(submission)?,
            Step::EmitReaction {
                role,
                reaction,
                payload,
            } => {
                let topic = naming.topic(&role);
                wait_for_listener(&channels, &topic, &reaction)
                    .await
                    .with_context(|| format!("step {n}: cannot emit '{reaction}'"))?;
                channels.emit(&topic, &reaction, payload);
            }
            Step::Respond(reply) => handle.respond_to_reaction(reply)?,
            Step::WaitMs(ms) => sleep(Duration::from_millis(ms)).await,
        }
    }

    sleep(Duration::from_millis(scenario.settle_ms)).await;
    engine.shutdown();

    let mut log = Vec::new();
    while let Some(event) = events.try_next() {
        state.apply(&event);
        log.push(event);
    }
    Ok(Report {
        events: log,
        calls: channels.calls(),
        state,
    })
}

async fn wait_for_listener(
    channels: &LoopbackChannels,
    topic: &str,
    reaction: &str,
) -> anyhow::Result<()> {
    timeout(LISTENER_WAIT, async {
        while !channels.listeners(topic).contains(reaction) {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("nothing listens for '{reaction}' on '{topic}'"))
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

fn print_report(report: &Report) {
    let rows = report
        .events
        .iter()
        .enumerate()
        .map(|(i, event)| vec![(i + 1).to_string(), event.kind().to_string(), describe(event)])
        .collect();
    print_table(&["#", "EVENT", "DETAIL"], rows);

    let state = &report.state;
    let roles: Vec<&str> = state.roles.iter().map(|r| r.name.as_str()).collect();
    println!();
    println!(
        "roles: {}  actions: {}  reactions: {}  channel calls: {}",
        if roles.is_empty() {
            "-".to_string()
        } else {
            roles.join(", ")
        },
        state.actions.len(),
        state.reactions.len(),
        report.calls.len()
    );

    if !state.statuses.is_empty() {
        println!();
        let rows = state
            .statuses
            .iter()
            .map(|(key, status)| vec![key.to_string(), status_label(status)])
            .collect();
        print_table(&["KEY", "STATUS"], rows);
    }
    if let Some(error) = &state.error {
        println!();
        println!("last engine error: {error}");
    }
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::RoleDeclared { role } => role.name.clone(),
        EngineEvent::ActionDeclared { role, name, .. }
        | EngineEvent::ReactionDeclared { role, name, .. } => format!("{role}:{name}"),
        EngineEvent::ActionResponseUpdated {
            role,
            action,
            response,
        } => format!("{role}:{action} {response}"),
        EngineEvent::ReactionInstanceUpdated {
            role,
            reaction,
            instance,
        } => format!(
            "{role}:{reaction} ref={}",
            instance.reference.as_deref().unwrap_or("-")
        ),
        EngineEvent::StatusUpdated { key, status } => format!("{key} {}", status_label(status)),
        EngineEvent::Custom {
            event_type,
            data,
            error,
        } => match (data, error) {
            (_, Some(error)) => format!("{event_type} error={error}"),
            (Some(data), None) => format!("{event_type} {data}"),
            (None, None) => event_type.clone(),
        },
        EngineEvent::Error { error } => error.clone(),
    }
}

fn status_label(status: &OperationStatus) -> String {
    match (&status.error, status.loading) {
        (_, true) => "loading".to_string(),
        (Some(error), false) => format!("failed: {error}"),
        (None, false) => "ok".to_string(),
    }
}
