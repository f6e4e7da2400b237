//! Action protocol: client-initiated request/response on a role channel.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};
use trixta_core::config::EngineConfig;
use trixta_core::event::EngineEvent;
use trixta_core::status::{OperationStatus, StatusKey};

use crate::channel::JoinOptions;
use crate::error::Result;
use crate::intake::{strip_carriers, ActionSubmission, Carrier, Failure, Success};
use crate::worker::Context;

/// Request body pushed for `submission`:
/// `{action_payload, ...options}`, where options are
/// `{debug: true, ...debug_options, ...action_options}` in debug mode and
/// `{...action_options}` otherwise. Later spreads win on key collision.
pub(crate) fn request_body(submission: &ActionSubmission, config: &EngineConfig) -> Value {
    let mut body = Map::new();
    body.insert("action_payload".into(), submission.form_data.clone());

    if submission.debug_mode.unwrap_or(config.debug_mode) {
        body.insert("debug".into(), Value::Bool(true));
        for (k, v) in config.debug_options.iter().chain(&submission.debug_options) {
            body.insert(k.clone(), v.clone());
        }
    }
    for (k, v) in &submission.action_options {
        body.insert(k.clone(), v.clone());
    }
    Value::Object(body)
}

pub(crate) async fn submit(ctx: Arc<Context>, submission: ActionSubmission) -> Result<()> {
    let key = StatusKey::action(&submission.role, &submission.action);
    let topic = ctx.naming.topic(&submission.role);
    let body = request_body(&submission, &ctx.config);
    let carrier = Carrier {
        role: submission.role,
        name: submission.action,
        response_event: submission.response_event,
        error_event: submission.error_event,
    };

    ctx.emit(EngineEvent::StatusUpdated {
        key: key.clone(),
        status: OperationStatus::loading(),
    })
    .await?;

    debug!(%topic, action = %carrier.name, %key, "pushing action");
    let outcome = match ctx.channels.join(&topic, JoinOptions::default()).await {
        Ok(()) => ctx.channels.push(&topic, &carrier.name, body).await,
        Err(e) => Err(e),
    };
    ctx.completions.action(key, carrier, outcome)
}

pub(crate) async fn on_success(ctx: Arc<Context>, success: Success) -> Result<()> {
    let Success {
        key,
        carrier,
        mut payload,
    } = success;
    strip_carriers(&mut payload);

    ctx.emit(EngineEvent::ActionResponseUpdated {
        role: carrier.role,
        action: carrier.name,
        response: payload.clone(),
    })
    .await?;
    ctx.emit(EngineEvent::StatusUpdated {
        key,
        status: OperationStatus::succeeded(),
    })
    .await?;
    if let Some(event_type) = carrier.response_event {
        ctx.emit(EngineEvent::side_success(event_type, payload)).await?;
    }
    Ok(())
}

pub(crate) async fn on_failure(ctx: Arc<Context>, failure: Failure) -> Result<()> {
    let Failure {
        key,
        carrier,
        error,
    } = failure;
    warn!(%key, role = %carrier.role, action = %carrier.name, %error, "action failed");

    ctx.emit(EngineEvent::StatusUpdated {
        key,
        status: OperationStatus::failed(error.clone()),
    })
    .await?;
    if let Some(event_type) = carrier.error_event {
        ctx.emit(EngineEvent::side_failure(event_type, error)).await?;
    }
    Ok(())
}
