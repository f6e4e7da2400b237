//! Reaction protocol: server-pushed invitations and the replies that answer
//! them on `reply:<ref>`.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::{debug, warn};
use trixta_core::channel::reply_event;
use trixta_core::event::EngineEvent;
use trixta_core::instance::ReactionInstance;
use trixta_core::status::{OperationStatus, StatusKey};
use trixta_core::TrixtaError;

use crate::channel::JoinOptions;
use crate::error::Result;
use crate::intake::{strip_carriers, Carrier, Failure, ReactionOccurrence, ReactionReply, Success};
use crate::worker::Context;

/// Ask the channel service to forward every named reaction on `topic`.
/// All names go in one request.
pub(crate) async fn subscribe(ctx: Arc<Context>, topic: String, reactions: Vec<String>) -> Result<()> {
    debug!(%topic, count = reactions.len(), "subscribing to reactions");
    ctx.channels
        .join(&topic, JoinOptions::listening(reactions))
        .await?;
    Ok(())
}

pub(crate) async fn record_occurrence(ctx: Arc<Context>, occurrence: ReactionOccurrence) -> Result<()> {
    let ReactionOccurrence {
        topic,
        event_name,
        payload,
    } = occurrence;
    let role = ctx.naming.role_from_topic(&topic)?.to_owned();
    let mut instance = ReactionInstance::from_occurrence(&event_name, payload)?;
    if instance.date_created.is_none() {
        instance.date_created = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    }
    if !instance.can_reply() {
        warn!(%role, reaction = %event_name, "reaction occurrence has no ref; it cannot be replied to");
    }

    ctx.emit(EngineEvent::ReactionInstanceUpdated {
        role,
        reaction: event_name,
        instance,
    })
    .await
}

pub(crate) async fn respond(ctx: Arc<Context>, reply: ReactionReply) -> Result<()> {
    if reply.reference.is_empty() {
        return Err(TrixtaError::MissingRef {
            role: reply.role,
            reaction: reply.reaction,
        }
        .into());
    }
    let key = StatusKey::reaction(&reply.role, &reply.reaction, &reply.reference);
    let topic = ctx.naming.topic(&reply.role);
    let event = reply_event(&reply.reference);
    let body = json!({ "event": reply.reaction, "value": reply.form_data });
    let carrier = Carrier {
        role: reply.role,
        name: reply.reaction,
        response_event: reply.response_event,
        error_event: reply.error_event,
    };

    ctx.emit(EngineEvent::StatusUpdated {
        key: key.clone(),
        status: OperationStatus::loading(),
    })
    .await?;

    debug!(%topic, %event, %key, "pushing reaction reply");
    let outcome = match ctx.channels.join(&topic, JoinOptions::default()).await {
        Ok(()) => ctx.channels.push(&topic, &event, body).await,
        Err(e) => Err(e),
    };
    ctx.completions.reaction(key, carrier, outcome)
}

/// A confirmed reply only settles the status and notifies the caller; the
/// instance itself is left as it is.
pub(crate) async fn on_success(ctx: Arc<Context>, success: Success) -> Result<()> {
    let Success {
        key,
        carrier,
        mut payload,
    } = success;
    strip_carriers(&mut payload);

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
    warn!(%key, role = %carrier.role, reaction = %carrier.name, %error, "reaction reply failed");

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
