//! Contract registrar: turns a join confirmation into declared actions and
//! reactions, then arms the reaction listeners for the channel.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};
use trixta_core::contract::Contract;
use trixta_core::event::EngineEvent;

use crate::error::Result;
use crate::intake::ChannelJoin;
use crate::reaction;
use crate::worker::{spawn_worker, Context};

pub(crate) async fn register_contract(ctx: Arc<Context>, join: ChannelJoin) -> Result<()> {
    let role = ctx.naming.role_from_topic(&join.topic)?.to_owned();
    if is_null_or_empty(&join.response) {
        debug!(%role, "join confirmation without a contract");
        return Ok(());
    }
    let contract = Contract::from_join_response(&join.response)?;
    let reaction_names = contract.reaction_names();

    info!(
        %role,
        actions = contract.actions.len(),
        reactions = reaction_names.len(),
        "registering role contract"
    );

    for (name, action) in contract.actions {
        ctx.emit(EngineEvent::ActionDeclared {
            role: role.clone(),
            name,
            action,
        })
        .await?;
    }
    for (name, reaction) in contract.reactions {
        ctx.emit(EngineEvent::ReactionDeclared {
            role: role.clone(),
            name,
            reaction,
        })
        .await?;
    }

    if !reaction_names.is_empty() {
        spawn_worker(
            &ctx,
            "subscribe_reactions",
            reaction::subscribe(Arc::clone(&ctx), join.topic, reaction_names),
        );
    }
    Ok(())
}

fn is_null_or_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
