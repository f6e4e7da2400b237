//! Role connector: one channel join per declared role.

use std::sync::Arc;

use tracing::debug;
use trixta_core::event::EngineEvent;
use trixta_core::role::Role;

use crate::channel::JoinOptions;
use crate::error::Result;
use crate::worker::{spawn_worker, Context};

/// Fan out one isolated join worker per non-empty role.
pub(crate) async fn connect_roles(ctx: Arc<Context>, roles: Vec<Role>) -> Result<()> {
    for role in roles {
        if role.is_empty() {
            debug!("skipping role with empty name");
            continue;
        }
        spawn_worker(&ctx, "connect_role", connect_role(Arc::clone(&ctx), role));
    }
    Ok(())
}

/// Announce `role` and request its channel. Re-declaring a role simply
/// requests the join again.
async fn connect_role(ctx: Arc<Context>, role: Role) -> Result<()> {
    let topic = ctx.naming.topic(&role.name);
    let opts = JoinOptions::presence(role.log_presence);
    ctx.emit(EngineEvent::RoleDeclared { role }).await?;
    debug!(%topic, log_presence = opts.log_presence, "requesting channel join");
    ctx.channels.join(&topic, opts).await?;
    Ok(())
}
