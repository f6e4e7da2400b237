//! Orchestration supervisor: one watcher loop per trigger category.
//!
//! Each watcher waits on its own queue and hands every trigger to a fresh
//! worker. A failing or panicking worker is reported by its monitor and
//! never reaches the watcher, so the loops outlive any single operation.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use trixta_core::config::EngineConfig;
use trixta_core::role::Role;

use crate::action;
use crate::channel::ChannelService;
use crate::connector::connect_roles;
use crate::error::Result;
use crate::intake::{intake, EngineHandle, Intake};
use crate::reaction;
use crate::registrar::register_contract;
use crate::sink::EventSink;
use crate::worker::{spawn_worker, Context};

pub struct Supervisor {
    handle: EngineHandle,
    watchers: Vec<JoinHandle<()>>,
}

impl Supervisor {
    /// Start an engine with a fresh intake.
    ///
    /// Use [`Supervisor::start_with`] when the channel service needs the
    /// handle before the engine exists.
    pub fn start(
        config: EngineConfig,
        channels: Arc<dyn ChannelService>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (handle, intake) = intake();
        Self::start_with(handle, intake, config, channels, sink)
    }

    pub fn start_with(
        handle: EngineHandle,
        intake: Intake,
        config: EngineConfig,
        channels: Arc<dyn ChannelService>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let Intake {
            roles,
            role,
            joined,
            submit_action,
            occurred,
            submit_reaction,
            action_ok,
            action_err,
            reaction_ok,
            reaction_err,
            completions,
        } = intake;

        info!(
            namespace = %config.namespace,
            debug_mode = config.debug_mode,
            "starting orchestration supervisor"
        );
        let ctx = Arc::new(Context {
            channels,
            sink,
            naming: config.naming(),
            config,
            completions,
        });

        let watchers = vec![
            watch(&ctx, "connect_roles", roles, connect_roles),
            watch(&ctx, "connect_role", role, |ctx, role: Role| {
                connect_roles(ctx, vec![role])
            }),
            watch(&ctx, "register_contract", joined, register_contract),
            watch(&ctx, "submit_action", submit_action, action::submit),
            watch(&ctx, "action_success", action_ok, action::on_success),
            watch(&ctx, "action_failure", action_err, action::on_failure),
            watch(&ctx, "record_reaction", occurred, reaction::record_occurrence),
            watch(&ctx, "respond_to_reaction", submit_reaction, reaction::respond),
            watch(&ctx, "reaction_success", reaction_ok, reaction::on_success),
            watch(&ctx, "reaction_failure", reaction_err, reaction::on_failure),
        ];

        Self { handle, watchers }
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Stop every watcher. Workers already in flight run to completion.
    pub fn shutdown(mut self) {
        self.abort_watchers();
    }

    fn abort_watchers(&mut self) {
        for watcher in self.watchers.drain(..) {
            watcher.abort();
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.abort_watchers();
    }
}

fn watch<T, F, Fut>(
    ctx: &Arc<Context>,
    label: &'static str,
    mut rx: UnboundedReceiver<T>,
    handler: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Fn(Arc<Context>, T) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        while let Some(trigger) = rx.recv().await {
            spawn_worker(&ctx, label, handler(Arc::clone(&ctx), trigger));
        }
        debug!(watcher = label, "intake closed, watcher exiting");
    })
}
