use std::future::Future;
use std::sync::Arc;

use tracing::warn;
use trixta_core::channel::ChannelNaming;
use trixta_core::config::EngineConfig;
use trixta_core::event::EngineEvent;

use crate::channel::ChannelService;
use crate::error::{EngineError, Result};
use crate::intake::Completions;
use crate::sink::EventSink;

/// Shared, read-only context handed to every worker.
pub(crate) struct Context {
    pub channels: Arc<dyn ChannelService>,
    pub sink: Arc<dyn EventSink>,
    pub naming: ChannelNaming,
    pub config: EngineConfig,
    pub completions: Completions,
}

impl Context {
    pub async fn emit(&self, event: EngineEvent) -> Result<()> {
        self.sink.dispatch(event).await
    }

    async fn report(&self, label: &'static str, error: EngineError) {
        warn!(worker = label, error = %error, "worker failed");
        if let Err(e) = self.sink.dispatch(EngineEvent::error(&error)).await {
            warn!(worker = label, error = %e, "could not report worker failure");
        }
    }
}

/// Run `work` as an independent task.
///
/// A monitor task awaits it: an `Err` or a panic is reported as a generic
/// engine error event and goes no further. Nothing is retried.
pub(crate) fn spawn_worker<F>(ctx: &Arc<Context>, label: &'static str, work: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let ctx = Arc::clone(ctx);
    let task = tokio::spawn(work);
    tokio::spawn(async move {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => ctx.report(label, e).await,
            Err(join_err) if join_err.is_panic() => {
                let cause = panic_message(join_err.into_panic());
                ctx.report(label, EngineError::WorkerPanicked(label, cause))
                    .await;
            }
            Err(_) => {}
        }
    });
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
