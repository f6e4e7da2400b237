//! `trixta-engine` — role channel orchestration.
//!
//! Joins one channel per declared role, registers the contract each join
//! returns, and runs the action and reaction protocols over those channels.
//! The engine holds no state of its own: everything observable leaves as an
//! [`EngineEvent`](trixta_core::event::EngineEvent) through an [`EventSink`].
//!
//! # Architecture
//!
//! ```text
//! EngineHandle ──► Intake (one queue per trigger category)
//!                      │
//!                      ▼
//! Supervisor       ← one watcher loop per queue; each trigger runs in its
//!     │               own worker, faults are reported and contained
//!     ▼
//! connector / registrar / action / reaction
//!     │          │
//!     │          └──► ChannelService (join, push) ──► EngineHandle
//!     ▼                                               (join confirmations,
//! EventSink       ← Store, event_channel(), ...        reaction occurrences)
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trixta_core::{config::EngineConfig, role::Role};
//! use trixta_engine::{intake, LoopbackChannels, Store, Supervisor};
//!
//! let config = EngineConfig::default();
//! let (handle, intake) = intake();
//! let channels = Arc::new(LoopbackChannels::new(handle.clone()));
//! let store = Store::new(config.instances.clone());
//! let _engine = Supervisor::start_with(handle.clone(), intake, config, channels, Arc::new(store.clone()));
//!
//! handle.declare_role(Role::new("viewer"))?;
//! ```

pub mod channel;
pub mod error;
pub mod intake;
pub mod loopback;
pub mod sink;
pub mod store;
pub mod supervisor;

mod action;
mod connector;
mod reaction;
mod registrar;
mod worker;

pub use channel::{ChannelService, JoinOptions};
pub use error::{ChannelError, EngineError, Result};
pub use intake::{intake, ActionSubmission, EngineHandle, Intake, ReactionReply};
pub use loopback::{ChannelCall, LoopbackChannels};
pub use sink::{event_channel, EventSink, EventStream};
pub use store::Store;
pub use supervisor::Supervisor;
