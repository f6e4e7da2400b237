pub mod channel;
pub mod config;
pub mod contract;
pub mod error;
pub mod event;
pub mod instance;
pub mod role;
pub mod state;
pub mod status;

pub use error::{Result, TrixtaError};
