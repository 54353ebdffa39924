//! Room synchronization engine: rooms, the playback clock, authorization,
//! and the command handlers that mutate rooms and fan out the results.

pub mod clock;
pub mod config;
pub mod error;
pub mod eviction;
pub mod logging;
pub mod models;
pub mod registry;
pub mod service;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};
