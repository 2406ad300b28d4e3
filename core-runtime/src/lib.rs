//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the playback core:
//! - Logging and tracing setup
//! - Configuration and bridge wiring
//! - Event bus
//!
//! ## Overview
//!
//! The engine crate builds on these pieces: it reads bridges and feature
//! flags from [`config::CoreConfig`], reports transitions on an
//! [`events::EventBus`] and logs through `tracing` once
//! [`logging::init_logging`] has installed a subscriber.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
