//! # PMS Common Library
//!
//! Shared code for the performance-management review services:
//! - Error type and `Result` alias
//! - Bootstrap configuration loading (CLI > ENV > TOML > defaults)
//! - Database bootstrap and schema
//! - Live-channel event type and SSE helpers
//! - Bearer token helpers
//! - Time utilities

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;
pub mod token;

pub use error::{Error, Result};
pub use events::ChannelEvent;
