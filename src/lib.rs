//! Shelfwatch - re-encodes newly added audiobooks on a media server
//!
//! The library crate exposes the core functionality for integration testing.

pub mod config;
pub mod context;
pub mod control;
pub mod error;
pub mod events;
pub mod protocol;
pub mod queue;
pub mod rules;
pub mod scan;
pub mod session;

pub use error::{Error, Result};
