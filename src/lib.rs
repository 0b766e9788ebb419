//! Deskgate - a command-execution gatekeeper for IT helpdesk assistants
//!
//! This crate provides the core functionality for Deskgate, including:
//! - Per-OS command whitelists with alias resolution
//! - Input sanitization and dangerous-pattern blocking
//! - Timeout-bounded subprocess execution with capped output capture
//! - Tamper-evident audit trail in SQLite
//! - HTTP server for chat/UI integration

pub mod audit;
pub mod cli;
pub mod config;
pub mod gatekeeper;
pub mod paths;
pub mod presets;
pub mod server;

pub use config::Config;
pub use gatekeeper::{Gatekeeper, GatekeeperError, Submission};
