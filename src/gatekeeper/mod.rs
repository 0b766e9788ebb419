//! Command-execution gatekeeper: the decision core between the chat layer
//! and the operating system.
//!
//! A submission flows through a fixed pipeline:
//!
//! ```text
//! candidate + declared OS
//!     │
//!     ▼
//! sanitize ──► blocklist scan ──► whitelist lookup        (validate.rs)
//!     │                                │
//!     │ rejected                       │ allowed
//!     ▼                                ▼
//!  audit record                  bounded subprocess        (executor.rs)
//!                                       │
//!                                       ▼
//!                                 audit record
//! ```
//!
//! Every submission produces exactly one audit record, allowed or not.
//! Rejections are data (a [`Verdict`]), never errors; the only errors are
//! an unknown declared OS and a subprocess that could not be started.

pub mod blocklist;
pub mod executor;
pub mod facade;
pub mod registry;
pub mod sanitize;
pub mod validate;

pub use executor::{ExecutionEngine, ExecutionReport};
pub use facade::{Gatekeeper, Submission};
pub use registry::{OsKind, OsProfile, ProfileRegistry, TimeoutClass};
pub use sanitize::sanitize;
pub use validate::{CommandValidator, Verdict};

use thiserror::Error;

/// Failures that are not validation verdicts.
///
/// A rejected command is an ordinary [`Verdict`]; these two variants cover
/// the cases where the submission itself cannot proceed.
#[derive(Debug, Error)]
pub enum GatekeeperError {
    /// The declared OS identifier does not name a supported platform.
    /// This is a caller-configuration error, not a security decision.
    #[error("unsupported operating system identifier: {0:?}")]
    UnknownOs(String),

    /// The subprocess could not be started (binary missing, permission
    /// denied). Distinct from a non-zero exit, which is a normal result.
    #[error("failed to start {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl GatekeeperError {
    /// Stable machine-readable code for the external boundary.
    pub fn reason_code(&self) -> &'static str {
        match self {
            GatekeeperError::UnknownOs(_) => "unknown_os",
            GatekeeperError::Spawn { .. } => "spawn_failure",
        }
    }
}
