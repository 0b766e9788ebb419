//! The single entry point external collaborators call.
//!
//! Per submission: Received → Validated → [Executed] → Logged → Done.
//! Execution happens only for an `Allowed` verdict; the audit append always
//! happens before the result is returned, and an append failure is reported
//! on the operational log channel without failing the submission.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{
    CommandValidator, ExecutionEngine, ExecutionReport, GatekeeperError, ProfileRegistry, Verdict,
};
use crate::audit::{AuditLog, SubmissionRecord, clip_excerpt};
use crate::config::Config;

/// What the boundary hands back for a completed submission.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Submission {
    /// The candidate was allowed and the subprocess ran (possibly into the
    /// timeout or a non-zero exit; both are normal outcomes).
    Executed {
        /// The sanitized, canonicalized command that ran.
        command: String,
        #[serde(flatten)]
        report: ExecutionReport,
    },

    /// The candidate was rejected by validation. `reason_code` is stable;
    /// `message` is safe for user display.
    Rejected {
        reason_code: &'static str,
        message: String,
    },
}

/// Validator → engine → audit orchestration.
pub struct Gatekeeper {
    registry: Arc<ProfileRegistry>,
    validator: CommandValidator,
    engine: ExecutionEngine,
    audit: AuditLog,
    command_timeout_secs: u64,
    excerpt_max_chars: usize,
}

impl Gatekeeper {
    /// Build a gatekeeper with the audit store at its configured path.
    pub fn new(config: &Config) -> Result<Self> {
        let audit = AuditLog::open(&config.paths.audit_db())?;
        Ok(Self::with_audit(config, audit))
    }

    /// Build a gatekeeper over an existing audit store.
    pub fn with_audit(config: &Config, audit: AuditLog) -> Self {
        Self {
            registry: Arc::new(ProfileRegistry::new()),
            validator: CommandValidator::new(config.gatekeeper.max_candidate_chars),
            engine: ExecutionEngine::new(config.gatekeeper.max_output_bytes),
            audit,
            command_timeout_secs: config.gatekeeper.command_timeout_secs,
            excerpt_max_chars: config.audit.excerpt_max_chars,
        }
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Submit a candidate command for a declared OS.
    ///
    /// Exactly one audit record is written per call, whatever the outcome,
    /// including unknown-OS submissions and spawn failures.
    pub async fn submit(
        &self,
        candidate: &str,
        declared_os: &str,
        session_id: &str,
    ) -> Result<Submission, GatekeeperError> {
        let verdict = match self
            .validator
            .validate(candidate, declared_os, &self.registry)
        {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(
                    "Submission failed for session {}: {} (os: {:?})",
                    session_id, err, declared_os
                );
                self.record(SubmissionRecord {
                    session_id: session_id.to_string(),
                    candidate: candidate.to_string(),
                    verdict: err.reason_code().to_string(),
                    matched_rule: Some(declared_os.to_string()),
                    ..SubmissionRecord::default()
                });
                return Err(err);
            }
        };

        let (command, timeout_class) = match verdict {
            Verdict::Allowed {
                command,
                timeout_class,
            } => (command, timeout_class),
            rejected => {
                warn!(
                    "Rejected candidate for session {} ({}): {:?}",
                    session_id,
                    rejected.reason_code(),
                    rejected.matched_rule()
                );
                self.record(SubmissionRecord {
                    session_id: session_id.to_string(),
                    candidate: candidate.to_string(),
                    verdict: rejected.reason_code().to_string(),
                    matched_rule: rejected.matched_rule(),
                    ..SubmissionRecord::default()
                });
                return Ok(Submission::Rejected {
                    reason_code: rejected.reason_code(),
                    message: rejected.public_message(),
                });
            }
        };

        let timeout = Duration::from_secs(timeout_class.effective_secs(self.command_timeout_secs));

        match self.engine.execute(&command, timeout).await {
            Ok(report) => {
                info!(
                    "Executed {:?} for session {} (exit: {:?}, timed_out: {}, {} ms)",
                    command, session_id, report.exit_code, report.timed_out, report.duration_ms
                );
                self.record(self.executed_record(session_id, candidate, &command, &report));
                Ok(Submission::Executed { command, report })
            }
            Err(err) => {
                warn!("Spawn failed for session {}: {}", session_id, err);
                self.record(SubmissionRecord {
                    session_id: session_id.to_string(),
                    candidate: candidate.to_string(),
                    verdict: "allowed".to_string(),
                    command: Some(command.clone()),
                    spawn_error: Some(err.to_string()),
                    ..SubmissionRecord::default()
                });
                Err(err)
            }
        }
    }

    fn executed_record(
        &self,
        session_id: &str,
        candidate: &str,
        command: &str,
        report: &ExecutionReport,
    ) -> SubmissionRecord {
        SubmissionRecord {
            session_id: session_id.to_string(),
            candidate: candidate.to_string(),
            verdict: "allowed".to_string(),
            matched_rule: None,
            command: Some(command.to_string()),
            exit_code: report.exit_code,
            timed_out: Some(report.timed_out),
            stdout_excerpt: Some(clip_excerpt(&report.stdout, self.excerpt_max_chars)),
            stderr_excerpt: Some(clip_excerpt(&report.stderr, self.excerpt_max_chars)),
            stdout_truncated: Some(report.stdout_truncated),
            stderr_truncated: Some(report.stderr_truncated),
            duration_ms: Some(report.duration_ms as i64),
            spawn_error: None,
        }
    }

    /// Append to the audit store; failures go to the operational log only.
    fn record(&self, record: SubmissionRecord) {
        if let Err(e) = self.audit.append(record) {
            error!("Failed to append audit record: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gatekeeper() -> Gatekeeper {
        let config = Config::default();
        Gatekeeper::with_audit(&config, AuditLog::open_in_memory().unwrap())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn allowed_candidate_executes_and_is_logged() {
        let gate = gatekeeper();
        let outcome = gate.submit("echo hello", "linux", "s1").await.unwrap();

        match outcome {
            Submission::Executed { command, report } => {
                assert_eq!(command, "echo hello");
                assert!(report.stdout.contains("hello"));
                assert_eq!(report.exit_code, Some(0));
            }
            other => panic!("expected Executed, got {:?}", other),
        }

        let records = gate.audit().recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, "allowed");
        assert_eq!(records[0].session_id, "s1");
        assert_eq!(records[0].candidate, "echo hello");
        assert_eq!(records[0].exit_code, Some(0));
        assert!(records[0].stdout_excerpt.as_deref().unwrap().contains("hello"));
    }

    #[tokio::test]
    async fn rejected_candidate_is_logged_but_never_executed() {
        let gate = gatekeeper();
        let outcome = gate.submit("sudo reboot", "linux", "s2").await.unwrap();

        match outcome {
            Submission::Rejected {
                reason_code,
                message,
            } => {
                assert_eq!(reason_code, "rejected_pattern");
                assert!(!message.contains("sudo"));
            }
            other => panic!("expected Rejected, got {:?}", other),
        }

        let records = gate.audit().recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, "rejected_pattern");
        assert_eq!(records[0].matched_rule.as_deref(), Some("sudo"));
        // No execution fields on a rejection
        assert!(records[0].command.is_none());
        assert!(records[0].exit_code.is_none());
    }

    #[tokio::test]
    async fn unknown_os_fails_but_still_writes_a_record() {
        let gate = gatekeeper();
        let err = gate.submit("ping 127.0.0.1", "amiga", "s3").await.unwrap_err();
        assert_eq!(err.reason_code(), "unknown_os");

        let records = gate.audit().recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, "unknown_os");
        assert_eq!(records[0].session_id, "s3");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_failure_is_distinct_and_logged() {
        // `getmac` is whitelisted for Windows but does not exist on the
        // Unix hosts the tests run on.
        let gate = gatekeeper();
        let err = gate.submit("getmac", "windows", "s4").await.unwrap_err();
        assert_eq!(err.reason_code(), "spawn_failure");

        let records = gate.audit().recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, "allowed");
        assert!(records[0].spawn_error.is_some());
        assert!(records[0].exit_code.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn every_submission_writes_exactly_one_record() {
        let gate = gatekeeper();

        let _ = gate.submit("echo one", "linux", "a").await;
        let _ = gate.submit("sudo two", "linux", "b").await;
        let _ = gate.submit("", "linux", "c").await;
        let _ = gate.submit("ping x", "amiga", "d").await;

        assert_eq!(gate.audit().count().unwrap(), 4);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn case_differences_do_not_change_the_outcome() {
        let gate = gatekeeper();
        let upper = gate.submit("ECHO case", "linux", "s5").await.unwrap();
        let lower = gate.submit("echo case", "linux", "s6").await.unwrap();

        match (upper, lower) {
            (
                Submission::Executed {
                    command: upper_cmd, ..
                },
                Submission::Executed {
                    command: lower_cmd, ..
                },
            ) => assert_eq!(upper_cmd, lower_cmd),
            other => panic!("expected both Executed, got {:?}", other),
        }
    }
}
