//! Candidate validation: sanitize, blocklist scan, whitelist lookup.

use serde::Serialize;

use super::registry::{OsProfile, ProfileRegistry, TimeoutClass};
use super::{GatekeeperError, blocklist, sanitize::sanitize};

/// Validation outcome for a single candidate.
///
/// Immutable once produced. `Allowed` carries the sanitized command forward
/// (command name canonicalized to its native lowercase form, argument case
/// preserved) so execution never sees raw input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Allowed {
        /// The command as it will be executed.
        command: String,
        #[serde(skip)]
        timeout_class: TimeoutClass,
    },
    RejectedMalformed {
        reason: String,
    },
    RejectedPattern {
        /// The blocklist entry that fired. Recorded in the audit trail;
        /// not echoed verbatim to end users.
        pattern: &'static str,
    },
    RejectedWhitelist {
        /// The command token that failed the whitelist check.
        token: String,
    },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed { .. })
    }

    /// Stable machine-readable code for the external boundary and the
    /// audit trail.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Verdict::Allowed { .. } => "allowed",
            Verdict::RejectedMalformed { .. } => "rejected_malformed",
            Verdict::RejectedPattern { .. } => "rejected_pattern",
            Verdict::RejectedWhitelist { .. } => "rejected_whitelist",
        }
    }

    /// The rule that decided a rejection, for the audit trail.
    pub fn matched_rule(&self) -> Option<String> {
        match self {
            Verdict::Allowed { .. } => None,
            Verdict::RejectedMalformed { reason } => Some(reason.clone()),
            Verdict::RejectedPattern { pattern } => Some((*pattern).to_string()),
            Verdict::RejectedWhitelist { token } => Some(token.clone()),
        }
    }

    /// User-facing rejection message. Deliberately does not quote the
    /// matched blocklist pattern back at the user.
    pub fn public_message(&self) -> String {
        match self {
            Verdict::Allowed { .. } => "command allowed".to_string(),
            Verdict::RejectedMalformed { reason } => {
                format!("command rejected: {}", reason)
            }
            Verdict::RejectedPattern { .. } => {
                "command rejected: it matches a blocked pattern".to_string()
            }
            Verdict::RejectedWhitelist { token } => {
                format!(
                    "command rejected: {:?} is not an approved diagnostic command for this system",
                    token
                )
            }
        }
    }
}

/// Composes the sanitizer, blocklist, and profile registry into an
/// allow/deny decision. Pure function of its inputs and the static
/// registry: the same candidate and OS always yield the same verdict.
pub struct CommandValidator {
    max_candidate_chars: usize,
}

impl CommandValidator {
    pub fn new(max_candidate_chars: usize) -> Self {
        Self {
            max_candidate_chars,
        }
    }

    /// Validate a candidate against a declared OS.
    ///
    /// `Err(UnknownOs)` is a caller-configuration failure, distinct from a
    /// verdict; every other outcome is a [`Verdict`].
    pub fn validate(
        &self,
        candidate: &str,
        declared_os: &str,
        registry: &ProfileRegistry,
    ) -> Result<Verdict, GatekeeperError> {
        // 1. Sanitize; empty or oversized input never reaches the tables.
        let clean = sanitize(candidate);
        if clean.is_empty() {
            return Ok(Verdict::RejectedMalformed {
                reason: "empty after sanitization".to_string(),
            });
        }
        if clean.chars().count() > self.max_candidate_chars {
            return Ok(Verdict::RejectedMalformed {
                reason: format!("longer than {} characters", self.max_candidate_chars),
            });
        }

        // 2. Blocklist scan on the lowercased candidate. Evaluated before
        //    the whitelist so a match short-circuits even whitelisted names.
        let lowered = clean.to_lowercase();
        if let Some(pattern) = blocklist::scan(&lowered) {
            return Ok(Verdict::RejectedPattern { pattern });
        }

        // 3. Whitelist: whole first token, case-insensitive, per-OS.
        //    Matching is case-insensitive but argument case is preserved;
        //    `system_profiler SPHardwareDataType` must run as typed.
        let profile = registry.lookup(declared_os)?;
        Ok(self.check_whitelist(&clean, profile))
    }

    fn check_whitelist(&self, clean: &str, profile: &OsProfile) -> Verdict {
        let mut tokens = clean.split_whitespace();
        let first = match tokens.next() {
            Some(t) => t,
            // Unreachable after the empty check above, but stay total.
            None => {
                return Verdict::RejectedMalformed {
                    reason: "empty after sanitization".to_string(),
                };
            }
        };
        let token = first.to_lowercase();

        let Some(canonical) = profile.resolve(&token) else {
            return Verdict::RejectedWhitelist { token };
        };

        let first_arg = tokens.next().map(str::to_lowercase);
        if !profile.args_permitted(canonical, first_arg.as_deref()) {
            return Verdict::RejectedWhitelist { token };
        }

        // Substitute the canonical name so aliases execute natively.
        let mut command = String::from(canonical);
        for arg in clean.split_whitespace().skip(1) {
            command.push(' ');
            command.push_str(arg);
        }

        Verdict::Allowed {
            timeout_class: profile.timeout_class(canonical),
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatekeeper::registry::ProfileRegistry;

    fn validator() -> CommandValidator {
        CommandValidator::new(1000)
    }

    fn verdict(candidate: &str, os: &str) -> Verdict {
        let registry = ProfileRegistry::new();
        validator().validate(candidate, os, &registry).unwrap()
    }

    #[test]
    fn whitelisted_clean_candidate_is_allowed() {
        let v = verdict("ping 127.0.0.1", "linux");
        assert!(v.is_allowed());
        assert_eq!(v.reason_code(), "allowed");
    }

    #[test]
    fn blocklist_wins_over_whitelist() {
        // `ping` is whitelisted on Linux, but the compound line matches
        // the escalation pattern first.
        let v = verdict("sudo ping google.com", "linux");
        assert_eq!(v, Verdict::RejectedPattern { pattern: "sudo" });
    }

    #[test]
    fn non_whitelisted_command_is_rejected() {
        let v = verdict("shutdown /s", "windows");
        assert_eq!(
            v,
            Verdict::RejectedWhitelist {
                token: "shutdown".to_string()
            }
        );
    }

    #[test]
    fn whole_token_matching_rejects_prefix_lookalikes() {
        let v = verdict("pingflood 127.0.0.1", "linux");
        assert_eq!(v.reason_code(), "rejected_whitelist");
    }

    #[test]
    fn empty_and_whitespace_are_malformed() {
        assert_eq!(verdict("", "linux").reason_code(), "rejected_malformed");
        assert_eq!(verdict("   \t ", "linux").reason_code(), "rejected_malformed");
        assert_eq!(verdict("<>\"'&", "linux").reason_code(), "rejected_malformed");
    }

    #[test]
    fn oversized_candidate_is_malformed() {
        let registry = ProfileRegistry::new();
        let v = CommandValidator::new(10)
            .validate("ping 127.0.0.1 extra extra", "linux", &registry)
            .unwrap();
        assert_eq!(v.reason_code(), "rejected_malformed");
    }

    #[test]
    fn unknown_os_is_an_error_not_a_verdict() {
        let registry = ProfileRegistry::new();
        let err = validator()
            .validate("ping 127.0.0.1", "beos", &registry)
            .unwrap_err();
        assert!(matches!(err, GatekeeperError::UnknownOs(_)));
    }

    #[test]
    fn verdicts_are_case_insensitive() {
        let upper = verdict("PING 127.0.0.1", "linux");
        let lower = verdict("ping 127.0.0.1", "linux");
        assert_eq!(upper, lower);
    }

    #[test]
    fn validation_is_idempotent() {
        for candidate in ["ping 127.0.0.1", "sudo ls", "shutdown", ""] {
            assert_eq!(verdict(candidate, "windows"), verdict(candidate, "windows"));
        }
    }

    #[test]
    fn allowed_command_is_the_sanitized_form() {
        // The ampersand is stripped before anything else looks at the input.
        let v = verdict("ping &127.0.0.1", "linux");
        match v {
            Verdict::Allowed { command, .. } => assert_eq!(command, "ping 127.0.0.1"),
            other => panic!("expected Allowed, got {:?}", other),
        }
    }

    #[test]
    fn aliases_are_canonicalized_in_the_allowed_command() {
        let v = verdict("traceroute example.org", "windows");
        match v {
            Verdict::Allowed { command, .. } => assert_eq!(command, "tracert example.org"),
            other => panic!("expected Allowed, got {:?}", other),
        }
    }

    #[test]
    fn argument_case_is_preserved() {
        // Whitelist matching is case-insensitive; arguments run as typed.
        let v = verdict("System_Profiler SPHardwareDataType", "darwin");
        match v {
            Verdict::Allowed { command, .. } => {
                assert_eq!(command, "system_profiler SPHardwareDataType")
            }
            other => panic!("expected Allowed, got {:?}", other),
        }
    }

    #[test]
    fn constrained_subcommands_enforced() {
        assert!(verdict("sc query spooler", "windows").is_allowed());
        assert_eq!(
            verdict("sc stop spooler", "windows").reason_code(),
            "rejected_whitelist"
        );
        assert!(verdict("systemctl status cron", "linux").is_allowed());
        assert_eq!(
            verdict("systemctl restart cron", "linux").reason_code(),
            "rejected_whitelist"
        );
    }

    #[test]
    fn rejection_messages_do_not_leak_patterns() {
        let v = verdict("sudo ping google.com", "linux");
        assert!(!v.public_message().contains("sudo"));
        // The audit trail still records the rule.
        assert_eq!(v.matched_rule().as_deref(), Some("sudo"));
    }
}
