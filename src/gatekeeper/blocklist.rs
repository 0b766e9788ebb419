//! Dangerous-pattern blocklist, evaluated before any whitelist check.
//!
//! Matching is substring-based and case-insensitive by design: stricter
//! than the whitelist, so a whitelisted binary name buried in a compound
//! dangerous command line (`sudo ping ...`) still vetoes execution. The
//! known cost is false positives on harmless arguments that happen to
//! contain a pattern (a filename containing `curl`); that tradeoff is
//! deliberate and kept.

/// Substrings that universally veto execution, whatever the whitelist says.
pub const BLOCKED_PATTERNS: &[&str] = &[
    // Destructive filesystem operations
    "rm -rf",
    "del /s",
    "format",
    "fdisk",
    "dd",
    // Privilege escalation
    "sudo",
    "su",
    "chmod 777",
    "chown root",
    // Raw network fetch / remote shells
    "wget",
    "curl",
    "nc",
    "telnet",
    "ssh",
    // Device-file redirection and pipe-to-shell
    "> /dev/",
    ">> /dev/",
    "| bash",
    "| sh",
];

/// Scan a lowercased candidate for the first blocked pattern.
///
/// The caller lowercases; patterns are stored lowercase. Returns the
/// matched pattern so the audit trail can record which rule fired.
pub fn scan(candidate_lowercased: &str) -> Option<&'static str> {
    BLOCKED_PATTERNS
        .iter()
        .copied()
        .find(|pattern| candidate_lowercased.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_escalation_matches() {
        assert_eq!(scan("sudo ping google.com"), Some("sudo"));
        assert_eq!(scan("chmod 777 /etc/passwd"), Some("chmod 777"));
    }

    #[test]
    fn destructive_operations_match() {
        assert_eq!(scan("rm -rf /"), Some("rm -rf"));
        assert_eq!(scan("echo x | bash"), Some("| bash"));
        assert_eq!(scan("fdisk -l"), Some("fdisk"));
    }

    #[test]
    fn network_fetch_tools_match() {
        assert_eq!(scan("curl http://evil.example"), Some("curl"));
        assert_eq!(scan("wget http://evil.example"), Some("wget"));
        assert_eq!(scan("ssh user@host"), Some("ssh"));
    }

    #[test]
    fn clean_diagnostics_pass() {
        assert_eq!(scan("ping -c 4 127.0.0.1"), None);
        assert_eq!(scan("ipconfig /all"), None);
        assert_eq!(scan("systeminfo"), None);
    }

    #[test]
    fn substring_matching_is_intentionally_broad() {
        // A filename merely containing a pattern still trips the scan.
        // Preserved behavior, not a bug; see module docs.
        assert_eq!(scan("cat curly-braces.txt"), Some("curl"));
        assert_eq!(scan("ping address.example"), Some("dd"));
    }

    #[test]
    fn first_pattern_in_table_order_wins() {
        // "sudo" also contains "su"; the table lists "sudo" first.
        assert_eq!(scan("sudo su"), Some("sudo"));
    }
}
