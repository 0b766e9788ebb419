//! Per-OS command profiles: whitelists, aliases, argument constraints,
//! and timeout classes.
//!
//! The registry is built once at startup from static tables and shared
//! read-only (`Arc<ProfileRegistry>`) by every validator. Membership tests
//! are case-insensitive and match whole command tokens only (the first
//! whitespace-delimited token of a candidate), never substrings, so
//! `pingflood` does not match a `ping` entry.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::GatekeeperError;

/// Supported target platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    Windows,
    MacOs,
    Linux,
}

impl OsKind {
    /// Parse a declared OS identifier, accepting the aliases browsers and
    /// platform APIs commonly report (`darwin`, `win32`, `osx`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "windows" | "win" | "win32" | "windows_nt" => Some(OsKind::Windows),
            "macos" | "darwin" | "osx" | "mac" => Some(OsKind::MacOs),
            "linux" => Some(OsKind::Linux),
            _ => None,
        }
    }

    /// Detect the OS this process is running on.
    pub fn host() -> Option<Self> {
        Self::parse(std::env::consts::OS)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsKind::Windows => "windows",
            OsKind::MacOs => "macos",
            OsKind::Linux => "linux",
        }
    }

    pub const ALL: [OsKind; 3] = [OsKind::Windows, OsKind::MacOs, OsKind::Linux];
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a command class may run before the engine kills it.
///
/// Classes are clamped to the configured `command_timeout_secs`, so nothing
/// ever outlives the deployment-wide bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// Fast lookups: ping, hostname, echo. 10 s
    Quick,
    /// Listings: process tables, disk usage. 15 s
    Medium,
    /// Full inventories: systeminfo, system_profiler. The configured cap
    Slow,
}

impl TimeoutClass {
    /// Effective timeout in seconds, never exceeding `cap_secs`.
    pub fn effective_secs(&self, cap_secs: u64) -> u64 {
        let class_secs = match self {
            TimeoutClass::Quick => 10,
            TimeoutClass::Medium => 15,
            TimeoutClass::Slow => cap_secs,
        };
        class_secs.min(cap_secs)
    }
}

/// Immutable command profile for one platform.
#[derive(Debug)]
pub struct OsProfile {
    os: OsKind,
    commands: HashSet<&'static str>,
    aliases: HashMap<&'static str, &'static str>,
    arg_rules: HashMap<&'static str, &'static [&'static str]>,
}

impl OsProfile {
    fn new(
        os: OsKind,
        commands: &'static [&'static str],
        aliases: &'static [(&'static str, &'static str)],
        arg_rules: &'static [(&'static str, &'static [&'static str])],
    ) -> Self {
        Self {
            os,
            commands: commands.iter().copied().collect(),
            aliases: aliases.iter().copied().collect(),
            arg_rules: arg_rules.iter().copied().collect(),
        }
    }

    pub fn os(&self) -> OsKind {
        self.os
    }

    /// Resolve a lowercase command token to its canonical native name.
    ///
    /// Returns `None` when the token is neither a whitelist member nor an
    /// alias of one. The token must be a whole command name; callers pass
    /// the first whitespace-delimited token of the candidate.
    pub fn resolve(&self, token: &str) -> Option<&'static str> {
        if let Some(&canonical) = self.commands.get(token) {
            return Some(canonical);
        }
        self.aliases.get(token).copied()
    }

    /// Check the first argument against the command's constraint, if any.
    ///
    /// Commands without a rule accept any arguments. Commands with a rule
    /// (action-taking binaries like `sc` or `systemctl`) only accept the
    /// enumerated read-only subcommands.
    pub fn args_permitted(&self, canonical: &str, first_arg: Option<&str>) -> bool {
        match self.arg_rules.get(canonical) {
            None => true,
            Some(allowed) => match first_arg {
                Some(arg) => allowed.contains(&arg),
                // An action-taking command with no subcommand at all is
                // either interactive or an error; reject it.
                None => false,
            },
        }
    }

    /// All whitelisted command names, sorted.
    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.commands.iter().copied().collect();
        names.sort_unstable();
        names
    }

    /// Timeout class for a canonical command name.
    pub fn timeout_class(&self, canonical: &str) -> TimeoutClass {
        if QUICK_COMMANDS.contains(&canonical) {
            TimeoutClass::Quick
        } else if SLOW_COMMANDS.contains(&canonical) {
            TimeoutClass::Slow
        } else {
            TimeoutClass::Medium
        }
    }
}

/// The three platform profiles, built once and shared read-only.
pub struct ProfileRegistry {
    profiles: HashMap<OsKind, OsProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            OsKind::Windows,
            OsProfile::new(
                OsKind::Windows,
                WINDOWS_COMMANDS,
                WINDOWS_ALIASES,
                WINDOWS_ARG_RULES,
            ),
        );
        profiles.insert(
            OsKind::MacOs,
            OsProfile::new(OsKind::MacOs, MACOS_COMMANDS, MACOS_ALIASES, MACOS_ARG_RULES),
        );
        profiles.insert(
            OsKind::Linux,
            OsProfile::new(OsKind::Linux, LINUX_COMMANDS, LINUX_ALIASES, LINUX_ARG_RULES),
        );
        Self { profiles }
    }

    /// Look up the profile for a declared OS identifier.
    ///
    /// Fails with [`GatekeeperError::UnknownOs`] when the identifier does
    /// not name one of the three supported platforms.
    pub fn lookup(&self, os_id: &str) -> Result<&OsProfile, GatekeeperError> {
        let kind =
            OsKind::parse(os_id).ok_or_else(|| GatekeeperError::UnknownOs(os_id.to_string()))?;
        Ok(&self.profiles[&kind])
    }

    /// Profile for a known platform.
    pub fn profile(&self, os: OsKind) -> &OsProfile {
        &self.profiles[&os]
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ── Whitelist tables ────────────────────────────────────────────────
//
// Command names only (first token), lowercase. Mutating utilities from the
// legacy deployment tables (del, copy, move, reg add, rm, cp, mv) are
// deliberately absent; action-taking commands that survived are constrained
// to read-only subcommands below.

const WINDOWS_COMMANDS: &[&str] = &[
    // Network
    "ipconfig", "ping", "nslookup", "netstat", "tracert", "route", "arp", "getmac", "netsh",
    // System
    "systeminfo", "tasklist", "sfc", "chkdsk", "dir", "type", "echo", "wmic", "ver", "hostname",
    "whoami",
    // File system (read-only)
    "tree", "attrib",
    // Services / policy
    "sc", "gpresult",
    // Event logs / power
    "wevtutil", "powercfg",
    // Registry (reads constrained below)
    "reg",
];

const MACOS_COMMANDS: &[&str] = &[
    // Network
    "ifconfig", "ping", "nslookup", "netstat", "traceroute", "route", "arp", "networksetup",
    "scutil",
    // System
    "system_profiler", "ps", "df", "ls", "cat", "echo", "uname", "hostname", "whoami", "pwd",
    "sw_vers",
    // Hardware / storage
    "ioreg", "diskutil",
    // Performance
    "top", "vm_stat", "iostat", "lsof",
    // Services / users
    "launchctl", "dscl", "id", "groups",
    // Logs / power
    "log", "pmset",
    // Printing
    "lpstat",
    // Security posture
    "csrutil", "spctl",
];

const LINUX_COMMANDS: &[&str] = &[
    // Network
    "ifconfig", "ip", "ping", "nslookup", "netstat", "traceroute", "route", "arp", "nmcli",
    // System
    "uname", "uptime", "who", "w", "ps", "df", "free", "ls", "cat", "echo", "hostname", "whoami",
    "id", "groups",
    // Hardware
    "lscpu", "lsmem", "lspci", "lsusb", "lshw",
    // Performance
    "top", "vmstat", "iostat",
    // Storage
    "du",
    // Services / logs
    "systemctl", "journalctl", "dmesg",
];

// ── Alias tables ────────────────────────────────────────────────────
//
// Cross-platform names users (and assistants) habitually type, mapped to
// the native command. The canonical name is substituted before execution.

const WINDOWS_ALIASES: &[(&str, &str)] = &[
    ("traceroute", "tracert"),
    ("ifconfig", "ipconfig"),
    ("ps", "tasklist"),
    ("ls", "dir"),
    ("cat", "type"),
];

const MACOS_ALIASES: &[(&str, &str)] = &[
    ("ipconfig", "ifconfig"),
    ("tracert", "traceroute"),
    ("tasklist", "ps"),
    ("free", "vm_stat"),
];

const LINUX_ALIASES: &[(&str, &str)] = &[
    ("ipconfig", "ifconfig"),
    ("tracert", "traceroute"),
    ("tasklist", "ps"),
];

// ── Argument constraints ────────────────────────────────────────────
//
// First-argument allowlists for commands whose first argument selects an
// action. Only read-only actions are listed.

const WINDOWS_ARG_RULES: &[(&str, &[&str])] = &[
    ("sc", &["query", "queryex"]),
    ("reg", &["query"]),
    ("netsh", &["wlan", "interface", "advfirewall"]),
    ("wevtutil", &["qe"]),
    ("powercfg", &["/list", "/query", "-list", "-query"]),
    ("sfc", &["/scannow", "/verifyonly"]),
];

const MACOS_ARG_RULES: &[(&str, &[&str])] = &[
    ("diskutil", &["list", "info"]),
    ("launchctl", &["list"]),
    (
        "networksetup",
        &[
            "-listallnetworkservices",
            "-listallhardwareports",
            "-getinfo",
        ],
    ),
    ("scutil", &["--dns", "--nwi", "--get"]),
    ("log", &["show"]),
    ("pmset", &["-g"]),
    ("csrutil", &["status"]),
    ("spctl", &["--status"]),
    ("dscl", &["."]),
    ("top", &["-l"]),
    ("lsof", &["-i"]),
];

const LINUX_ARG_RULES: &[(&str, &[&str])] = &[
    ("systemctl", &["status", "list-units", "list-timers"]),
    ("nmcli", &["device", "connection", "general"]),
    ("ip", &["addr", "link", "route", "-s"]),
    ("top", &["-b", "-n"]),
];

// ── Timeout classes ─────────────────────────────────────────────────

const QUICK_COMMANDS: &[&str] = &[
    "ping", "nslookup", "ipconfig", "ifconfig", "echo", "hostname", "whoami", "uname", "ver",
    "sw_vers", "pwd", "getmac", "arp", "id", "groups", "who", "w", "uptime",
];

const SLOW_COMMANDS: &[&str] = &[
    "systeminfo",
    "system_profiler",
    "sfc",
    "chkdsk",
    "journalctl",
    "dmesg",
    "lshw",
    "wevtutil",
    "tree",
    "du",
    "log",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_platform_aliases() {
        assert_eq!(OsKind::parse("Windows"), Some(OsKind::Windows));
        assert_eq!(OsKind::parse("win32"), Some(OsKind::Windows));
        assert_eq!(OsKind::parse("darwin"), Some(OsKind::MacOs));
        assert_eq!(OsKind::parse("OSX"), Some(OsKind::MacOs));
        assert_eq!(OsKind::parse("linux"), Some(OsKind::Linux));
        assert_eq!(OsKind::parse("freebsd"), None);
        assert_eq!(OsKind::parse(""), None);
    }

    #[test]
    fn lookup_unknown_os_fails() {
        let registry = ProfileRegistry::new();
        let err = registry.lookup("templeos").unwrap_err();
        assert_eq!(err.reason_code(), "unknown_os");
    }

    #[test]
    fn lookup_accepts_declared_aliases() {
        let registry = ProfileRegistry::new();
        assert_eq!(registry.lookup("darwin").unwrap().os(), OsKind::MacOs);
        assert_eq!(registry.lookup("win32").unwrap().os(), OsKind::Windows);
    }

    #[test]
    fn membership_is_whole_token_not_substring() {
        let registry = ProfileRegistry::new();
        let linux = registry.profile(OsKind::Linux);
        assert_eq!(linux.resolve("ping"), Some("ping"));
        assert_eq!(linux.resolve("pingflood"), None);
        assert_eq!(linux.resolve("pin"), None);
    }

    #[test]
    fn aliases_resolve_to_native_names() {
        let registry = ProfileRegistry::new();
        let windows = registry.profile(OsKind::Windows);
        assert_eq!(windows.resolve("traceroute"), Some("tracert"));
        assert_eq!(windows.resolve("ifconfig"), Some("ipconfig"));

        let linux = registry.profile(OsKind::Linux);
        assert_eq!(linux.resolve("ipconfig"), Some("ifconfig"));
    }

    #[test]
    fn arg_rules_allow_read_only_actions() {
        let registry = ProfileRegistry::new();
        let windows = registry.profile(OsKind::Windows);
        assert!(windows.args_permitted("sc", Some("query")));
        assert!(!windows.args_permitted("sc", Some("stop")));
        assert!(!windows.args_permitted("sc", None));

        let linux = registry.profile(OsKind::Linux);
        assert!(linux.args_permitted("systemctl", Some("status")));
        assert!(!linux.args_permitted("systemctl", Some("restart")));
    }

    #[test]
    fn unconstrained_commands_accept_any_args() {
        let registry = ProfileRegistry::new();
        let linux = registry.profile(OsKind::Linux);
        assert!(linux.args_permitted("ping", Some("-c")));
        assert!(linux.args_permitted("ping", None));
    }

    #[test]
    fn timeout_classes_clamp_to_cap() {
        let registry = ProfileRegistry::new();
        let linux = registry.profile(OsKind::Linux);

        assert_eq!(linux.timeout_class("ping"), TimeoutClass::Quick);
        assert_eq!(linux.timeout_class("ps"), TimeoutClass::Medium);
        assert_eq!(linux.timeout_class("journalctl"), TimeoutClass::Slow);

        assert_eq!(TimeoutClass::Quick.effective_secs(30), 10);
        assert_eq!(TimeoutClass::Medium.effective_secs(30), 15);
        assert_eq!(TimeoutClass::Slow.effective_secs(30), 30);
        // A cap below the class value always wins
        assert_eq!(TimeoutClass::Quick.effective_secs(5), 5);
    }

    #[test]
    fn destructive_utilities_are_absent() {
        let registry = ProfileRegistry::new();
        for os in OsKind::ALL {
            let profile = registry.profile(os);
            for cmd in ["rm", "del", "format", "fdisk", "dd", "mkfs", "shutdown"] {
                assert_eq!(profile.resolve(cmd), None, "{cmd} must not be whitelisted on {os}");
            }
        }
    }

    #[test]
    fn command_names_sorted_and_nonempty() {
        let registry = ProfileRegistry::new();
        for os in OsKind::ALL {
            let names = registry.profile(os).command_names();
            assert!(!names.is_empty());
            let mut sorted = names.clone();
            sorted.sort_unstable();
            assert_eq!(names, sorted);
        }
    }
}
