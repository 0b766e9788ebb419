//! Curated diagnostic presets, grouped by category.
//!
//! Presets are ordinary candidates: `deskgate diagnose` feeds each one
//! through the gatekeeper facade, so they pass the same sanitization,
//! blocklist, and whitelist checks as ad-hoc input. The catalog is kept
//! whitelist-clean by a unit test.

use std::fmt;

use crate::gatekeeper::OsKind;

/// Diagnostic category a preset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Network,
    System,
    Storage,
}

impl Category {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "network" => Some(Category::Network),
            "system" => Some(Category::System),
            "storage" => Some(Category::Storage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Network => "network",
            Category::System => "system",
            Category::Storage => "storage",
        }
    }

    pub const ALL: [Category; 3] = [Category::Network, Category::System, Category::Storage];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-facing risk indication shown before a preset runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
        })
    }
}

/// One named diagnostic command.
pub struct DiagnosticPreset {
    pub name: &'static str,
    pub description: &'static str,
    pub command: &'static str,
    pub category: Category,
    pub risk: RiskLevel,
}

/// All presets for a platform.
pub fn presets_for(os: OsKind) -> &'static [DiagnosticPreset] {
    match os {
        OsKind::Windows => WINDOWS_PRESETS,
        OsKind::MacOs => MACOS_PRESETS,
        OsKind::Linux => LINUX_PRESETS,
    }
}

/// Presets for a platform filtered by category.
pub fn presets_in(os: OsKind, category: Category) -> Vec<&'static DiagnosticPreset> {
    presets_for(os)
        .iter()
        .filter(|p| p.category == category)
        .collect()
}

const WINDOWS_PRESETS: &[DiagnosticPreset] = &[
    DiagnosticPreset {
        name: "Network configuration",
        description: "Current adapters, IP configuration, and DNS servers",
        command: "ipconfig /all",
        category: Category::Network,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "DNS resolution test",
        description: "Resolve a well-known domain",
        command: "nslookup example.com",
        category: Category::Network,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Connectivity test",
        description: "Four echo requests to a public host",
        command: "ping -n 4 google.com",
        category: Category::Network,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "System information",
        description: "OS build, uptime, and hardware summary",
        command: "systeminfo",
        category: Category::System,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Running processes",
        description: "Process list with session details",
        command: "tasklist",
        category: Category::System,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "System file check",
        description: "Verify system file integrity (long-running)",
        command: "sfc /verifyonly",
        category: Category::System,
        risk: RiskLevel::Medium,
    },
    DiagnosticPreset {
        name: "Disk space",
        description: "Capacity and free space per logical disk",
        command: "wmic logicaldisk get size,freespace,caption",
        category: Category::Storage,
        risk: RiskLevel::Low,
    },
];

const MACOS_PRESETS: &[DiagnosticPreset] = &[
    DiagnosticPreset {
        name: "Network configuration",
        description: "Interface addresses and state",
        command: "ifconfig",
        category: Category::Network,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "DNS resolution test",
        description: "Resolve a well-known domain",
        command: "nslookup example.com",
        category: Category::Network,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Connectivity test",
        description: "Four echo requests to a public host",
        command: "ping -c 4 google.com",
        category: Category::Network,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "macOS version",
        description: "Product name, version, and build",
        command: "sw_vers",
        category: Category::System,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Hardware overview",
        description: "Model, CPU, memory, and serial number",
        command: "system_profiler SPHardwareDataType",
        category: Category::System,
        risk: RiskLevel::Medium,
    },
    DiagnosticPreset {
        name: "Disk usage",
        description: "Mounted volumes with free space",
        command: "df -h",
        category: Category::Storage,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Disk layout",
        description: "Physical disks and partitions",
        command: "diskutil list",
        category: Category::Storage,
        risk: RiskLevel::Low,
    },
];

const LINUX_PRESETS: &[DiagnosticPreset] = &[
    DiagnosticPreset {
        name: "Network configuration",
        description: "Interface addresses and state",
        command: "ifconfig",
        category: Category::Network,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "DNS resolution test",
        description: "Resolve a well-known domain",
        command: "nslookup example.com",
        category: Category::Network,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Connectivity test",
        description: "Four echo requests to a public host",
        command: "ping -c 4 google.com",
        category: Category::Network,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Kernel and architecture",
        description: "Kernel release and machine type",
        command: "uname -a",
        category: Category::System,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Running processes",
        description: "Full process list",
        command: "ps aux",
        category: Category::System,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Memory usage",
        description: "Free and used memory",
        command: "free -h",
        category: Category::System,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Disk usage",
        description: "Mounted filesystems with free space",
        command: "df -h",
        category: Category::Storage,
        risk: RiskLevel::Low,
    },
    DiagnosticPreset {
        name: "Log volume",
        description: "Disk consumed by system logs",
        command: "du -sh /var/log",
        category: Category::Storage,
        risk: RiskLevel::Low,
    },
];
