//! Substring denylist for configured commands
//!
//! This is a tripwire against obviously destructive entries in the action
//! file, not a sandbox. Anything that hides the program name (a wrapper
//! script, `sh -c` with quoting tricks, an alias) gets through, and plain words
//! that happen to contain an entry (`dd` in `hidden`) are rejected.

use std::path::Path;

/// Commands that are never run, compared case-insensitively
pub const BLACKLISTED_COMMANDS: &[&str] = &[
    "rm", "dd", "sudo", "pkexec", "polkit", "mkfs", "fdisk", "parted", "shred", "systemctl",
    "chown", "chmod",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// Carries the denylist entry that matched
    Deny(&'static str),
}

impl Verdict {
    pub fn is_denied(&self) -> bool {
        matches!(self, Verdict::Deny(_))
    }
}

/// Check a full command line against [`BLACKLISTED_COMMANDS`].
///
/// Denies when the program's basename is an entry, or when the lowercased
/// line contains an entry anywhere.
pub fn check(command_line: &str) -> Verdict {
    let normalized = command_line.trim().to_lowercase();
    let Some(first) = normalized.split_whitespace().next() else {
        return Verdict::Allow;
    };

    let program = Path::new(first)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(first);

    if let Some(hit) = BLACKLISTED_COMMANDS
        .iter()
        .copied()
        .find(|entry| *entry == program)
    {
        return Verdict::Deny(hit);
    }

    match BLACKLISTED_COMMANDS
        .iter()
        .copied()
        .find(|entry| normalized.contains(entry))
    {
        Some(hit) => Verdict::Deny(hit),
        None => Verdict::Allow,
    }
}
