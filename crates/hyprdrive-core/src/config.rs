use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

/// Literal value that disables an action without removing it from the file
pub const DISABLED_SENTINEL: &str = "none";

/// Settings for the daemon process and the client connecting to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Unix socket the daemon listens on
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Upper bound for one client round trip in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Directory receiving per-process output logs
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Explicit action file, bypasses the search path when set
    #[serde(default)]
    pub actions_path: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            timeout_secs: default_timeout(),
            log_dir: default_log_dir(),
            log_level: default_log_level(),
            actions_path: None,
        }
    }
}

fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("hyprdrive.sock")
}

fn default_timeout() -> u64 {
    5
}

fn default_log_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Base directory for user configuration, always `~/.config`
fn user_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl DaemonConfig {
    /// Load settings from the default location or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            crate::Error::Config(format!("{}: {}", path.display(), e))
        })
    }

    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        user_config_dir().join("hyprdrive").join("daemon.toml")
    }

    /// Get the Unix socket path for IPC (with tilde expansion)
    pub fn socket_path(&self) -> PathBuf {
        expand_tilde(&self.socket_path)
    }

    /// Get the per-process log directory (with tilde expansion)
    pub fn log_dir(&self) -> PathBuf {
        expand_tilde(&self.log_dir)
    }

    pub fn actions_path(&self) -> Option<PathBuf> {
        self.actions_path.as_deref().map(expand_tilde)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A configured command: either a template split on whitespace, or an
/// explicit argument vector used as-is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionEntry {
    Template(String),
    Argv(Vec<String>),
}

impl ActionEntry {
    /// Whether the entry is the `"none"` sentinel
    pub fn is_disabled(&self) -> bool {
        match self {
            ActionEntry::Template(s) => s.trim().eq_ignore_ascii_case(DISABLED_SENTINEL),
            ActionEntry::Argv(_) => false,
        }
    }

    /// Command tokens, program first
    pub fn tokens(&self) -> Vec<String> {
        match self {
            ActionEntry::Template(s) => s.split_whitespace().map(str::to_string).collect(),
            ActionEntry::Argv(argv) => argv.clone(),
        }
    }
}

/// Lowercase a section or key name and fold hyphens into underscores
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}

/// Named command templates grouped into sections (`apps`, `actions`,
/// `components`, or anything else the user adds)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub sections: BTreeMap<String, BTreeMap<String, ActionEntry>>,
}

/// On-disk layout, everything lives under a top-level `[hyprland]` table
#[derive(Debug, Deserialize)]
struct ActionFile {
    hyprland: Option<BTreeMap<String, toml::Value>>,
}

impl ActionConfig {
    /// Candidate action files in priority order
    pub fn search_paths() -> Vec<PathBuf> {
        let config_dir = user_config_dir();
        vec![
            config_dir.join("hyprdrive.toml"),
            config_dir.join("hyprdrive").join("actions.toml"),
            PathBuf::from("hyprdrive.toml"),
        ]
    }

    /// First existing file on the search path
    pub fn locate() -> Option<PathBuf> {
        Self::locate_in(&Self::search_paths())
    }

    pub fn locate_in(paths: &[PathBuf]) -> Option<PathBuf> {
        paths.iter().find(|p| p.is_file()).cloned()
    }

    /// Read and parse an action file
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let file: ActionFile =
            toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))?;
        let raw = file
            .hyprland
            .ok_or_else(|| crate::Error::Config("missing [hyprland] table".to_string()))?;

        let mut sections: BTreeMap<String, BTreeMap<String, ActionEntry>> = BTreeMap::new();
        for (section_name, value) in raw {
            if !value.is_table() {
                warn!(
                    "Ignoring '{}' under [hyprland]: expected a table of actions, found a {}",
                    section_name,
                    value.type_str()
                );
                continue;
            }
            let entries: BTreeMap<String, ActionEntry> = value.try_into().map_err(|e| {
                crate::Error::Config(format!("section '{}': {}", section_name, e))
            })?;

            let section = sections.entry(normalize_name(&section_name)).or_default();
            for (key, entry) in entries {
                let key = normalize_name(&key);
                if section.insert(key.clone(), entry).is_some() {
                    warn!(
                        "Duplicate action '{}' in section '{}' after normalization, keeping the last one",
                        key, section_name
                    );
                }
            }
        }

        Ok(Self { sections })
    }

    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, ActionEntry>> {
        self.sections.get(name)
    }

    /// Total number of configured actions across all sections
    pub fn action_count(&self) -> usize {
        self.sections.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[hyprland.apps]
browser = "firefox"
file-manager = "thunar --daemon"
music = "none"

[hyprland.actions]
Volume-Up = "wpctl set-volume @DEFAULT_AUDIO_SINK@ 5%+"

[hyprland.components]
xdg_portal = ["/usr/lib/xdg-desktop-portal-hyprland", "--verbose"]
"#;

    #[test]
    fn test_parse_sections_and_normalize_keys() {
        let config = ActionConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.sections.len(), 3);

        let apps = config.section("apps").unwrap();
        assert!(apps.contains_key("file_manager"));
        assert!(!apps.contains_key("file-manager"));

        let actions = config.section("actions").unwrap();
        assert!(actions.contains_key("volume_up"));
        assert_eq!(config.action_count(), 5);
    }

    #[test]
    fn test_entry_tokens() {
        let config = ActionConfig::from_toml_str(SAMPLE).unwrap();
        let apps = config.section("apps").unwrap();
        assert_eq!(apps["file_manager"].tokens(), vec!["thunar", "--daemon"]);

        let portal = &config.section("components").unwrap()["xdg_portal"];
        assert_eq!(
            portal.tokens(),
            vec!["/usr/lib/xdg-desktop-portal-hyprland", "--verbose"]
        );
    }

    #[test]
    fn test_disabled_sentinel() {
        assert!(ActionEntry::Template("none".into()).is_disabled());
        assert!(ActionEntry::Template(" NONE ".into()).is_disabled());
        assert!(!ActionEntry::Template("nonesuch".into()).is_disabled());
        assert!(!ActionEntry::Argv(vec!["none".into()]).is_disabled());
    }

    #[test]
    fn test_missing_hyprland_table() {
        let err = ActionConfig::from_toml_str("[apps]\nbrowser = \"firefox\"\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_non_table_values_are_skipped() {
        let config = ActionConfig::from_toml_str(
            "[hyprland]\nversion = 1\ntheme = \"dark\"\n\n[hyprland.apps]\nbrowser = \"firefox\"\n",
        )
        .unwrap();
        assert!(config.section("version").is_none());
        assert!(config.section("theme").is_none());
        assert_eq!(config.action_count(), 1);
    }

    #[test]
    fn test_bad_entry_inside_section() {
        let err =
            ActionConfig::from_toml_str("[hyprland.apps]\nbrowser = 42\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = ActionConfig::from_toml_str("[hyprland.apps\nbrowser = ").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_locate_first_existing() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        let local = dir.path().join("local.toml");
        std::fs::write(&local, SAMPLE).unwrap();

        let paths = vec![user.clone(), local.clone()];
        assert_eq!(ActionConfig::locate_in(&paths), Some(local.clone()));

        std::fs::write(&user, SAMPLE).unwrap();
        assert_eq!(ActionConfig::locate_in(&paths), Some(user));
    }

    #[test]
    fn test_locate_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![dir.path().join("a.toml"), dir.path().join("b.toml")];
        assert_eq!(ActionConfig::locate_in(&paths), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = ActionConfig::load_from(file.path()).unwrap();
        assert!(config.section("apps").is_some());
    }

    #[test]
    fn test_daemon_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.log_level, "info");
        assert!(config.socket_path().ends_with("hyprdrive.sock"));
        assert!(config.actions_path().is_none());
    }

    #[test]
    fn test_daemon_config_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"timeout_secs = 2\nsocket_path = \"/tmp/hd-test.sock\"\n")
            .unwrap();
        let config = DaemonConfig::load_from(file.path()).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert_eq!(config.socket_path(), PathBuf::from("/tmp/hd-test.sock"));
        assert_eq!(config.log_level, "info");
    }
}
