//! Daemon state shared by every IPC connection
//!
//! Owns the loaded action configuration and the process table. Each public
//! method returns a tagged outcome; a bad request never turns into an error
//! that could take the daemon down.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::action::{self, Resolution, Verdict};
use crate::config::{normalize_name, ActionConfig, DaemonConfig};
use crate::process::{KillError, ProcessInfo, ProcessTable};

/// Where action configuration comes from
#[derive(Debug, Clone)]
pub enum ActionSource {
    /// A fixed file, as given by `actions_path` or `--actions`
    File(PathBuf),
    /// First existing file among these candidates
    Search(Vec<PathBuf>),
}

impl ActionSource {
    pub fn from_config(config: &DaemonConfig) -> Self {
        match config.actions_path() {
            Some(path) => ActionSource::File(path),
            None => ActionSource::Search(ActionConfig::search_paths()),
        }
    }

    /// Resolve the file to read and parse it
    fn load(&self) -> (Option<PathBuf>, crate::Result<ActionConfig>) {
        let path = match self {
            ActionSource::File(path) => path.clone(),
            ActionSource::Search(paths) => match ActionConfig::locate_in(paths) {
                Some(path) => path,
                None => {
                    let searched: Vec<String> =
                        paths.iter().map(|p| p.display().to_string()).collect();
                    return (
                        None,
                        Err(crate::Error::Config(format!(
                            "no action configuration found (searched: {})",
                            searched.join(", ")
                        ))),
                    );
                }
            },
        };

        let result = ActionConfig::load_from(&path);
        (Some(path), result)
    }
}

#[derive(Debug)]
struct LoadedActions {
    config: Option<ActionConfig>,
    path: Option<PathBuf>,
    error: Option<String>,
}

/// Result of `perform_action`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Started { section: String, key: String, pid: u32 },
    NotConfigured,
    NotFound { section: String, key: String },
    Disabled { section: String, key: String },
    Denied { section: String, key: String, command: String, matched: String },
    LaunchFailed { section: String, key: String, error: String },
}

impl ActionOutcome {
    pub fn pid(&self) -> Option<u32> {
        match self {
            ActionOutcome::Started { pid, .. } => Some(*pid),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ActionOutcome::Started { key, pid, .. } => {
                format!("Action '{}' started (PID: {})", key, pid)
            }
            ActionOutcome::NotConfigured => {
                "Configuration not loaded. Check the daemon log, then run `hyprdrive reload`."
                    .to_string()
            }
            ActionOutcome::NotFound { section, key } => {
                format!("Action '{}' not found in section '{}'.", key, section)
            }
            ActionOutcome::Disabled { key, .. } => {
                format!("Action '{}' is configured as 'none'.", key)
            }
            ActionOutcome::Denied { command, .. } => {
                format!("Command '{}' is blacklisted and cannot be executed.", command)
            }
            ActionOutcome::LaunchFailed { key, error, .. } => {
                format!("Error executing action '{}': {}", key, error)
            }
        }
    }
}

/// Result of `kill_process`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KillOutcome {
    Terminated { pid: u32, forced: bool },
    NotTracked { pid: u32 },
    Failed { pid: u32, error: String },
}

impl KillOutcome {
    pub fn message(&self) -> String {
        match self {
            KillOutcome::Terminated { pid, forced: false } => format!("Process {} terminated", pid),
            KillOutcome::Terminated { pid, forced: true } => {
                format!("Process {} killed (did not exit after SIGTERM)", pid)
            }
            KillOutcome::NotTracked { pid } => format!("Process {} not found", pid),
            KillOutcome::Failed { pid, error } => {
                format!("Error terminating process {}: {}", pid, error)
            }
        }
    }
}

/// Result of `reload_config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReloadOutcome {
    Reloaded { path: PathBuf, actions: usize },
    Failed { error: String },
}

impl ReloadOutcome {
    pub fn message(&self) -> String {
        match self {
            ReloadOutcome::Reloaded { path, actions } => format!(
                "Configuration reloaded from {} ({} actions)",
                path.display(),
                actions
            ),
            ReloadOutcome::Failed { error } => format!(
                "Failed to reload configuration, actions are disabled until the next reload: {}",
                error
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub uptime_secs: u64,
    pub processes: usize,
    pub config_loaded: bool,
    pub config_path: Option<PathBuf>,
    pub config_error: Option<String>,
}

pub struct DaemonService {
    source: ActionSource,
    actions: RwLock<LoadedActions>,
    processes: ProcessTable,
    start_time: Instant,
}

impl DaemonService {
    /// Create the service and perform the initial configuration load.
    ///
    /// A missing or broken action file is logged, not returned: the daemon
    /// keeps running and answers every action with `NotConfigured`.
    pub fn new(source: ActionSource, processes: ProcessTable) -> Self {
        let (path, result) = source.load();
        let loaded = match result {
            Ok(config) => {
                info!(
                    "Loaded {} actions from {}",
                    config.action_count(),
                    path.as_deref().map(|p| p.display().to_string()).unwrap_or_default()
                );
                LoadedActions {
                    config: Some(config),
                    path,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Failed to load action configuration: {}", e);
                LoadedActions {
                    config: None,
                    path,
                    error: Some(e.to_string()),
                }
            }
        };

        Self {
            source,
            actions: RwLock::new(loaded),
            processes,
            start_time: Instant::now(),
        }
    }

    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(
            ActionSource::from_config(config),
            ProcessTable::new(config.log_dir()),
        )
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// Resolve, screen and launch `section`/`key` with extra `args`
    pub async fn perform_action(&self, section: &str, key: &str, args: &[String]) -> ActionOutcome {
        let section = normalize_name(section);
        let key = normalize_name(key);

        let resolution = {
            let actions = self.actions.read().await;
            let Some(config) = actions.config.as_ref() else {
                return ActionOutcome::NotConfigured;
            };
            action::resolve(config, &section, &key)
        };

        let template = match resolution {
            Resolution::Command(tokens) => tokens,
            Resolution::NotFound => return ActionOutcome::NotFound { section, key },
            Resolution::Disabled => return ActionOutcome::Disabled { section, key },
        };

        let command_line = template
            .iter()
            .chain(args.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        info!("Action '{}' in section '{}' -> '{}'", key, section, command_line);

        if let Verdict::Deny(matched) = action::check(&command_line) {
            warn!(
                "Refusing blacklisted command '{}' from section '{}', key '{}' (matched '{}')",
                command_line, section, key, matched
            );
            return ActionOutcome::Denied {
                section,
                key,
                command: command_line,
                matched: matched.to_string(),
            };
        }

        match self.processes.launch(&section, &key, &template, args).await {
            Ok(pid) => ActionOutcome::Started { section, key, pid },
            Err(e) => {
                warn!("Failed to launch action '{}': {}", key, e);
                ActionOutcome::LaunchFailed {
                    section,
                    key,
                    error: e.to_string(),
                }
            }
        }
    }

    pub async fn list_processes(&self) -> Vec<ProcessInfo> {
        self.processes.list().await
    }

    pub async fn kill_process(&self, pid: u32) -> KillOutcome {
        match self.processes.kill(pid).await {
            Ok(forced) => KillOutcome::Terminated { pid, forced },
            Err(KillError::NotTracked(pid)) => KillOutcome::NotTracked { pid },
            Err(e) => KillOutcome::Failed {
                pid,
                error: e.to_string(),
            },
        }
    }

    /// Re-read the action file. On failure no configuration is active and
    /// every action answers `NotConfigured` until the next successful reload.
    pub async fn reload_config(&self) -> ReloadOutcome {
        let (path, result) = self.source.load();
        let mut actions = self.actions.write().await;

        match result {
            Ok(config) => {
                let count = config.action_count();
                info!("Reloaded {} actions", count);
                actions.config = Some(config);
                actions.path = path.clone();
                actions.error = None;
                ReloadOutcome::Reloaded {
                    path: path.unwrap_or_default(),
                    actions: count,
                }
            }
            Err(e) => {
                warn!("Failed to reload action configuration: {}", e);
                actions.config = None;
                actions.path = path;
                actions.error = Some(e.to_string());
                ReloadOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    pub async fn status(&self) -> StatusResponse {
        let actions = self.actions.read().await;
        StatusResponse {
            running: true,
            uptime_secs: self.start_time.elapsed().as_secs(),
            processes: self.processes.len().await,
            config_loaded: actions.config.is_some(),
            config_path: actions.path.clone(),
            config_error: actions.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        config_path: PathBuf,
        service: DaemonService,
    }

    fn fixture(actions: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("hyprdrive.toml");
        std::fs::write(&config_path, actions).unwrap();
        let service = DaemonService::new(
            ActionSource::File(config_path.clone()),
            ProcessTable::new(dir.path().join("logs")),
        );
        Fixture {
            _dir: dir,
            config_path,
            service,
        }
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_started_action_is_listed() {
        let fx = fixture("[hyprland.apps]\nbrowser = \"sleep 30\"\n");

        let outcome = fx.service.perform_action("apps", "browser", &[]).await;
        let pid = outcome.pid().expect("action should start");
        assert!(outcome.message().contains(&pid.to_string()));

        let processes = fx.service.list_processes().await;
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].pid, pid);
        assert_eq!(processes[0].section, "apps");
        assert_eq!(processes[0].key, "browser");

        let killed = fx.service.kill_process(pid).await;
        assert_eq!(killed, KillOutcome::Terminated { pid, forced: false });
        assert!(fx.service.list_processes().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_section_and_key() {
        let fx = fixture("[hyprland.apps]\nbrowser = \"sleep 30\"\n");

        let outcome = fx.service.perform_action("widgets", "clock", &[]).await;
        assert!(matches!(outcome, ActionOutcome::NotFound { .. }));

        let outcome = fx.service.perform_action("apps", "editor", &[]).await;
        assert_eq!(
            outcome,
            ActionOutcome::NotFound {
                section: "apps".to_string(),
                key: "editor".to_string()
            }
        );
        assert!(fx.service.processes().is_empty().await);
    }

    #[tokio::test]
    async fn test_blacklisted_command_is_denied() {
        let fx = fixture("[hyprland.actions]\ndanger = \"sudo rm -rf /\"\n");

        let outcome = fx.service.perform_action("actions", "danger", &[]).await;
        assert!(matches!(outcome, ActionOutcome::Denied { .. }));
        assert!(outcome.message().contains("blacklisted"));
        assert!(fx.service.processes().is_empty().await);
    }

    #[tokio::test]
    async fn test_blacklist_covers_caller_args() {
        let fx = fixture("[hyprland.apps]\nterminal = \"sleep\"\n");

        let outcome = fx
            .service
            .perform_action("apps", "terminal", &args(&["30", "sudo"]))
            .await;
        assert!(matches!(outcome, ActionOutcome::Denied { .. }));
        assert!(fx.service.processes().is_empty().await);
    }

    #[tokio::test]
    async fn test_disabled_action() {
        let fx = fixture("[hyprland.apps]\nmusic = \"none\"\n");

        let outcome = fx.service.perform_action("apps", "music", &[]).await;
        assert!(matches!(outcome, ActionOutcome::Disabled { .. }));
        assert!(outcome.pid().is_none());
    }

    #[tokio::test]
    async fn test_kebab_case_names() {
        let fx = fixture("[hyprland.actions]\nvolume_up = \"sleep 30\"\n");

        let outcome = fx.service.perform_action("actions", "volume-up", &[]).await;
        let pid = outcome.pid().expect("action should start");
        assert_eq!(fx.service.list_processes().await[0].key, "volume_up");
        fx.service.kill_process(pid).await;
    }

    #[tokio::test]
    async fn test_caller_args_are_appended() {
        let fx = fixture("[hyprland.apps]\nsleeper = \"sleep\"\n");

        let outcome = fx
            .service
            .perform_action("apps", "sleeper", &args(&["30"]))
            .await;
        let pid = outcome.pid().expect("action should start");
        assert_eq!(fx.service.list_processes().await[0].args, args(&["30"]));
        fx.service.kill_process(pid).await;
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let fx = fixture("[hyprland.apps]\nghost = \"hyprdrive-no-such-program\"\n");

        let outcome = fx.service.perform_action("apps", "ghost", &[]).await;
        assert!(matches!(outcome, ActionOutcome::LaunchFailed { .. }));
        assert!(fx.service.processes().is_empty().await);
    }

    #[tokio::test]
    async fn test_no_config_file_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        let service = DaemonService::new(
            ActionSource::Search(vec![dir.path().join("a.toml"), dir.path().join("b.toml")]),
            ProcessTable::new(dir.path().to_path_buf()),
        );

        let outcome = service.perform_action("apps", "browser", &[]).await;
        assert_eq!(outcome, ActionOutcome::NotConfigured);

        let status = service.status().await;
        assert!(status.running);
        assert!(!status.config_loaded);
        assert!(status.config_error.is_some());
    }

    #[tokio::test]
    async fn test_kill_untracked_pid() {
        let fx = fixture("[hyprland.apps]\nbrowser = \"sleep 30\"\n");
        let pid = fx
            .service
            .perform_action("apps", "browser", &[])
            .await
            .pid()
            .unwrap();

        let outcome = fx.service.kill_process(1).await;
        assert_eq!(outcome, KillOutcome::NotTracked { pid: 1 });
        assert_eq!(fx.service.list_processes().await.len(), 1);

        fx.service.kill_process(pid).await;
    }

    #[tokio::test]
    async fn test_reload_picks_up_changes() {
        let fx = fixture("[hyprland.apps]\nbrowser = \"sleep 30\"\n");

        std::fs::write(
            &fx.config_path,
            "[hyprland.apps]\nbrowser = \"none\"\neditor = \"sleep 30\"\n",
        )
        .unwrap();

        let outcome = fx.service.reload_config().await;
        assert_eq!(
            outcome,
            ReloadOutcome::Reloaded {
                path: fx.config_path.clone(),
                actions: 2
            }
        );

        let outcome = fx.service.perform_action("apps", "browser", &[]).await;
        assert!(matches!(outcome, ActionOutcome::Disabled { .. }));
    }

    #[tokio::test]
    async fn test_failed_reload_drops_config() {
        let fx = fixture("[hyprland.apps]\nmusic = \"none\"\n");

        std::fs::write(&fx.config_path, "[hyprland.apps\n").unwrap();
        let outcome = fx.service.reload_config().await;
        assert!(matches!(outcome, ReloadOutcome::Failed { .. }));

        let outcome = fx.service.perform_action("apps", "music", &[]).await;
        assert_eq!(outcome, ActionOutcome::NotConfigured);

        let status = fx.service.status().await;
        assert!(!status.config_loaded);
        assert_eq!(status.config_path, Some(fx.config_path.clone()));
        assert!(status.config_error.is_some());

        // A fixed file brings the actions back
        std::fs::write(&fx.config_path, "[hyprland.apps]\nmusic = \"none\"\n").unwrap();
        assert!(matches!(
            fx.service.reload_config().await,
            ReloadOutcome::Reloaded { actions: 1, .. }
        ));
        let outcome = fx.service.perform_action("apps", "music", &[]).await;
        assert!(matches!(outcome, ActionOutcome::Disabled { .. }));
    }

    #[test]
    fn test_outcome_wire_format() {
        let outcome = ActionOutcome::Started {
            section: "apps".to_string(),
            key: "browser".to_string(),
            pid: 42,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "started");
        assert_eq!(json["pid"], 42);

        let back: ActionOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back.pid(), Some(42));
    }
}
