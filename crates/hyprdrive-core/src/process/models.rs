use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Daemon-side metadata about one spawned child
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub pid: u32,
    /// Program that was executed
    pub command: String,
    /// Template arguments followed by caller arguments
    pub args: Vec<String>,
    pub section: String,
    pub key: String,
    pub start_time: DateTime<Utc>,
    pub log_path: PathBuf,
}

/// Snapshot of a record as handed to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub command: String,
    pub args: Vec<String>,
    pub section: String,
    pub key: String,
    pub start_time: DateTime<Utc>,
    /// Seconds since start, computed when the snapshot was taken
    pub runtime_secs: f64,
    pub log_path: PathBuf,
}

impl ProcessInfo {
    pub fn snapshot(record: &ProcessRecord, now: DateTime<Utc>) -> Self {
        let runtime_secs = (now - record.start_time)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            pid: record.pid,
            command: record.command.clone(),
            args: record.args.clone(),
            section: record.section.clone(),
            key: record.key.clone(),
            start_time: record.start_time,
            runtime_secs,
            log_path: record.log_path.clone(),
        }
    }

    /// Program and arguments joined for display
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record() -> ProcessRecord {
        ProcessRecord {
            pid: 4242,
            command: "firefox".to_string(),
            args: vec!["--new-window".to_string()],
            section: "apps".to_string(),
            key: "browser".to_string(),
            start_time: Utc::now(),
            log_path: PathBuf::from("/tmp/hyprdrive_firefox_0.log"),
        }
    }

    #[test]
    fn test_snapshot_runtime() {
        let record = record();
        let info = ProcessInfo::snapshot(&record, record.start_time + Duration::milliseconds(2500));
        assert!((info.runtime_secs - 2.5).abs() < f64::EPSILON);
        assert_eq!(info.section, "apps");
    }

    #[test]
    fn test_snapshot_clock_skew() {
        let record = record();
        let info = ProcessInfo::snapshot(&record, record.start_time - Duration::seconds(3));
        assert_eq!(info.runtime_secs, 0.0);
    }

    #[test]
    fn test_command_line() {
        let mut info = ProcessInfo::snapshot(&record(), Utc::now());
        assert_eq!(info.command_line(), "firefox --new-window");
        info.args.clear();
        assert_eq!(info.command_line(), "firefox");
    }
}
