use anyhow::{bail, Result};

use hyprdrive_core::DaemonClient;

/// Forward `<section> <key> [args...]` to the daemon.
///
/// Not-found, disabled and denied actions are answers, not failures, and
/// exit with status 0.
pub async fn run(client: &DaemonClient, words: &[String]) -> Result<()> {
    let (section, key, args) = split_words(words)?;

    let outcome = client.perform_action(section, key, args).await?;

    println!("{}", outcome.message());
    if let Some(pid) = outcome.pid() {
        println!("Process ID: {}", pid);
    }

    Ok(())
}

fn split_words(words: &[String]) -> Result<(&str, &str, &[String])> {
    match words {
        [] => bail!("No section specified"),
        [section] => bail!("No key specified for section '{}'", section),
        [section, key, args @ ..] => Ok((section.as_str(), key.as_str(), args)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_words() {
        let input = words(&["apps", "terminal", "-e", "htop"]);
        let (section, key, args) = split_words(&input).unwrap();
        assert_eq!(section, "apps");
        assert_eq!(key, "terminal");
        assert_eq!(args, &words(&["-e", "htop"])[..]);
    }

    #[test]
    fn test_missing_key() {
        let input = words(&["apps"]);
        let err = split_words(&input).unwrap_err();
        assert!(err.to_string().contains("No key specified"));
    }
}
