use crate::config::{normalize_name, ActionConfig};

/// Result of looking up `(section, key)` in the action configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Command tokens, program first
    Command(Vec<String>),
    /// The action exists but is set to `"none"`
    Disabled,
    /// Unknown section or unknown key
    NotFound,
}

/// Map a section/key pair to a command template.
///
/// Names are compared after [`normalize_name`], so `Volume-Up` finds
/// `volume_up`.
pub fn resolve(config: &ActionConfig, section: &str, key: &str) -> Resolution {
    let Some(entries) = config.section(&normalize_name(section)) else {
        return Resolution::NotFound;
    };
    let Some(entry) = entries.get(&normalize_name(key)) else {
        return Resolution::NotFound;
    };

    if entry.is_disabled() {
        return Resolution::Disabled;
    }

    let tokens = entry.tokens();
    if tokens.is_empty() {
        // An empty string has nothing to run
        return Resolution::NotFound;
    }
    Resolution::Command(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ActionConfig {
        ActionConfig::from_toml_str(
            r#"
[hyprland.apps]
browser = "firefox --new-window"
music = "none"
blank = "   "

[hyprland.actions]
volume_up = "wpctl set-volume @DEFAULT_AUDIO_SINK@ 5%+"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_command() {
        assert_eq!(
            resolve(&config(), "apps", "browser"),
            Resolution::Command(vec!["firefox".into(), "--new-window".into()])
        );
    }

    #[test]
    fn test_resolve_normalizes_names() {
        let config = config();
        assert!(matches!(
            resolve(&config, "Actions", "volume-up"),
            Resolution::Command(_)
        ));
        assert!(matches!(
            resolve(&config, "ACTIONS", "VOLUME_UP"),
            Resolution::Command(_)
        ));
    }

    #[test]
    fn test_resolve_disabled() {
        assert_eq!(resolve(&config(), "apps", "music"), Resolution::Disabled);
    }

    #[test]
    fn test_resolve_unknown_section_and_key() {
        let config = config();
        assert_eq!(resolve(&config, "widgets", "browser"), Resolution::NotFound);
        assert_eq!(resolve(&config, "apps", "editor"), Resolution::NotFound);
        assert_eq!(resolve(&config, "apps", "blank"), Resolution::NotFound);
    }

    #[test]
    fn test_resolve_empty_config() {
        let config = ActionConfig::default();
        assert_eq!(resolve(&config, "apps", "browser"), Resolution::NotFound);
    }
}
