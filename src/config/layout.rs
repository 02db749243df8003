//! Remote-control layout
//!
//! Loaded from `remotely.toml`. A missing file yields the default layout,
//! whose buttons are the commands understood by the video installation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::ui::{CommandButton, StatusPalette, BUTTON_SUFFIX};

/// Configuration file name
pub const CONFIG_FILE: &str = "remotely.toml";

/// Page used when none is configured
pub const DEFAULT_PAGE: &str = "http://localhost:9092/";

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Remote-control configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    /// Location of the page; the websocket endpoint is derived from it
    #[serde(default = "default_page")]
    pub page: String,
    /// Status indicator colours
    #[serde(default)]
    pub status: StatusPalette,
    /// Command buttons, in display order
    #[serde(default = "default_buttons", rename = "button")]
    pub buttons: Vec<CommandButton>,
}

fn default_page() -> String {
    DEFAULT_PAGE.to_string()
}

/// Buttons for every command the installation handles
pub fn default_buttons() -> Vec<CommandButton> {
    [
        ("toggleHud", "Toggle HUD", 'h'),
        ("toggleMirrored", "Toggle mirror", 'm'),
        ("toggleMask", "Toggle mask", 't'),
        ("toggleInset", "Toggle inset", 'i'),
        ("toggleAutoAdvance", "Toggle auto-advance", 'a'),
        ("saveFrame", "Save frame", 'r'),
        ("prevMask", "Previous mask", 'b'),
        ("nextMask", "Next mask", 'n'),
        ("decDuration", "Shorter duration", '['),
        ("incDuration", "Longer duration", ']'),
    ]
    .into_iter()
    .map(|(command, label, key)| {
        CommandButton::new(format!("{}{}", command, BUTTON_SUFFIX))
            .with_label(label)
            .with_key(key)
    })
    .collect()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            page: default_page(),
            status: StatusPalette::default(),
            buttons: default_buttons(),
        }
    }
}

impl RemoteConfig {
    /// Load configuration from a file, falling back to defaults if it is missing
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RemoteConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check button ids and shortcut keys
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        let mut keys = HashSet::new();

        for button in &self.buttons {
            if !button.id.ends_with(BUTTON_SUFFIX) {
                return Err(ConfigError::Invalid(format!(
                    "button id '{}' must end with '{}'",
                    button.id, BUTTON_SUFFIX
                )));
            }
            if !ids.insert(button.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate button id '{}'", button.id)));
            }
            if let Some(key) = button.key {
                if !keys.insert(key) {
                    return Err(ConfigError::Invalid(format!("duplicate shortcut key '{}'", key)));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::Rgb;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = RemoteConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, RemoteConfig::default());
        assert_eq!(config.page, DEFAULT_PAGE);
    }

    #[test]
    fn test_default_buttons_are_valid() {
        let config = RemoteConfig::default();
        config.validate().unwrap();
        assert_eq!(config.buttons.len(), 10);

        let commands: Vec<String> = config
            .buttons
            .iter()
            .map(|b| b.command().into_string())
            .collect();
        assert!(commands.contains(&"toggleAutoAdvance".to_string()));
        assert!(commands.contains(&"decDuration".to_string()));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r##"
page = "http://192.168.1.20:9092/"

[status]
open = "#00ff00"

[[button]]
id = "nextMaskButton"
label = "Next"
key = "n"

[[button]]
id = "saveFrameButton"
"##,
        )
        .unwrap();

        let config = RemoteConfig::load(&path).unwrap();
        assert_eq!(config.page, "http://192.168.1.20:9092/");
        assert_eq!(config.status.open, Rgb::new(0, 0xff, 0));
        assert_eq!(config.status.closed, Rgb::CLOSED_RED);
        assert_eq!(config.buttons.len(), 2);
        assert_eq!(config.buttons[0].key, Some('n'));
        assert_eq!(config.buttons[1].label, None);
    }

    #[test]
    fn test_buttons_default_when_omitted() {
        let config = RemoteConfig::from_toml(r#"page = "http://example.com/""#).unwrap();
        assert_eq!(config.buttons, default_buttons());
    }

    #[test]
    fn test_rejects_id_without_suffix() {
        let result = RemoteConfig::from_toml("[[button]]\nid = \"nextMask\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_duplicates() {
        let ids = "[[button]]\nid = \"aButton\"\n[[button]]\nid = \"aButton\"\n";
        assert!(matches!(RemoteConfig::from_toml(ids), Err(ConfigError::Invalid(_))));

        let keys = "[[button]]\nid = \"aButton\"\nkey = \"x\"\n[[button]]\nid = \"bButton\"\nkey = \"x\"\n";
        assert!(matches!(RemoteConfig::from_toml(keys), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_colour() {
        let result = RemoteConfig::from_toml("[status]\nclosed = \"red\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
