use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::KeyCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::system::scheduler::SchedulerOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config directory available on this system")]
    NoConfigDir,
    #[error("config file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThemePreference {
    Light,
    Dark,
    Modern,
    /// Follow the desktop's light/dark preference.
    #[default]
    System,
}

impl ThemePreference {
    pub fn tag(self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
            ThemePreference::Modern => "modern",
            ThemePreference::System => "system",
        }
    }

    pub fn from_tag(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "light" => ThemePreference::Light,
            "dark" => ThemePreference::Dark,
            "modern" => ThemePreference::Modern,
            _ => ThemePreference::System,
        }
    }

    pub fn next(self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Modern,
            ThemePreference::Modern => ThemePreference::System,
            ThemePreference::System => ThemePreference::Light,
        }
    }
}

impl From<String> for ThemePreference {
    fn from(s: String) -> Self {
        ThemePreference::from_tag(&s)
    }
}

impl From<ThemePreference> for String {
    fn from(theme: ThemePreference) -> Self {
        theme.tag().to_string()
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub theme: ThemePreference,
    pub general: GeneralConfig,
    pub keybinds: KeybindsConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub refresh_rate_ms: u64,
    pub sample_timeout_ms: u64,
    pub failure_threshold: u32,
    /// Largest processes to keep per snapshot; 0 keeps all.
    pub max_rows: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            refresh_rate_ms: 500,
            sample_timeout_ms: 2000,
            failure_threshold: 3,
            max_rows: 0,
        }
    }
}

impl GeneralConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_rate_ms)
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            interval: self.refresh_interval(),
            sample_timeout: Duration::from_millis(self.sample_timeout_ms),
            failure_threshold: self.failure_threshold,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct KeybindsConfig {
    pub quit: String,
    pub terminate: String,
    pub force_terminate: String,
    pub toggle_select: String,
    pub select_all: String,
    pub cycle_theme: String,
    pub pause: String,
    pub refresh: String,
    pub help: String,
}

impl Default for KeybindsConfig {
    fn default() -> Self {
        KeybindsConfig {
            quit: "q".to_string(),
            terminate: "k".to_string(),
            force_terminate: "K".to_string(),
            toggle_select: "Space".to_string(),
            select_all: "a".to_string(),
            cycle_theme: "t".to_string(),
            pause: "p".to_string(),
            refresh: "r".to_string(),
            help: "?".to_string(),
        }
    }
}

pub fn parse_key(s: &str) -> Option<KeyCode> {
    match s {
        "Space" | "space" => Some(KeyCode::Char(' ')),
        "Enter" | "enter" => Some(KeyCode::Enter),
        "Esc" | "Escape" | "esc" | "escape" => Some(KeyCode::Esc),
        "Tab" | "tab" => Some(KeyCode::Tab),
        "Backspace" | "backspace" => Some(KeyCode::Backspace),
        "Delete" | "Del" | "delete" | "del" => Some(KeyCode::Delete),
        _ => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(KeyCode::Char(c)),
                _ => None,
            }
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ramtop").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), %err, "ignoring unparsable config");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

/// Persists the theme, leaving every other key in the file untouched.
pub fn save_theme(path: &Path, theme: ThemePreference) -> Result<(), ConfigError> {
    let mut table = match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<toml::Table>(&contents)?,
        Err(e) if e.kind() == ErrorKind::NotFound => toml::Table::new(),
        Err(e) => return Err(e.into()),
    };
    table.insert(
        "theme".to_string(),
        toml::Value::String(theme.tag().to_string()),
    );

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(&table)?)?;
    Ok(())
}
