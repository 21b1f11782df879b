// src/models/theme.rs

use serde::{Deserialize, Serialize};

pub const DEFAULT_THEME_NAME: &str = "EduAssess Default";

/// Names of the palettes the client knows how to render.
pub const THEME_NAMES: [&str; 5] = [
    DEFAULT_THEME_NAME,
    "Ocean Breeze",
    "Forest Whisper",
    "Sunset Glow",
    "Monochrome Matrix",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
    System,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            "system" => Some(ThemeMode::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePreference {
    pub theme: String,
    pub mode: ThemeMode,
}

impl Default for ThemePreference {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME_NAME.to_string(),
            mode: ThemeMode::default(),
        }
    }
}

pub fn is_known_theme(name: &str) -> bool {
    THEME_NAMES.contains(&name)
}
