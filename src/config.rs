//! Daemon configuration
//!
//! Read once at startup from `~/.config/hud/config.toml`. Every key is
//! optional; a missing or broken file means defaults.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tiny_skia::Color;

use crate::hud::{AmbientColors, Geometry};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid color '{0}', expected #rrggbb")]
    Color(String),
    #[error("Opacity must be within 0.0..=1.0, got {0}")]
    Opacity(f32),
    #[error("Window size must be within 1..=4096, got {0}")]
    WindowSize(u32),
}

/// Largest accepted window side, in px
pub const MAX_WINDOW_SIZE: u32 = 4096;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Typeface used for every glyph
    pub font_family: String,

    /// Base glyph size in px. Codes below U+F000 are drawn 1.25x larger.
    pub glyph_size: f32,

    /// Width and height of the square window
    pub window_size: u32,

    /// Distance from the top and right screen edges
    pub padding: i32,

    /// Inset of the grid inside the window
    pub margin: f32,

    /// Background opacity
    pub opacity: f32,

    /// Glyph color
    pub foreground: String,

    /// Window background color, drawn at `opacity`
    pub background: String,
}

impl Default for Settings {
    fn default() -> Self {
        let geometry = Geometry::default();
        Self {
            font_family: "Font Awesome 5 Free".to_string(),
            // 24.4pt at 96 dpi
            glyph_size: 32.5,
            window_size: geometry.window_size,
            padding: geometry.padding,
            margin: geometry.margin,
            opacity: 0.66,
            foreground: "#eeeeec".to_string(),
            background: "#353535".to_string(),
        }
    }
}

impl Settings {
    /// Load from `path`, or from the default location when `None`.
    /// Falls back to defaults on any problem.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match config_path() {
                Some(path) => path,
                None => {
                    log::warn!("Could not determine config directory, using defaults");
                    return Self::default();
                }
            },
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) => {
                log::info!("No config file at {}, using defaults", path.display());
                return Self::default();
            }
        };

        match Self::parse(&contents) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("{} ({}), using defaults", e, path.display());
                Self::default()
            }
        }
    }

    /// Parse and validate a TOML document
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(contents)?;
        if !(1..=MAX_WINDOW_SIZE).contains(&settings.window_size) {
            return Err(ConfigError::WindowSize(settings.window_size));
        }
        settings.colors()?;
        Ok(settings)
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            window_size: self.window_size,
            padding: self.padding,
            margin: self.margin,
        }
    }

    /// The two ambient colors, background already at the configured opacity
    pub fn colors(&self) -> Result<AmbientColors, ConfigError> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ConfigError::Opacity(self.opacity));
        }

        let foreground = parse_color(&self.foreground, 1.0)?;
        let background = parse_color(&self.background, self.opacity)?;
        Ok(AmbientColors {
            foreground,
            background,
        })
    }
}

/// Parse `#rrggbb` (the `#` is optional) with the given alpha
pub fn parse_color(value: &str, alpha: f32) -> Result<Color, ConfigError> {
    let err = || ConfigError::Color(value.to_string());
    let hex = value.strip_prefix('#').unwrap_or(value);

    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(err());
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);

    Color::from_rgba(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        alpha,
    )
    .ok_or_else(err)
}

/// Default config file location
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hud").map(|dirs| dirs.config_dir().join("config.toml"))
}
