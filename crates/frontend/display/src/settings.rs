use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::BackendKind;

/// Texture sampling used when the GPU scales the emulated screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Preserve the source aspect ratio when scaling
    #[serde(default = "default_true")]
    pub keep_aspect_ratio: bool,
    /// Additionally honor the emulated pixel's non-square shape
    #[serde(default)]
    pub true_aspect_ratio: bool,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub texture_filter: TextureFilter,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            keep_aspect_ratio: true,
            true_aspect_ratio: false,
            backend: BackendKind::Software,
            texture_filter: TextureFilter::Nearest,
        }
    }
}

impl VideoSettings {
    /// Get the config file path relative to the executable
    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("display.json");
        path
    }

    /// Load settings from the default config path, falling back to defaults on error
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`, falling back to defaults on error
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log(LogCategory::Canvas, LogLevel::Warn, || {
                        format!(
                            "Failed to parse {}: {}. Using defaults.",
                            path.display(),
                            e
                        )
                    });
                    Self::default()
                }
            },
            // Missing file is the normal first-run case.
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
