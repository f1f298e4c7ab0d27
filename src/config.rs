//! Configuration management for VoxCast
//! Handles saving/loading conversion settings

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_CAPACITY;
use crate::constants::LAME_DEFAULT_QUALITY;
use crate::pcm::PcmDefaults;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MP3 bitrate (kbps)
    pub bitrate: u32,
    /// LAME quality, 0 (best) to 9 (fastest)
    pub quality: u8,
    /// Channel count assumed for headerless PCM
    pub default_channels: u16,
    /// Sample rate assumed for headerless PCM
    pub default_sample_rate: u32,
    /// Maximum number of cached media entries
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bitrate: 128,
            quality: LAME_DEFAULT_QUALITY,
            default_channels: 1,
            default_sample_rate: 24000,
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "voxcast", "VoxCast").map(|dirs| {
            let config_dir = dirs.config_dir();
            config_dir.join("config.json")
        })
    }

    /// Load configuration from the user config directory, or defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if let Some(config) = Self::load_from(&path) {
                return config;
            }
        }
        log::info!("Using default configuration");
        Self::default()
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(config) => {
                log::info!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Ignoring invalid config {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the user config directory
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        log::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn pcm_defaults(&self) -> PcmDefaults {
        PcmDefaults {
            channels: self.default_channels,
            sample_rate: self.default_sample_rate,
        }
    }
}
