use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::audio::ADSRConfig;
use crate::error::ConfigError;
use crate::timing::KeyRange;

pub const CONFIG_ENV: &str = "PIANOLA_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "pianola.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub octaves: u8,
    /// MIDI note of key 0.
    pub base_note: u8,
    /// Tempo at which imported files play at their written speed.
    pub reference_bpm: u32,
    pub tempo_bpm: u32,
    pub volume: f32,
    pub envelope: ADSRConfig,
    pub trigger_capacity: usize,
    /// Connect to the first MIDI input whose name contains this. `None`
    /// takes the first port, if any.
    pub midi_input: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            octaves: 2,
            base_note: 60,
            reference_bpm: 120,
            tempo_bpm: 120,
            volume: 0.8,
            envelope: ADSRConfig::default(),
            trigger_capacity: 1024,
            midi_input: None,
        }
    }
}

impl Config {
    pub fn key_range(&self) -> KeyRange {
        KeyRange::new(self.base_note, self.octaves)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ron_string = fs::read_to_string(path)?;
        let config: Config = ron::from_str(&ron_string)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    /// A missing file silently yields defaults; a broken one is logged and
    /// also yields defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!(path = %path.display(), "loaded config");
                config
            }
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "falling back to default config");
                Self::default()
            }
        }
    }

    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}
