use std::fs;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

const SETTINGS_FILE_NAME: &str = ".flac_converter_settings.json";

/// The two remembered directories. An empty `output_directory` means
/// "write next to each source file".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub last_directory: String,
    #[serde(default)]
    pub output_directory: String,
}

impl Settings {
    pub fn input_dir(&self) -> Option<PathBuf> {
        non_empty(&self.last_directory)
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        non_empty(&self.output_directory)
    }
}

fn non_empty(s: &str) -> Option<PathBuf> {
    match s.is_empty() {
        true => None,
        false => Some(PathBuf::from(s)),
    }
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        SettingsStore { path }
    }

    /// `~/.flac_converter_settings.json`, or the working directory if there is no home.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SETTINGS_FILE_NAME)
    }

    /// Never fails; anything unreadable yields defaults.
    pub fn load(&self) -> Settings {
        if !self.path.exists() {
            return Settings::default();
        }

        match self.try_load() {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("ignoring settings: {}", err);
                Settings::default()
            },
        }
    }

    /// Never fails; write errors are only logged.
    pub fn save(&self, settings: &Settings) {
        if let Err(err) = self.try_save(settings) {
            tracing::debug!("unable to save settings: {}", err);
        }
    }

    fn try_load(&self) -> Result<Settings, SettingsError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn try_save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let json = serde_json::to_string(settings).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
