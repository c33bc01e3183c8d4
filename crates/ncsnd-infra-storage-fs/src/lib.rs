//! Arbiter settings kept as a JSON file in the per-user config directory.

use ncsnd_ports::settings::{ArbiterSettings, SettingsError, SettingsPort};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "ncsnd";
const SETTINGS_FILE: &str = "settings.json";

pub struct FsSettings {
    base_dir: PathBuf,
}

impl FsSettings {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Reads and validates a settings file at an explicit path, e.g. one
    /// given on the command line. A missing file is an error here.
    pub fn load_from(path: &Path) -> Result<ArbiterSettings, SettingsError> {
        let data = fs::read(path).map_err(|e| io_error(path, e))?;
        parse_settings(path, &data)
    }

    /// Validates, then replaces the file at `path` in one rename so a
    /// reader never sees a half-written file.
    pub fn save_to(path: &Path, settings: &ArbiterSettings) -> Result<(), SettingsError> {
        settings
            .validate()
            .map_err(|err| with_path(path, err))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let data =
            serde_json::to_vec_pretty(settings).map_err(|e| SettingsError::Serde(e.to_string()))?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, data).map_err(|e| io_error(&staging, e))?;
        fs::rename(&staging, path).map_err(|e| io_error(path, e))
    }

    pub fn default_base_dir() -> Result<PathBuf, SettingsError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| SettingsError::Io("config dir not found".to_string()))?;
        Ok(base.join(CONFIG_DIR))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE)
    }
}

impl Default for FsSettings {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { base_dir }
    }
}

impl SettingsPort for FsSettings {
    /// Falls back to defaults when no file has been saved yet.
    fn load_settings(&self) -> Result<ArbiterSettings, SettingsError> {
        let path = self.settings_path();
        match fs::read(&path) {
            Ok(data) => parse_settings(&path, &data),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ArbiterSettings::default()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn save_settings(&self, s: &ArbiterSettings) -> Result<(), SettingsError> {
        Self::save_to(&self.settings_path(), s)
    }
}

fn parse_settings(path: &Path, data: &[u8]) -> Result<ArbiterSettings, SettingsError> {
    let settings: ArbiterSettings = serde_json::from_slice(data)
        .map_err(|e| SettingsError::Serde(format!("{}: {e}", path.display())))?;
    settings.validate().map_err(|err| with_path(path, err))?;
    Ok(settings)
}

fn with_path(path: &Path, err: SettingsError) -> SettingsError {
    match err {
        SettingsError::Invalid(msg) => SettingsError::Invalid(format!("{}: {msg}", path.display())),
        other => other,
    }
}

fn io_error(path: &Path, err: std::io::Error) -> SettingsError {
    SettingsError::Io(format!("{}: {err}", path.display()))
}
