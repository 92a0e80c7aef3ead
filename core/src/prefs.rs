//! Client preferences that survive restarts (currently just dark mode).

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PreferenceError;

/// Style class applied to the whole document in dark mode.
pub const DARK_MODE_CLASS: &str = "dark-mode";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
}

impl Preferences {
    pub fn body_class(&self) -> &'static str {
        if self.dark_mode {
            DARK_MODE_CLASS
        } else {
            ""
        }
    }
}

/// Durable storage for [`Preferences`].
pub trait PreferenceStore {
    fn load(&self) -> Result<Preferences, PreferenceError>;
    fn save(&mut self, prefs: &Preferences) -> Result<(), PreferenceError>;
}

/// Keeps preferences in a JSON file. A missing file reads as defaults.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Preferences, PreferenceError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, prefs: &Preferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(prefs)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    saved: Option<Preferences>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Preferences, PreferenceError> {
        Ok(self.saved.unwrap_or_default())
    }

    fn save(&mut self, prefs: &Preferences) -> Result<(), PreferenceError> {
        self.saved = Some(*prefs);
        Ok(())
    }
}
