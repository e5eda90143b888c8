//! # Persisted per-tablet settings
//!
//! Each tablet stores a small record under its [settings
//! key](crate::Tablet::settings_key): which display it is mapped to (as a
//! raw three-string EDID vector), plus handedness and aspect handling.
//!
//! Stores hand the display vector back *exactly as persisted*, whatever its
//! length - the resolution path in [`crate::device`] is the single place
//! that validates it. Writes are synchronous; there is no cache to go stale.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::display::EdidInfo;

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("settings file io: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file malformed: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("settings not serializable: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Store of per-device settings, keyed by
/// [settings key](crate::Tablet::settings_key).
///
/// Reads are infallible and return defaults for unknown keys; an absent
/// record and a freshly-registered tablet look the same (all-empty display
/// vector, everything else off).
pub trait SettingsStore {
    /// The raw persisted display identity vector for `key`.
    ///
    /// Expected length is 3, but the store does not enforce that - callers
    /// own the validation.
    fn display_triple(&self, key: &str) -> Vec<String>;
    /// Overwrite the display identity for `key`. The
    /// [unset](EdidInfo::unset) triple clears the mapping.
    ///
    /// # Errors
    /// Whatever the backing medium raises; in-memory stores never fail.
    fn set_display_triple(&mut self, key: &str, triple: &EdidInfo) -> Result<(), SettingsError>;

    /// Whether the device is configured for left-handed (rotated) use.
    fn is_left_handed(&self, key: &str) -> bool;
    /// # Errors
    /// Whatever the backing medium raises.
    fn set_left_handed(&mut self, key: &str, left_handed: bool) -> Result<(), SettingsError>;

    /// Whether area mapping preserves the display's aspect ratio.
    fn keep_aspect(&self, key: &str) -> bool;
    /// # Errors
    /// Whatever the backing medium raises.
    fn set_keep_aspect(&mut self, key: &str, keep: bool) -> Result<(), SettingsError>;
}

/// One device's record, as stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct DeviceRecord {
    /// EDID identity of the mapped display, raw. Stored verbatim so a
    /// hand-edited file reaches the validation point unchanged.
    #[serde(default = "unset_display")]
    display: Vec<String>,
    #[serde(default)]
    left_handed: bool,
    #[serde(default)]
    keep_aspect: bool,
}

impl Default for DeviceRecord {
    fn default() -> Self {
        Self {
            display: unset_display(),
            left_handed: false,
            keep_aspect: false,
        }
    }
}

/// A fresh record holds the all-empty triple: unbound, not malformed.
fn unset_display() -> Vec<String> {
    vec![String::new(); 3]
}

fn display_vec(triple: &EdidInfo) -> Vec<String> {
    vec![
        triple.vendor.clone(),
        triple.product.clone(),
        triple.serial.clone(),
    ]
}

/// In-memory [`SettingsStore`]. For tests, and for embedders that persist
/// through some other channel.
#[derive(Debug, Default)]
pub struct MemorySettings {
    records: HashMap<String, DeviceRecord>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the raw display vector for `key`.
    ///
    /// Unlike [`SettingsStore::set_display_triple`] this accepts vectors of
    /// any length, the way an external writer (or a corrupted medium) could
    /// produce them. Resolution treats lengths other than 3 as corrupt.
    pub fn set_raw_display(&mut self, key: &str, values: Vec<String>) {
        self.records.entry(key.to_owned()).or_default().display = values;
    }

    fn record(&mut self, key: &str) -> &mut DeviceRecord {
        self.records.entry(key.to_owned()).or_default()
    }
}

impl SettingsStore for MemorySettings {
    fn display_triple(&self, key: &str) -> Vec<String> {
        self.records
            .get(key)
            .map_or_else(unset_display, |record| record.display.clone())
    }
    fn set_display_triple(&mut self, key: &str, triple: &EdidInfo) -> Result<(), SettingsError> {
        self.record(key).display = display_vec(triple);
        Ok(())
    }
    fn is_left_handed(&self, key: &str) -> bool {
        self.records.get(key).is_some_and(|record| record.left_handed)
    }
    fn set_left_handed(&mut self, key: &str, left_handed: bool) -> Result<(), SettingsError> {
        self.record(key).left_handed = left_handed;
        Ok(())
    }
    fn keep_aspect(&self, key: &str) -> bool {
        self.records.get(key).is_some_and(|record| record.keep_aspect)
    }
    fn set_keep_aspect(&mut self, key: &str, keep: bool) -> Result<(), SettingsError> {
        self.record(key).keep_aspect = keep;
        Ok(())
    }
}

/// TOML-file-backed [`SettingsStore`].
///
/// The whole file is loaded at [`open`](FileSettings::open) and rewritten
/// synchronously on every mutation - records are small and mutations are
/// user-paced, there is nothing to batch.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    records: HashMap<String, DeviceRecord>,
}

impl FileSettings {
    /// Open `path`, reading any existing records. A missing file is an
    /// empty store; the file (and parent directories) appear on first write.
    ///
    /// # Errors
    /// [`SettingsError::Io`] for anything but a missing file,
    /// [`SettingsError::Parse`] if the file exists and isn't valid TOML.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, records })
    }

    /// Where the records live.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn persist(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string_pretty(&self.records)?)?;
        Ok(())
    }

    fn mutate(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut DeviceRecord),
    ) -> Result<(), SettingsError> {
        f(self.records.entry(key.to_owned()).or_default());
        self.persist()
    }
}

impl SettingsStore for FileSettings {
    fn display_triple(&self, key: &str) -> Vec<String> {
        self.records
            .get(key)
            .map_or_else(unset_display, |record| record.display.clone())
    }
    fn set_display_triple(&mut self, key: &str, triple: &EdidInfo) -> Result<(), SettingsError> {
        self.mutate(key, |record| record.display = display_vec(triple))
    }
    fn is_left_handed(&self, key: &str) -> bool {
        self.records.get(key).is_some_and(|record| record.left_handed)
    }
    fn set_left_handed(&mut self, key: &str, left_handed: bool) -> Result<(), SettingsError> {
        self.mutate(key, |record| record.left_handed = left_handed)
    }
    fn keep_aspect(&self, key: &str) -> bool {
        self.records.get(key).is_some_and(|record| record.keep_aspect)
    }
    fn set_keep_aspect(&mut self, key: &str, keep: bool) -> Result<(), SettingsError> {
        self.mutate(key, |record| record.keep_aspect = keep)
    }
}
