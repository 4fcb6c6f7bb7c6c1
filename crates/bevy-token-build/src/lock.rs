//! Lock file (`tokens.lock.toml`) tracking every token ever generated.
//!
//! Persisted tokens compare by `(class, name, int)`, so the lock pins that
//! triple. Removing a token or changing its int value would silently break
//! equality with stored values; the lock turns both into build-time events.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::toml_parser::TokensConfig;

/// Current lock format version.
const LOCK_VERSION: u32 = 1;

/// One generated token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub class: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int: Option<i64>,
    /// Removed from tokens.toml but still generated (`on_remove = "warn"`)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

impl LockEntry {
    fn matches(&self, class: &str, name: &str) -> bool {
        self.class == class && self.name == name
    }

    /// `Class.NAME`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.class, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockFile {
    pub version: u32,
    /// RFC 3339 timestamp of the last generation
    pub generated_at: String,
    #[serde(default, rename = "token")]
    pub entries: Vec<LockEntry>,
}

/// A token whose int value differs between lock and config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renumbered {
    pub class: String,
    pub name: String,
    pub locked: Option<i64>,
    pub current: Option<i64>,
}

/// Difference between a lock file and the current config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockDiff {
    /// In config, not in lock
    pub added: Vec<LockEntry>,
    /// Active in lock, missing from config
    pub removed: Vec<LockEntry>,
    /// Deprecated in lock, back in config
    pub revived: Vec<LockEntry>,
    pub renumbered: Vec<Renumbered>,
}

impl LockDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.revived.is_empty()
            && self.renumbered.is_empty()
    }
}

impl LockFile {
    /// Fresh lock holding every token of `config`.
    pub fn from_config(config: &TokensConfig) -> Self {
        let entries = config
            .tokens()
            .map(|(class, token)| LockEntry {
                class: class.path.clone(),
                name: token.name.clone(),
                int: token.int,
                deprecated: false,
            })
            .collect();

        Self {
            version: LOCK_VERSION,
            generated_at: timestamp(),
            entries,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LockFileError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LockFileError::Io(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self, LockFileError> {
        let lock: Self = toml::from_str(content).map_err(|e| LockFileError::Parse(e.to_string()))?;
        if lock.version != LOCK_VERSION {
            return Err(LockFileError::Version(lock.version));
        }
        Ok(lock)
    }

    pub fn to_toml_string(&self) -> Result<String, LockFileError> {
        let body = toml::to_string_pretty(self).map_err(|e| LockFileError::Serialize(e.to_string()))?;
        Ok(format!(
            "# Generated by bevy-token-build. Commit this file; do not edit by hand.\n\n{body}"
        ))
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockFileError> {
        let content = self.to_toml_string()?;
        std::fs::write(path.as_ref(), content).map_err(|e| {
            LockFileError::Io(format!("failed to write {}: {}", path.as_ref().display(), e))
        })
    }

    pub fn get(&self, class: &str, name: &str) -> Option<&LockEntry> {
        self.entries.iter().find(|e| e.matches(class, name))
    }

    pub fn active_entries(&self) -> impl Iterator<Item = &LockEntry> {
        self.entries.iter().filter(|e| !e.deprecated)
    }

    pub fn deprecated_entries(&self) -> impl Iterator<Item = &LockEntry> {
        self.entries.iter().filter(|e| e.deprecated)
    }

    /// Compare against the current config.
    pub fn diff(&self, config: &TokensConfig) -> LockDiff {
        let mut diff = LockDiff::default();

        for (class, token) in config.tokens() {
            match self.get(&class.path, &token.name) {
                None => diff.added.push(LockEntry {
                    class: class.path.clone(),
                    name: token.name.clone(),
                    int: token.int,
                    deprecated: false,
                }),
                Some(locked) => {
                    if locked.int != token.int {
                        diff.renumbered.push(Renumbered {
                            class: class.path.clone(),
                            name: token.name.clone(),
                            locked: locked.int,
                            current: token.int,
                        });
                    }
                    if locked.deprecated {
                        diff.revived.push(locked.clone());
                    }
                }
            }
        }

        diff.removed = self
            .active_entries()
            .filter(|e| {
                config
                    .class(&e.class)
                    .is_none_or(|class| !class.tokens.iter().any(|t| t.name == e.name))
            })
            .cloned()
            .collect();

        diff
    }

    /// Append an entry unless it is already locked.
    pub fn add_entry(&mut self, entry: LockEntry) {
        if self.get(&entry.class, &entry.name).is_none() {
            self.entries.push(entry);
        }
    }

    pub fn mark_deprecated(&mut self, class: &str, name: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.matches(class, name)) {
            entry.deprecated = true;
        }
    }

    pub fn revive(&mut self, class: &str, name: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.matches(class, name)) {
            entry.deprecated = false;
        }
    }

    /// Stamp the current time.
    pub fn touch(&mut self) {
        self.generated_at = timestamp();
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Errors reading or writing the lock file.
#[derive(Debug, thiserror::Error)]
pub enum LockFileError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("serialize error: {0}")]
    Serialize(String),
    #[error("unsupported lock file version {0} (expected {LOCK_VERSION})")]
    Version(u32),
}
