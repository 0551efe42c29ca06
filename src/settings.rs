//! Persisted per-user connection sets.
//!
//! The document lists every user with the last set they connected, plus the
//! name of the user who connected last:
//!
//! ```json
//! {
//!   "users": { "count": 1, "items": [
//!     { "userName": "bob", "connection": { "timeoutMinutes": 10,
//!       "connections": { "count": 1, "items": [ { "drive": "Z:", "path": "\\\\fs01\\bob" } ] } } }
//!   ] },
//!   "lastUserName": "bob"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connection::{ConnectionSet, CountedDoc};

const APP_DIR: &str = "VolatileDriveConnector";
const FILE_NAME: &str = "Settings.json";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read settings '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write settings '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no settings location available")]
    NoLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SettingsDoc", into = "SettingsDoc")]
pub struct SettingsDocument {
    pub users: BTreeMap<String, ConnectionSet>,
    pub last_user_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsDoc {
    users: CountedDoc<UserDoc>,
    #[serde(default)]
    last_user_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDoc {
    user_name: String,
    connection: ConnectionSet,
}

impl From<SettingsDocument> for SettingsDoc {
    fn from(doc: SettingsDocument) -> Self {
        let users = doc
            .users
            .into_iter()
            .map(|(user_name, connection)| UserDoc {
                user_name,
                connection,
            })
            .collect();
        SettingsDoc {
            users: CountedDoc::new(users),
            last_user_name: doc.last_user_name,
        }
    }
}

impl TryFrom<SettingsDoc> for SettingsDocument {
    type Error = String;

    fn try_from(doc: SettingsDoc) -> Result<Self, Self::Error> {
        let users = doc
            .users
            .into_items("user")?
            .into_iter()
            .map(|u| (u.user_name, u.connection))
            .collect();
        Ok(SettingsDocument {
            users,
            last_user_name: doc.last_user_name,
        })
    }
}

/// Where the settings document lives.
pub trait SettingsStore {
    /// `Ok(None)` means nothing has been saved yet.
    fn load(&self) -> Result<Option<SettingsDocument>, PersistenceError>;

    fn save(&mut self, doc: &SettingsDocument) -> Result<(), PersistenceError>;
}

/// Returns the settings file path in the per-user configuration directory
/// (`%APPDATA%` on Windows), or `None` if the platform has none.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
}

/// Stores the document as pretty-printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A store at [`default_settings_path`].
    pub fn at_default_location() -> Result<Self, PersistenceError> {
        default_settings_path()
            .map(Self::new)
            .ok_or(PersistenceError::NoLocation)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Option<SettingsDocument>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&mut self, doc: &SettingsDocument) -> Result<(), PersistenceError> {
        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(doc)?;
        // write beside the target, then swap it in
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        tracing::debug!(path = %self.path.display(), users = doc.users.len(), "settings saved");
        Ok(())
    }
}

/// Keeps the document in memory. Useful for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    doc: Option<SettingsDocument>,
    saves: usize,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: SettingsDocument) -> Self {
        Self {
            doc: Some(doc),
            saves: 0,
        }
    }

    pub fn document(&self) -> Option<&SettingsDocument> {
        self.doc.as_ref()
    }

    /// How many times [`SettingsStore::save`] was called.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<SettingsDocument>, PersistenceError> {
        Ok(self.doc.clone())
    }

    fn save(&mut self, doc: &SettingsDocument) -> Result<(), PersistenceError> {
        self.doc = Some(doc.clone());
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EditablePair;
    use serde_json::json;

    fn doc() -> SettingsDocument {
        let mut users = BTreeMap::new();
        users.insert(
            "alice".to_string(),
            ConnectionSet::new(&[EditablePair::new("X:", r"\\a\x")], 5),
        );
        users.insert("bob".to_string(), ConnectionSet::new(&Vec::<EditablePair>::new(), 10));
        SettingsDocument {
            users,
            last_user_name: "bob".to_string(),
        }
    }

    #[test]
    fn document_round_trip() {
        let text = serde_json::to_string(&doc()).unwrap();
        let back: SettingsDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc());
    }

    #[test]
    fn empty_document_has_no_user_list() {
        let value = serde_json::to_value(SettingsDocument::default()).unwrap();
        assert_eq!(value, json!({ "users": { "count": 0 }, "lastUserName": "" }));
        let back: SettingsDocument = serde_json::from_value(value).unwrap();
        assert!(back.users.is_empty());
    }

    #[test]
    fn user_count_mismatch_is_malformed() {
        let err = serde_json::from_value::<SettingsDocument>(json!({
            "users": { "count": 3, "items": [] },
            "lastUserName": ""
        }))
        .unwrap_err();
        assert!(err.to_string().contains("expected 3 user entries, found 0"));
    }

    #[test]
    fn default_path_is_under_app_directory() {
        let Some(path) = default_settings_path() else {
            return;
        };
        assert!(path.ends_with(Path::new(APP_DIR).join(FILE_NAME)), "{}", path.display());
    }

    #[test]
    fn memory_store_counts_saves() {
        let mut store = MemorySettingsStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&doc()).unwrap();
        assert_eq!(store.saves(), 1);
        assert_eq!(store.load().unwrap(), Some(doc()));
    }
}
