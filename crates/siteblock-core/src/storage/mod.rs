//! Persistence: the key-value store abstraction, its SQLite and in-memory
//! backends, TOML configuration, and the profile/notes CRUD layer.

mod config;
pub mod database;
pub mod memory;
pub mod notes;
pub mod profiles;

pub use config::{BlockingConfig, ChallengeConfig, Config, DisplayConfig, LoggingConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;
pub use notes::{DistractionNote, NoteStore};
pub use profiles::{Profile, ProfileStore};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::StorageError;

/// Storage keys shared by every component that touches the store.
pub mod keys {
    pub const BLOCKING_STATE: &str = "blockingState";
    pub const PROFILES: &str = "profiles";
    pub const MATH_DIFFICULTY: &str = "mathDifficulty";
    pub const DISTRACTION_NOTES: &str = "distractionNotes";
    pub const MATH_CHALLENGE_STATE: &str = "mathChallengeState";
    pub const DYNAMIC_RULES: &str = "dynamicRules";
}

/// Durable key-value storage holding JSON values.
///
/// Writes are not assumed to be transactional across separate calls.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the given keys. Missing keys are absent from the result.
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError>;

    /// Insert or replace every entry.
    fn set(&self, entries: HashMap<String, Value>) -> Result<(), StorageError>;

    /// Delete the given keys. Unknown keys are ignored.
    fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;
}

/// Typed helpers over [`KeyValueStore`].
pub trait KeyValueStoreExt {
    /// Read and decode a single key.
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError>;

    /// Encode and write a single key.
    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let mut values = self.get(&[key])?;
        match values.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StorageError::Serialize {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.set(HashMap::from([(key.to_string(), value)]))
    }
}

/// Returns the data directory, creating it if needed.
///
/// `SITEBLOCK_DATA_DIR` overrides the location. Otherwise this is
/// `~/.config/siteblock[-dev]/`, with `-dev` selected by `SITEBLOCK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("SITEBLOCK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("SITEBLOCK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("siteblock-dev")
            } else {
                base_dir.join("siteblock")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
