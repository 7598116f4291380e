//! Distraction notes: things the user wanted to look up while blocked.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{keys, KeyValueStore, KeyValueStoreExt};
use crate::clock::Clock;
use crate::error::{Result, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractionNote {
    /// Epoch milliseconds.
    pub timestamp: u64,
    pub note: String,
}

#[derive(Clone)]
pub struct NoteStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl NoteStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn add(&self, text: &str) -> Result<DistractionNote> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyNote.into());
        }
        let note = DistractionNote {
            timestamp: self.clock.now_ms(),
            note: text.to_string(),
        };

        let mut notes = self.stored()?;
        notes.push(note.clone());
        self.store.write(keys::DISTRACTION_NOTES, &notes)?;
        Ok(note)
    }

    /// All notes, newest first.
    pub fn list(&self) -> Result<Vec<DistractionNote>> {
        let mut notes = self.stored()?;
        notes.reverse();
        notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(notes)
    }

    pub fn clear(&self) -> Result<()> {
        self.store
            .write(keys::DISTRACTION_NOTES, &Vec::<DistractionNote>::new())?;
        Ok(())
    }

    fn stored(&self) -> Result<Vec<DistractionNote>> {
        Ok(self.store.read(keys::DISTRACTION_NOTES)?.unwrap_or_default())
    }
}
