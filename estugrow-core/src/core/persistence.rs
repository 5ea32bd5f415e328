//! Serialises the whole note collection to a single [`KvStore`] entry.
//!
//! ## Layout
//!
//! The collection is stored as one JSON document under [`NOTES_KEY`]:
//!
//! ```json
//! { "version": 1, "notes": [ { "id": "…", "title": "…", … } ] }
//! ```
//!
//! A bare JSON array of notes (the unversioned layout) is still accepted on
//! read and is rewritten in the versioned layout by the next save. A blob that
//! cannot be decoded is copied to `<key>.unreadable` before the store starts
//! over with an empty collection.

use crate::{KvStore, Note, PersistenceError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The single well-known key the collection is stored under.
pub const NOTES_KEY: &str = "estugrow.notes";

/// Layout version written by this build.
pub const COLLECTION_VERSION: u32 = 1;

const UNREADABLE_SUFFIX: &str = ".unreadable";

#[derive(Serialize)]
struct StoredCollectionRef<'a> {
    version: u32,
    notes: &'a [Note],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCollection {
    Versioned { version: u32, notes: Vec<Note> },
    Unversioned(Vec<Note>),
}

/// Encodes `notes` in the current layout.
pub fn encode_notes(notes: &[Note]) -> Result<Vec<u8>, PersistenceError> {
    let doc = StoredCollectionRef {
        version: COLLECTION_VERSION,
        notes,
    };
    Ok(serde_json::to_vec(&doc)?)
}

/// Decodes a stored collection in either the versioned or the unversioned layout.
///
/// # Errors
///
/// Returns [`PersistenceError::Json`] for malformed data and
/// [`PersistenceError::UnsupportedVersion`] for a layout newer than
/// [`COLLECTION_VERSION`].
pub fn decode_notes(bytes: &[u8]) -> Result<Vec<Note>, PersistenceError> {
    match serde_json::from_slice::<StoredCollection>(bytes)? {
        StoredCollection::Versioned { version, notes } => {
            if version > COLLECTION_VERSION {
                return Err(PersistenceError::UnsupportedVersion(version));
            }
            Ok(notes)
        }
        StoredCollection::Unversioned(notes) => {
            log::info!("Read {} notes from unversioned layout", notes.len());
            Ok(notes)
        }
    }
}

/// Loads and saves the note collection through a [`KvStore`].
pub struct NotePersistence<S: KvStore> {
    kv: S,
    key: String,
}

impl<S: KvStore> NotePersistence<S> {
    /// Persists under [`NOTES_KEY`].
    pub fn new(kv: S) -> Self {
        Self::with_key(kv, NOTES_KEY)
    }

    pub fn with_key(kv: S, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    /// The underlying byte store.
    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Where [`load`](Self::load) keeps the last blob it could not decode.
    pub fn unreadable_key(&self) -> String {
        format!("{}{UNREADABLE_SUFFIX}", self.key)
    }

    /// Reads the stored collection, propagating every failure.
    ///
    /// A missing entry is an empty collection, not an error.
    pub async fn try_load(&self) -> Result<Vec<Note>, PersistenceError> {
        match self.kv.read(&self.key).await? {
            Some(bytes) => decode_notes(&bytes).map(dedupe_ids),
            None => Ok(Vec::new()),
        }
    }

    /// Reads the stored collection, recovering from any failure with an
    /// empty collection. Failures are logged.
    ///
    /// Undecodable data, including a layout newer than this build reads, is
    /// copied to [`unreadable_key`](Self::unreadable_key) first so the next
    /// save does not destroy it.
    pub async fn load(&self) -> Vec<Note> {
        let bytes = match self.kv.read(&self.key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::error!("Failed to load notes from '{}', starting empty: {e}", self.key);
                return Vec::new();
            }
        };

        match decode_notes(&bytes) {
            Ok(notes) => {
                let notes = dedupe_ids(notes);
                log::debug!("Loaded {} notes from '{}'", notes.len(), self.key);
                notes
            }
            Err(e) => {
                log::warn!("Stored notes under '{}' are unreadable, starting empty: {e}", self.key);
                self.set_aside(&bytes).await;
                Vec::new()
            }
        }
    }

    async fn set_aside(&self, bytes: &[u8]) {
        let target = self.unreadable_key();
        match self.kv.write(&target, bytes).await {
            Ok(()) => log::info!("Kept unreadable notes under '{target}'"),
            Err(e) => log::error!("Failed to keep unreadable notes under '{target}': {e}"),
        }
    }

    /// Replaces the stored collection with `notes`.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`PersistenceError`] if the write did not happen;
    /// the previously stored collection is then still in place.
    pub async fn save(&self, notes: &[Note]) -> Result<(), PersistenceError> {
        let bytes = encode_notes(notes)?;
        self.kv.write(&self.key, &bytes).await?;
        log::debug!("Saved {} notes to '{}'", notes.len(), self.key);
        Ok(())
    }
}

/// Drops later notes that reuse an id already seen, keeping collection order.
fn dedupe_ids(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::with_capacity(notes.len());
    let before = notes.len();
    let notes: Vec<Note> = notes
        .into_iter()
        .filter(|note| seen.insert(note.id.clone()))
        .collect();
    if notes.len() != before {
        log::warn!("Dropped {} notes with duplicate ids", before - notes.len());
    }
    notes
}
