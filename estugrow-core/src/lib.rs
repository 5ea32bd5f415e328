//! Core library for EstuGrow, a local-first store for photographed study notes.
//!
//! The primary entry point is [`NoteStore`], which owns the note collection,
//! persists it through a [`KvStore`] and publishes [`StoreEvent`]s. All
//! mutations go through `NoteStore` methods; [`NoteQuery`] derives filtered
//! and sorted views from its snapshots.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    error::{EstuGrowError, PersistenceError, Result},
    file_storage::FileKvStore,
    kv::{KvStore, MemoryKvStore},
    note::{Note, NoteDraft, NotePatch, Priority, MIN_TITLE_CHARS},
    persistence::{decode_notes, encode_notes, NotePersistence, COLLECTION_VERSION, NOTES_KEY},
    query::{NoteQuery, QueryView, SortDirection},
    storage::SqliteKvStore,
    store::{LoadState, NoteStore},
    subscription::{StoreEvent, Subscribers, SubscriptionToken},
};
