//! Internal domain modules for the EstuGrow core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod error;
pub mod file_storage;
pub mod kv;
pub mod note;
pub mod persistence;
pub mod query;
pub mod storage;
pub mod store;
pub mod subscription;

#[doc(inline)]
pub use error::{EstuGrowError, PersistenceError, Result};
#[doc(inline)]
pub use file_storage::FileKvStore;
#[doc(inline)]
pub use kv::{KvStore, MemoryKvStore};
#[doc(inline)]
pub use note::{Note, NoteDraft, NotePatch, Priority, MIN_TITLE_CHARS};
#[doc(inline)]
pub use persistence::{decode_notes, encode_notes, NotePersistence, COLLECTION_VERSION, NOTES_KEY};
#[doc(inline)]
pub use query::{NoteQuery, QueryView, SortDirection};
#[doc(inline)]
pub use storage::SqliteKvStore;
#[doc(inline)]
pub use store::{LoadState, NoteStore};
#[doc(inline)]
pub use subscription::{StoreEvent, Subscribers, SubscriptionToken};
