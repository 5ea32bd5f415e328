//! The authoritative in-memory note collection and its persistence pipeline.

use crate::{
    EstuGrowError, KvStore, Note, NoteDraft, NotePatch, NotePersistence, PersistenceError, Result,
    StoreEvent, Subscribers, SubscriptionToken,
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Lifecycle of a [`NoteStore`].
///
/// Reads and mutations are accepted only in [`LoadState::Ready`]; in every
/// other state they fail with [`EstuGrowError::NotReady`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
    Closed,
}

struct Committed {
    state: LoadState,
    notes: Arc<Vec<Note>>,
}

/// State shared between the store handle and its mutation tasks.
struct Shared<S: KvStore> {
    persistence: NotePersistence<S>,
    committed: RwLock<Committed>,
    mutations: tokio::sync::Mutex<()>,
    subscribers: Subscribers,
}

/// Owns the note collection and keeps it in step with durable storage.
///
/// Mutations are queued behind one async lock and applied in the order they
/// acquire it. Each mutation builds a candidate collection, saves it, and only
/// then publishes it as the committed snapshot; a failed save leaves the
/// committed snapshot untouched. Readers always see the last committed
/// snapshot, which is also what storage holds.
///
/// A mutation runs on its own Tokio task once accepted, so it completes even
/// if the caller drops the returned future. Mutations must therefore be
/// called from within a Tokio runtime.
///
/// Share a store between tasks with `Arc<NoteStore<_>>`.
pub struct NoteStore<S: KvStore> {
    shared: Arc<Shared<S>>,
}

impl<S: KvStore> NoteStore<S> {
    /// Creates an uninitialised store over `kv`. Call [`initialize`](Self::initialize) next.
    pub fn new(kv: S) -> Self {
        Self::with_persistence(NotePersistence::new(kv))
    }

    pub fn with_persistence(persistence: NotePersistence<S>) -> Self {
        Self {
            shared: Arc::new(Shared {
                persistence,
                committed: RwLock::new(Committed {
                    state: LoadState::Uninitialized,
                    notes: Arc::new(Vec::new()),
                }),
                mutations: tokio::sync::Mutex::new(()),
                subscribers: Subscribers::new(),
            }),
        }
    }

    /// Loads the persisted collection and moves the store to [`LoadState::Ready`].
    ///
    /// Runs the load at most once; later calls return immediately. Concurrent
    /// callers wait for the first load to finish. Unreadable storage yields an
    /// empty collection rather than an error.
    ///
    /// Emits `LoadingChanged(true)`, then `NotesChanged` and `LoadingChanged(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`EstuGrowError::NotReady`] if the store has been closed.
    pub async fn initialize(&self) -> Result<()> {
        let shared = &self.shared;
        let _queue = shared.mutations.lock().await;
        match shared.load_state() {
            LoadState::Ready => return Ok(()),
            LoadState::Closed => return Err(EstuGrowError::NotReady),
            LoadState::Uninitialized | LoadState::Loading => {}
        }

        shared.write_committed().state = LoadState::Loading;
        shared.subscribers.notify(StoreEvent::LoadingChanged(true));

        let notes = shared.persistence.load().await;
        let count = notes.len();
        {
            let mut committed = shared.write_committed();
            committed.notes = Arc::new(notes);
            committed.state = LoadState::Ready;
        }
        log::info!("Note store ready with {count} notes");

        shared.subscribers.notify(StoreEvent::NotesChanged { count });
        shared.subscribers.notify(StoreEvent::LoadingChanged(false));
        Ok(())
    }

    /// Waits for any in-flight mutation, then rejects all further operations
    /// and drops every subscriber.
    pub async fn close(&self) {
        let _queue = self.shared.mutations.lock().await;
        self.shared.write_committed().state = LoadState::Closed;
        self.shared.subscribers.clear();
        log::info!("Note store closed");
    }

    /// Creates a note from `draft` at the head of the collection and persists it.
    ///
    /// # Errors
    ///
    /// Returns [`EstuGrowError::NotReady`] before initialisation, or
    /// [`EstuGrowError::Persistence`] if the save failed, in which case the
    /// collection is unchanged.
    pub async fn add_note(&self, draft: NoteDraft) -> Result<Note> {
        let note = self
            .mutate(move |current| {
                let now = Utc::now();
                let note = Note {
                    id: unique_id(current),
                    title: draft.title,
                    description: draft.description,
                    image_uri: draft.image_uri,
                    priority: draft.priority,
                    created_at: now,
                    updated_at: Some(now),
                };

                let mut candidate = Vec::with_capacity(current.len() + 1);
                candidate.push(note.clone());
                candidate.extend(current.iter().cloned());
                Ok((candidate, note))
            })
            .await?;

        log::info!("Added note {}", note.id);
        Ok(note)
    }

    /// Applies `patch` to the note `note_id`, refreshes `updated_at`, and persists.
    ///
    /// The new `updated_at` is always later than the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`EstuGrowError::NoteNotFound`] if no such note exists,
    /// [`EstuGrowError::NotReady`] before initialisation, or
    /// [`EstuGrowError::Persistence`] if the save failed (collection unchanged).
    pub async fn update_note(&self, note_id: &str, patch: NotePatch) -> Result<Note> {
        let id = note_id.to_string();
        let updated = self
            .mutate(move |current| {
                let index = position_of(current, &id)?;

                let mut updated = current[index].clone();
                patch.apply_to(&mut updated);
                updated.updated_at = Some(next_timestamp(current[index].last_modified()));

                let mut candidate = current.to_vec();
                candidate[index] = updated.clone();
                Ok((candidate, updated))
            })
            .await?;

        log::info!("Updated note {note_id}");
        Ok(updated)
    }

    /// Removes the note `note_id` and persists.
    ///
    /// # Errors
    ///
    /// Returns [`EstuGrowError::NoteNotFound`] if no such note exists,
    /// [`EstuGrowError::NotReady`] before initialisation, or
    /// [`EstuGrowError::Persistence`] if the save failed (collection unchanged).
    pub async fn delete_note(&self, note_id: &str) -> Result<()> {
        let id = note_id.to_string();
        self.mutate(move |current| {
            let index = position_of(current, &id)?;
            let mut candidate = current.to_vec();
            candidate.remove(index);
            Ok((candidate, ()))
        })
        .await?;

        log::info!("Deleted note {note_id}");
        Ok(())
    }

    /// The committed collection, newest insertions first.
    ///
    /// The returned snapshot never changes; later mutations publish a new one.
    pub fn get_all(&self) -> Result<Arc<Vec<Note>>> {
        self.shared.ensure_ready()?;
        Ok(self.shared.snapshot())
    }

    /// A single note by id.
    pub fn get_note(&self, note_id: &str) -> Result<Note> {
        let notes = self.get_all()?;
        notes
            .iter()
            .find(|note| note.id == note_id)
            .cloned()
            .ok_or_else(|| EstuGrowError::NoteNotFound(note_id.to_string()))
    }

    pub fn load_state(&self) -> LoadState {
        self.shared.load_state()
    }

    /// True while [`initialize`](Self::initialize) is reading storage.
    pub fn is_loading(&self) -> bool {
        self.load_state() == LoadState::Loading
    }

    /// Registers `handler` for every future [`StoreEvent`].
    ///
    /// Handlers run synchronously on the task that committed the change, after
    /// the new snapshot is visible through [`get_all`](Self::get_all).
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(handler)
    }

    /// Safe to call repeatedly and from inside a handler.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.shared.subscribers.unsubscribe(token)
    }

    pub fn persistence(&self) -> &NotePersistence<S> {
        &self.shared.persistence
    }

    /// Queues one mutation and waits for its result.
    ///
    /// `build` derives the candidate collection from the committed one. The
    /// queue wait, the save, the swap and the notification run on a spawned
    /// task, so dropping this future never leaves storage ahead of memory.
    async fn mutate<T, F>(&self, build: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&[Note]) -> Result<(Vec<Note>, T)> + Send + 'static,
    {
        self.shared.ensure_ready()?;

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let _queue = shared.mutations.lock().await;
            shared.ensure_ready()?;

            let current = shared.snapshot();
            let (candidate, output) = build(current.as_slice())?;
            shared.commit(candidate).await?;
            Ok::<T, EstuGrowError>(output)
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(PersistenceError::Task(e.to_string()).into()),
        }
    }
}

impl<S: KvStore> Shared<S> {
    async fn commit(&self, candidate: Vec<Note>) -> Result<()> {
        if let Err(e) = self.persistence.save(&candidate).await {
            log::error!("Failed to persist notes, change discarded: {e}");
            return Err(e.into());
        }

        let count = candidate.len();
        self.write_committed().notes = Arc::new(candidate);
        self.subscribers.notify(StoreEvent::NotesChanged { count });
        Ok(())
    }

    fn load_state(&self) -> LoadState {
        self.read_committed().state
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.load_state() {
            LoadState::Ready => Ok(()),
            _ => Err(EstuGrowError::NotReady),
        }
    }

    fn snapshot(&self) -> Arc<Vec<Note>> {
        Arc::clone(&self.read_committed().notes)
    }

    fn read_committed(&self) -> RwLockReadGuard<'_, Committed> {
        self.committed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_committed(&self) -> RwLockWriteGuard<'_, Committed> {
        self.committed
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn position_of(notes: &[Note], note_id: &str) -> Result<usize> {
    notes
        .iter()
        .position(|note| note.id == note_id)
        .ok_or_else(|| EstuGrowError::NoteNotFound(note_id.to_string()))
}

fn unique_id(notes: &[Note]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if !notes.iter().any(|note| note.id == id) {
            return id;
        }
    }
}

/// The current time, or one millisecond after `previous` if the clock has not moved past it.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::milliseconds(1)
    }
}
