//! Read-only search and ordering over a note snapshot.

use crate::Note;
use std::sync::Arc;

/// Order of notes by [`Note::last_modified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Most recently changed first.
    #[default]
    Descending,
    /// Least recently changed first.
    Ascending,
}

/// A title search plus an ordering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoteQuery {
    pub search: String,
    pub direction: SortDirection,
}

impl NoteQuery {
    pub fn new(search: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            search: search.into(),
            direction,
        }
    }

    /// Returns the notes whose title contains the search term (ignoring case),
    /// ordered by last modification. `notes` is left untouched.
    ///
    /// A blank search term matches every note. Notes with equal timestamps
    /// keep their relative order from `notes`.
    pub fn apply(&self, notes: &[Note]) -> Vec<Note> {
        let mut matches: Vec<Note> = if self.search.trim().is_empty() {
            notes.to_vec()
        } else {
            let term = self.search.to_lowercase();
            notes
                .iter()
                .filter(|note| note.title.to_lowercase().contains(&term))
                .cloned()
                .collect()
        };

        match self.direction {
            SortDirection::Descending => {
                matches.sort_by(|a, b| b.last_modified().cmp(&a.last_modified()))
            }
            SortDirection::Ascending => {
                matches.sort_by(|a, b| a.last_modified().cmp(&b.last_modified()))
            }
        }
        matches
    }
}

/// Caches the result of a [`NoteQuery`] for one snapshot.
///
/// [`evaluate`](Self::evaluate) recomputes only when it is handed a different
/// snapshot (by `Arc` identity) or a different query.
#[derive(Debug, Default)]
pub struct QueryView {
    source: Option<Arc<Vec<Note>>>,
    query: NoteQuery,
    result: Vec<Note>,
    recomputations: usize,
}

impl QueryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&mut self, snapshot: &Arc<Vec<Note>>, query: &NoteQuery) -> &[Note] {
        let fresh = matches!(&self.source, Some(source) if Arc::ptr_eq(source, snapshot))
            && self.query == *query;
        if !fresh {
            self.result = query.apply(snapshot);
            self.source = Some(Arc::clone(snapshot));
            self.query = query.clone();
            self.recomputations += 1;
        }
        &self.result
    }

    /// How many times the result has been computed.
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }
}
