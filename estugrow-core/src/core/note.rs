//! The note record and the user-supplied inputs that create or change it.

use crate::{EstuGrowError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum title length accepted by [`NoteDraft::validate`], counted in characters.
pub const MIN_TITLE_CHARS: usize = 3;

/// How urgent a study note is.
///
/// Serialised as a lowercase string (`"high"`, `"medium"`, `"low"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// All priorities in display order.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// The label shown next to a note in lists.
    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "Alta",
            Priority::Medium => "Media",
            Priority::Low => "Baja",
        }
    }

    /// The stored (serialised) name.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = EstuGrowError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == wanted)
            .ok_or_else(|| {
                EstuGrowError::ValidationFailed(format!(
                    "Unknown priority '{wanted}', expected high, medium or low"
                ))
            })
    }
}

/// One study note.
///
/// `id` and `created_at` are assigned by the store and never change.
/// `updated_at` may be missing in collections written by older builds;
/// use [`Note::last_modified`] instead of reading it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// Timestamp of the latest change, falling back to `created_at`.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// Fields entered by the user for a new note, before the store assigns
/// `id` and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Checks the rules a draft must satisfy before the save action is offered:
    /// a title of at least [`MIN_TITLE_CHARS`] characters, a non-empty
    /// description and an attached photo.
    ///
    /// The store itself does not call this; producers do.
    ///
    /// # Errors
    ///
    /// Returns [`EstuGrowError::ValidationFailed`] naming the first rule broken.
    pub fn validate(&self) -> Result<()> {
        check_title(&self.title)?;
        check_description(&self.description)?;
        check_image(self.image_uri.as_deref())
    }
}

fn check_title(title: &str) -> Result<()> {
    if title.trim().chars().count() < MIN_TITLE_CHARS {
        return Err(EstuGrowError::ValidationFailed(format!(
            "Title must be at least {MIN_TITLE_CHARS} characters"
        )));
    }
    Ok(())
}

fn check_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(EstuGrowError::ValidationFailed(
            "Description must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn check_image(image_uri: Option<&str>) -> Result<()> {
    if image_uri.map_or(true, |uri| uri.trim().is_empty()) {
        return Err(EstuGrowError::ValidationFailed(
            "A photo is required".to_string(),
        ));
    }
    Ok(())
}

/// A partial update. Fields left as `None` keep their current value.
///
/// `image_uri` is doubly optional: `Some(None)` removes the photo reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_uri: Option<Option<String>>,
    pub priority: Option<Priority>,
}

impl NotePatch {
    /// True if applying the patch would not change any field.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image_uri.is_none()
            && self.priority.is_none()
    }

    /// Checks the fields this patch sets against the [`NoteDraft::validate`]
    /// rules. A patch may replace the photo but not remove it.
    ///
    /// # Errors
    ///
    /// Returns [`EstuGrowError::ValidationFailed`] naming the first rule broken.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        if let Some(image_uri) = &self.image_uri {
            check_image(image_uri.as_deref())?;
        }
        Ok(())
    }

    /// Replaces the patched fields on `note`. Timestamps are left to the caller.
    pub(crate) fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(description) = &self.description {
            note.description = description.clone();
        }
        if let Some(image_uri) = &self.image_uri {
            note.image_uri = image_uri.clone();
        }
        if let Some(priority) = self.priority {
            note.priority = priority;
        }
    }
}
