//! Executes one parsed command against an initialised note store.

use crate::cli::Command;
use estugrow_core::{
    EstuGrowError, KvStore, Note, NoteDraft, NotePatch, NoteQuery, NoteStore, SortDirection,
};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] EstuGrowError),

    #[error("Output error: {0}")]
    Io(#[from] io::Error),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl CliError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(e) => e.user_message(),
            Self::Io(e) => format!("Could not write output: {e}"),
            Self::Settings(msg) => msg.clone(),
        }
    }
}

pub async fn execute<S: KvStore>(
    store: &NoteStore<S>,
    command: Command,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        Command::Add {
            title,
            description,
            image,
            priority,
        } => {
            let draft = NoteDraft {
                title,
                description,
                image_uri: image,
                priority,
            };
            draft.validate()?;
            let note = store.add_note(draft).await?;
            writeln!(out, "{}", note.id)?;
        }
        Command::List { search, oldest } => {
            let direction = if oldest {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            let notes = store.get_all()?;
            let listed = NoteQuery::new(search, direction).apply(&notes);
            if listed.is_empty() {
                writeln!(out, "No notes yet")?;
            }
            for note in &listed {
                writeln!(out, "{}", summary_line(note))?;
            }
        }
        Command::Show { id } => {
            let note = store.get_note(&id)?;
            write_details(out, &note)?;
        }
        Command::Edit {
            id,
            title,
            description,
            image,
            priority,
        } => {
            let patch = NotePatch {
                title,
                description,
                image_uri: image.map(Some),
                priority,
            };
            patch.validate()?;
            let note = store.update_note(&id, patch).await?;
            write_details(out, &note)?;
        }
        Command::Delete { id } => {
            store.delete_note(&id).await?;
            writeln!(out, "Deleted {id}")?;
        }
        Command::Config { .. } => {
            return Err(CliError::Settings(
                "The config command does not use the note store".to_string(),
            ));
        }
    }
    Ok(())
}

fn display_time(note: &Note) -> String {
    note.last_modified()
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn summary_line(note: &Note) -> String {
    format!(
        "{}  [{}] {}  ({})",
        note.id,
        note.priority.label(),
        note.title,
        display_time(note)
    )
}

fn write_details(out: &mut impl Write, note: &Note) -> io::Result<()> {
    writeln!(out, "id:          {}", note.id)?;
    writeln!(out, "title:       {}", note.title)?;
    writeln!(out, "priority:    {}", note.priority.label())?;
    writeln!(out, "photo:       {}", note.image_uri.as_deref().unwrap_or("-"))?;
    writeln!(out, "created:     {}", note.created_at.to_rfc3339())?;
    writeln!(out, "updated:     {}", note.last_modified().to_rfc3339())?;
    writeln!(out, "description:")?;
    writeln!(out, "{}", note.description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use estugrow_core::{encode_notes, MemoryKvStore, Priority, NOTES_KEY};

    async fn ready_store() -> NoteStore<MemoryKvStore> {
        seeded_store(&[]).await
    }

    async fn seeded_store(notes: &[Note]) -> NoteStore<MemoryKvStore> {
        let kv = MemoryKvStore::with_entry(NOTES_KEY, encode_notes(notes).unwrap());
        let store = NoteStore::new(kv);
        store.initialize().await.unwrap();
        store
    }

    fn stored(id: &str, title: &str, secs: i64) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            description: "resumen".to_string(),
            image_uri: Some(format!("file:///{id}.jpg")),
            priority: Priority::High,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            updated_at: None,
        }
    }

    async fn run(store: &NoteStore<MemoryKvStore>, command: Command) -> Result<String, CliError> {
        let mut out = Vec::new();
        execute(store, command, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn add(title: &str) -> Command {
        Command::Add {
            title: title.to_string(),
            description: "resumen".to_string(),
            image: Some("file:///foto.jpg".to_string()),
            priority: Priority::High,
        }
    }

    #[tokio::test]
    async fn test_add_prints_new_id() {
        let store = ready_store().await;
        let out = run(&store, add("Repaso")).await.unwrap();

        let notes = store.get_all().unwrap();
        assert_eq!(out.trim(), notes[0].id);
        assert_eq!(notes[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_draft() {
        let store = ready_store().await;
        let result = run(&store, add("ab")).await;

        assert!(matches!(
            result,
            Err(CliError::Store(EstuGrowError::ValidationFailed(_)))
        ));
        assert!(store.get_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let store = seeded_store(&[
            stored("c", "Redes avanzadas", 300),
            stored("b", "Cálculo", 200),
            stored("a", "Repaso de redes", 100),
        ])
        .await;

        let out = run(
            &store,
            Command::List {
                search: "REDES".to_string(),
                oldest: true,
            },
        )
        .await
        .unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Repaso de redes"));
        assert!(lines[1].contains("Redes avanzadas"));
        assert!(lines[0].contains("[Alta]"));
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let store = ready_store().await;
        let out = run(
            &store,
            Command::List {
                search: String::new(),
                oldest: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(out.trim(), "No notes yet");
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let store = ready_store().await;
        let id = run(&store, add("Original")).await.unwrap().trim().to_string();

        let out = run(
            &store,
            Command::Edit {
                id: id.clone(),
                title: Some("Nuevo".to_string()),
                description: None,
                image: Some("file:///nueva.jpg".to_string()),
                priority: Some(Priority::Low),
            },
        )
        .await
        .unwrap();
        assert!(out.contains("title:       Nuevo"));
        assert!(out.contains("photo:       file:///nueva.jpg"));
        assert!(out.contains("priority:    Baja"));

        run(&store, Command::Delete { id: id.clone() }).await.unwrap();
        let missing = run(&store, Command::Show { id }).await;
        assert!(matches!(
            missing,
            Err(CliError::Store(EstuGrowError::NoteNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_edit_rejects_invalid_fields_and_keeps_note() {
        let store = ready_store().await;
        let id = run(&store, add("Original")).await.unwrap().trim().to_string();
        let before = store.get_note(&id).unwrap();

        let edit = |title: &str, description: &str| Command::Edit {
            id: id.clone(),
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            image: None,
            priority: None,
        };
        for command in [edit("", "resumen"), edit("ab", "resumen"), edit("Valido", " ")] {
            let result = run(&store, command).await;
            assert!(matches!(
                result,
                Err(CliError::Store(EstuGrowError::ValidationFailed(_)))
            ));
        }
        assert_eq!(store.get_note(&id).unwrap(), before);
    }
}
