use crate::settings::StorageBackend;
use clap::{Parser, Subcommand};
use estugrow_core::Priority;
use std::path::PathBuf;

#[derive(Clone, Debug, Parser, PartialEq)]
#[command(version, about = "Capture, search and sort photographed study notes")]
pub struct CliConfig {
    /// Directory holding the note store (overrides the settings file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Storage backend (overrides the settings file)
    #[arg(long, global = true, value_enum)]
    pub backend: Option<StorageBackend>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Create a note
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Reference to an already captured photo
        #[arg(long)]
        image: Option<String>,
        #[arg(long, default_value_t = Priority::Medium)]
        priority: Priority,
    },
    /// List notes, newest first unless --oldest is given
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = false)]
        oldest: bool,
    },
    /// Show one note in full
    Show { id: String },
    /// Change fields of a note
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replacement photo; a note always keeps one
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Delete a note
    Delete { id: String },
    /// Print the effective settings, optionally saving the overrides
    Config {
        #[arg(long, default_value_t = false)]
        save: bool,
    },
}
