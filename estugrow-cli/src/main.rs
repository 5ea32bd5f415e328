mod cli;
mod commands;
mod settings;

use clap::Parser;
use cli::{CliConfig, Command};
use commands::{execute, CliError};
use estugrow_core::{FileKvStore, KvStore, NoteStore, SqliteKvStore};
use settings::{AppSettings, StorageBackend};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let config = CliConfig::parse();
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(config: CliConfig) -> Result<(), CliError> {
    let settings = effective_settings(settings::load_settings(), &config);

    if let Command::Config { save } = config.command {
        if save {
            settings::save_settings(&settings).map_err(CliError::Settings)?;
            log::info!("Saved settings to {}", settings::settings_file_path().display());
        }
        println!("dataDirectory: {}", settings.data_directory);
        println!("backend:       {:?}", settings.backend);
        return Ok(());
    }

    std::fs::create_dir_all(&settings.data_directory).map_err(|e| {
        CliError::Settings(format!(
            "Could not create data directory {}: {e}",
            settings.data_directory
        ))
    })?;

    match settings.backend {
        StorageBackend::Sqlite => {
            let kv = SqliteKvStore::open_or_create(settings.database_path())
                .map_err(estugrow_core::EstuGrowError::from)?;
            run_with_store(NoteStore::new(kv), config.command).await
        }
        StorageBackend::File => {
            let kv = FileKvStore::new(&settings.data_directory);
            run_with_store(NoteStore::new(kv), config.command).await
        }
    }
}

async fn run_with_store<S: KvStore>(store: NoteStore<S>, command: Command) -> Result<(), CliError> {
    store.subscribe(|event| log::debug!("Store event: {event:?}"));
    store.initialize().await?;

    let mut stdout = std::io::stdout().lock();
    let result = execute(&store, command, &mut stdout).await;
    store.close().await;
    result
}

fn effective_settings(mut settings: AppSettings, config: &CliConfig) -> AppSettings {
    if let Some(dir) = &config.data_dir {
        settings.data_directory = dir.to_string_lossy().to_string();
    }
    if let Some(backend) = config.backend {
        settings.backend = backend;
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings_file() {
        let config = CliConfig::try_parse_from([
            "estugrow", "--data-dir", "/elsewhere", "--backend", "file", "delete", "x",
        ])
        .unwrap();
        let base = AppSettings {
            data_directory: "/from-file".to_string(),
            backend: StorageBackend::Sqlite,
        };

        let merged = effective_settings(base, &config);
        assert_eq!(merged.data_directory, "/elsewhere");
        assert_eq!(merged.backend, StorageBackend::File);
    }

    #[test]
    fn test_no_flags_keep_settings_file() {
        let config = CliConfig::try_parse_from(["estugrow", "show", "x"]).unwrap();
        let base = AppSettings {
            data_directory: "/from-file".to_string(),
            backend: StorageBackend::File,
        };
        assert_eq!(effective_settings(base.clone(), &config), base);
    }

    #[tokio::test]
    async fn test_file_backend_persists_between_runs() {
        let dir = tempfile::TempDir::new().unwrap();
        let add = Command::Add {
            title: "Repaso".to_string(),
            description: "x".to_string(),
            image: Some("img1".to_string()),
            priority: estugrow_core::Priority::High,
        };
        run_with_store(NoteStore::new(FileKvStore::new(dir.path())), add)
            .await
            .unwrap();

        let store = NoteStore::new(FileKvStore::new(dir.path()));
        store.initialize().await.unwrap();
        let notes = store.get_all().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Repaso");
    }
}
