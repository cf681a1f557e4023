pub mod cli;
pub mod controller;
pub mod core;
pub mod files;
pub mod shared;
pub mod storage;
pub mod tags;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::cli::{Cli, Command};
use crate::controller::TagController;
use crate::core::settings::{load_settings, save_settings, AppSettings};
use crate::core::watch::{DirectoryWatcher, WatchConfig};
use crate::files::fs::{DeleteMode, LocalFileSystem};
use crate::shared::paths::get_storage_dir;
use crate::storage::SqliteTagStore;
use crate::tags::commands;
use crate::tags::filter::{MatchMode, SearchDebouncer};

type Controller = TagController<LocalFileSystem, SqliteTagStore>;

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

/// Entry point for the `tagshelf` binary.
pub async fn run(cli: Cli) -> Result<(), String> {
    if let Err(e) = crate::core::logging::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let mut settings = load_settings();
    let db = storage::init_database(&get_storage_dir())
        .map_err(|e| format!("Failed to initialize database: {}", e))?;
    let store = SqliteTagStore::new(Arc::new(db));
    let ctl = TagController::new(LocalFileSystem::new(), store).map_err(|e| e.to_string())?;

    tracing::info!(target: "system", command = cli.command.name(), "Running command");

    match cli.command {
        Command::List { dir, recursive, all, any, search } => {
            let recursive = recursive || settings.recursive_scan;
            if !all.is_empty() {
                commands::filter_set(&ctl, all, MatchMode::All);
            } else if !any.is_empty() {
                commands::filter_set(&ctl, any, MatchMode::Any);
            } else {
                commands::filter_clear(&ctl);
            }
            list(&ctl, &mut settings, dir, recursive, search).await
        }
        Command::Tags { file } => print_json(&commands::file_tags(&ctl, file)),
        Command::Set { file, tags } => print_json(&commands::file_set_tags(&ctl, file, tags).await),
        Command::Add { file, tag } => print_json(&commands::file_add_tag(&ctl, file, tag).await),
        Command::Remove { file, tag } => print_json(&commands::file_remove_tag(&ctl, file, tag).await),
        Command::Reorder { file, from, to } => {
            print_json(&commands::file_reorder_tag(&ctl, file, from, to).await)
        }
        Command::Accept { file, suggestion } => {
            print_json(&commands::file_confirm_rename(&ctl, file, suggestion).await)
        }
        Command::Rename { file, new_name } => print_json(&commands::file_rename(&ctl, file, new_name).await?),
        Command::Mv { dest_dir, paths } => print_json(&commands::files_move(&ctl, paths, dest_dir).await),
        Command::Cp { dest_dir, paths } => print_json(&commands::files_copy(&ctl, paths, dest_dir).await),
        Command::Rm { permanent, paths } => {
            let mode = if permanent { DeleteMode::Permanent } else { settings.delete_mode };
            print_json(&commands::files_delete(&ctl, paths, mode).await)
        }
        Command::Groups => print_json(&commands::tag_groups_get(&ctl)),
        Command::GroupAdd { name, color, description } => {
            print_json(&commands::tag_group_create(&ctl, name, color, description)?)
        }
        Command::GroupRm { group_id } => commands::tag_group_delete(&ctl, group_id),
        Command::TagAdd { group_id, name, color } => {
            print_json(&commands::tag_create(&ctl, group_id, name, color, None)?)
        }
        Command::TagRm { tag_id } => commands::tag_delete(&ctl, tag_id),
        Command::TagMv { tag_id, group_id } => print_json(&commands::tag_move(&ctl, tag_id, group_id)?),
        Command::Watch { dir } => watch(&ctl, &settings, dir).await,
    }
}

async fn list(
    ctl: &Controller,
    settings: &mut AppSettings,
    dir: String,
    recursive: bool,
    search: Option<String>,
) -> Result<(), String> {
    let query = match search {
        Some(query) => {
            let debouncer = SearchDebouncer::new(std::time::Duration::from_millis(settings.search_debounce_ms));
            debouncer.debounce(query).await
        }
        None => None,
    };

    let entries = commands::files_list(ctl, dir.clone(), recursive, query).await?;
    print_json(&entries)?;

    settings.last_directory = Some(dir);
    if let Err(e) = save_settings(settings) {
        tracing::warn!(target: "system", "Failed to save settings: {}", e);
    }
    Ok(())
}

/// Rescans `dir` every time something outside this process changes it.
async fn watch(ctl: &Controller, settings: &AppSettings, dir: String) -> Result<(), String> {
    let root = PathBuf::from(&dir);
    let mode = settings.scan_mode();

    ctl.scan(&root, mode).await.map_err(|e| e.to_string())?;
    print_json(&ctl.index())?;

    if !settings.watch_directories {
        return Ok(());
    }

    let (watcher, mut events) = DirectoryWatcher::new(ctl.self_writes());
    watcher.watch_only(WatchConfig::new(root.clone()).recursive(settings.recursive_scan))?;

    while let Some(event) = events.recv().await {
        tracing::info!(
            target: "core::watch",
            root = %event.root.display(),
            changed = event.paths.len(),
            "Rescanning after external change"
        );
        if let Err(e) = ctl.scan(&event.root, mode).await {
            tracing::warn!(target: "tags", error = %e, "Rescan failed");
            continue;
        }
        print_json(&ctl.index())?;
    }

    watcher.stop_all()
}
