mod cli;
mod error;

use crate::cli::{Cli, Command, ListArgs};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use mediadex_catalog::{Database, EntryFilter};
use mediadex_config::Config;
use mediadex_extract::models::MediaKind;
use mediadex_folders::{FolderKey, FolderTree};
use mediadex_library::{DeleteOutcome, Library};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(parent) = config.database.parent() {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Catalog)?;
    }
    let db = Database::connect(&config.database).await.or_raise(|| ErrorKind::Catalog)?;
    let library = Library::new(&config, &db);
    let result = dispatch(cli.command, &config, &library).await;
    db.close().await;
    result
}

fn folder_key(raw: &str) -> Result<FolderKey> {
    raw.parse::<FolderKey>()
        .or_raise(|| ErrorKind::InvalidArgument(format!("not a folder key: {raw}")))
}

fn media_kind(raw: &str) -> Result<MediaKind> {
    raw.parse::<MediaKind>()
        .or_raise(|| ErrorKind::InvalidArgument(format!("unknown kind: {raw}")))
}

async fn dispatch(command: Command, config: &Config, library: &Library) -> Result<()> {
    match command {
        Command::Folders { refresh } => {
            let tree = library.resolve(refresh).await.or_raise(|| ErrorKind::Library)?;
            print_tree(&tree, &FolderKey::root(), 0);
        },
        Command::Sync { key, full } => {
            let key = key.as_deref().map(folder_key).transpose()?.unwrap_or_else(FolderKey::root);
            let report = library.sync(&key, full).await.or_raise(|| ErrorKind::Library)?;
            println!(
                "discovered {}, added {}, updated {}, removed {}, unchanged {}, degraded {}",
                report.discovered, report.added, report.updated, report.removed, report.unchanged, report.degraded
            );
            for error in &report.errors {
                println!("failed: {}: {}", error.path.display(), error.message);
            }
        },
        Command::Sweep { days } => {
            let days = days.unwrap_or(config.trash_retention_days);
            let report = library.janitor().sweep(days).await.or_raise(|| ErrorKind::Library)?;
            println!("deleted {}", report.deleted);
            for error in &report.errors {
                println!("failed: {}: {}", error.path.display(), error.message);
            }
        },
        Command::List(args) => list(library, args).await?,
        Command::Favorite { identity, unset } => {
            if !library.set_favorite(&identity, !unset).await.or_raise(|| ErrorKind::Library)? {
                exn::bail!(ErrorKind::InvalidArgument(format!("no such entry: {identity}")));
            }
        },
        Command::Mkdir { parent, name } => {
            let key = library.create_folder(&folder_key(&parent)?, &name).await.or_raise(|| ErrorKind::Library)?;
            println!("{key}");
        },
        Command::RenameFolder { key, name } => {
            let key = library.rename_folder(&folder_key(&key)?, &name).await.or_raise(|| ErrorKind::Library)?;
            println!("{key}");
        },
        Command::Rmdir { key } => {
            let outcome = library.delete_folder(&folder_key(&key)?).await.or_raise(|| ErrorKind::Library)?;
            print_outcome(&outcome);
        },
        Command::Rename { path, name } => {
            let entry = library.rename_file(&path, &name).await.or_raise(|| ErrorKind::Library)?;
            if let Some(entry) = entry {
                println!("{}", entry.identity);
            }
        },
        Command::Rm { path } => {
            let outcome = library.delete_file(&path).await.or_raise(|| ErrorKind::Library)?;
            print_outcome(&outcome);
        },
        Command::Thumbnails { prune } => match prune {
            true => {
                let pruned = library.prune_thumbnails().await.or_raise(|| ErrorKind::Library)?;
                println!("pruned {pruned}");
            },
            false => {
                for entry in library.pending_thumbnails().await.or_raise(|| ErrorKind::Library)? {
                    println!("{}\t{}", library.thumbnails().path_for(&entry.identity).display(), entry.path.display());
                }
            },
        },
    }
    Ok(())
}

async fn list(library: &Library, args: ListArgs) -> Result<()> {
    let mut filter = EntryFilter::all();
    filter.favorites_only = args.favorites;
    if let Some(kind) = args.kind {
        filter = filter.of_kind(media_kind(&kind)?);
    }
    let key = args.folder.as_deref().map(folder_key).transpose()?.unwrap_or_else(FolderKey::root);
    let entries = library.list_folder(&key, filter).await.or_raise(|| ErrorKind::Library)?;
    for entry in entries {
        let dimensions = entry.dimensions.map(|d| d.to_string()).unwrap_or_default();
        let duration = entry.duration.map(|d| d.to_string()).unwrap_or_default();
        println!(
            "{}\t{}\t{}\t{}\t{}{}{}",
            entry.identity,
            entry.kind,
            dimensions,
            duration,
            entry.path.display(),
            if entry.has_workflow { "\tworkflow" } else { "" },
            if entry.favorite { "\tfavorite" } else { "" },
        );
    }
    Ok(())
}

fn print_tree(tree: &FolderTree, key: &FolderKey, depth: usize) {
    if let Some(node) = tree.get(key) {
        println!("{:indent$}{}\t{}", "", node.name, node.key, indent = depth * 2);
    }
    for child in tree.children(key) {
        print_tree(tree, &child.key, depth + 1);
    }
}

fn print_outcome(outcome: &DeleteOutcome) {
    match outcome {
        DeleteOutcome::Trashed(path) => println!("moved to {}", path.display()),
        DeleteOutcome::Removed => println!("deleted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_key_argument() {
        assert!(folder_key("root").unwrap().is_root());
        let key = FolderKey::from_path("/srv/media/renders");
        assert_eq!(folder_key(key.as_str()).unwrap(), key);
        let err = folder_key("not a key!").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArgument(_)));
    }

    #[test]
    fn test_media_kind_argument() {
        assert_eq!(media_kind("video").unwrap(), MediaKind::Video);
        assert_eq!(media_kind("Animated").unwrap(), MediaKind::Animated);
        let err = media_kind("audio").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArgument(_)));
    }
}
