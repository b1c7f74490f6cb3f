use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mediadex", version, about = "Catalog and index a library of generated images and videos")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON), layered over the global one.
    #[arg(short, long, global = true, env = "MEDIADEX_CONFIG")]
    pub config: Option<PathBuf>,
    /// More logging; repeat for even more.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the folder tree with its keys.
    Folders {
        /// Walk the filesystem again instead of using the cached tree.
        #[arg(long)]
        refresh: bool,
    },
    /// Bring the catalog in line with the files on disk.
    Sync {
        /// Folder key to sync; every root when omitted.
        key: Option<String>,
        /// Extract every file again, not only new and modified ones.
        #[arg(long)]
        full: bool,
    },
    /// Delete expired entries from the trash and staging regions.
    Sweep {
        /// Maximum age in days; the configured trash retention when omitted.
        #[arg(long)]
        days: Option<u64>,
    },
    /// List cataloged files.
    List(ListArgs),
    /// Mark or unmark a file as a favorite.
    Favorite {
        identity: String,
        #[arg(long)]
        unset: bool,
    },
    /// Create a folder.
    Mkdir { parent: String, name: String },
    /// Rename a folder.
    RenameFolder { key: String, name: String },
    /// Delete a folder (into the trash, if soft delete is enabled).
    Rmdir { key: String },
    /// Rename a file.
    Rename { path: PathBuf, name: String },
    /// Delete a file (into the trash, if soft delete is enabled).
    Rm { path: PathBuf },
    /// List files whose thumbnail is missing or out of date.
    Thumbnails {
        /// Delete thumbnails of files that are no longer cataloged instead.
        #[arg(long)]
        prune: bool,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only files at or below this folder key.
    #[arg(long)]
    pub folder: Option<String>,
    #[arg(long)]
    pub favorites: bool,
    /// Only files of this kind: image, animated, video or unknown.
    #[arg(long)]
    pub kind: Option<String>,
}
