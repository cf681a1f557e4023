//! Command line arguments for the `tagshelf` binary.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tagshelf", version)]
#[command(about = "Tag files by name: `[tag1 tag2] name.ext`")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List a folder with resolved tags
    List {
        dir: String,
        /// Include subfolders
        #[arg(short, long)]
        recursive: bool,
        /// Only files carrying every listed tag
        #[arg(long, value_delimiter = ',', conflicts_with = "any")]
        all: Vec<String>,
        /// Only files carrying at least one listed tag
        #[arg(long, value_delimiter = ',')]
        any: Vec<String>,
        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Print the tags of one file
    Tags { file: String },
    /// Replace the tags of a file
    Set { file: String, tags: Vec<String> },
    /// Add one tag to a file
    Add { file: String, tag: String },
    /// Remove one tag from a file
    Remove { file: String, tag: String },
    /// Move a tag within a file's tag list
    Reorder { file: String, from: usize, to: usize },
    /// Accept a suggested name after a collision
    Accept { file: String, suggestion: String },
    /// Rename a file or folder in place
    Rename { file: String, new_name: String },
    /// Move entries into a folder
    Mv {
        dest_dir: String,
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Copy entries into a folder
    Cp {
        dest_dir: String,
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Delete entries, to the trash unless configured otherwise
    Rm {
        /// Skip the trash
        #[arg(long)]
        permanent: bool,
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Print the tag library
    Groups,
    /// Create a tag group
    GroupAdd {
        name: String,
        color: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a tag group and its tags
    GroupRm { group_id: String },
    /// Create a library tag
    TagAdd {
        group_id: String,
        name: String,
        color: Option<String>,
    },
    /// Delete a library tag
    TagRm { tag_id: String },
    /// Move a library tag to another group
    TagMv { tag_id: String, group_id: String },
    /// Index a folder and rescan on outside changes
    Watch { dir: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::List { .. } => "list",
            Command::Tags { .. } => "tags",
            Command::Set { .. } => "set",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
            Command::Reorder { .. } => "reorder",
            Command::Accept { .. } => "accept",
            Command::Rename { .. } => "rename",
            Command::Mv { .. } => "mv",
            Command::Cp { .. } => "cp",
            Command::Rm { .. } => "rm",
            Command::Groups => "groups",
            Command::GroupAdd { .. } => "group-add",
            Command::GroupRm { .. } => "group-rm",
            Command::TagAdd { .. } => "tag-add",
            Command::TagRm { .. } => "tag-rm",
            Command::TagMv { .. } => "tag-mv",
            Command::Watch { .. } => "watch",
        }
    }
}
