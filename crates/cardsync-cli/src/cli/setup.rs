use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cardsync", bin_name = "cardsync", version)]
#[command(about = "Offline-first business card contacts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Owner whose contacts to operate on
    #[arg(long, global = true, help_heading = "Options")]
    pub owner: Option<String>,

    /// Directory for the local cache and pending queue
    #[arg(long, global = true, help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Shared directory acting as the remote store
    #[arg(long, global = true, help_heading = "Options")]
    pub remote_dir: Option<PathBuf>,

    /// Act as if the remote store were unreachable
    #[arg(long, global = true, help_heading = "Options")]
    pub offline: bool,

    /// Config file (defaults to cardsync.toml in the config dir)
    #[arg(long, global = true, help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true, help_heading = "Options")]
    pub json: bool,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

/// Contact attributes accepted by `add`, `update` and `dupes`.
#[derive(Args, Debug, Default, Clone)]
pub struct FieldArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub mobile: Option<String>,
    #[arg(long)]
    pub fax: Option<String>,
    #[arg(long)]
    pub website: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub linkedin: Option<String>,
    #[arg(long)]
    pub twitter: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,

    /// Extra attribute as key=value (repeatable)
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub extra: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save a new contact
    #[command(alias = "a")]
    Add {
        #[command(flatten)]
        fields: FieldArgs,

        /// Display-only preview (e.g. a thumbnail reference)
        #[arg(long)]
        preview: Option<String>,

        /// Save even if likely duplicates exist
        #[arg(short, long)]
        force: bool,
    },

    /// List contacts
    #[command(alias = "ls")]
    List,

    /// Edit an existing contact
    Update {
        id: String,

        #[command(flatten)]
        fields: FieldArgs,

        /// Clear an attribute (repeatable)
        #[arg(long, value_name = "KEY")]
        clear: Vec<String>,
    },

    /// Delete a contact
    #[command(alias = "rm")]
    Delete { id: String },

    /// Show contacts that look like the given one
    Dupes {
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Show writes waiting to be synced
    Pending,

    /// Push queued writes to the remote store now
    Sync,
}
