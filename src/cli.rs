use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediabridge")]
#[command(about = "Resolve and replace catalog-managed media files", long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Volume directory (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    pub volume: Option<PathBuf>,

    /// Platform tier (overrides config)
    #[arg(long, global = true)]
    pub tier: Option<u32>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find the catalog identifier for an absolute path
    ResolveId {
        path: String,
    },

    /// Find the path of a catalog or document identifier
    ResolvePath {
        identifier: String,
    },

    /// Translate a document identifier into a catalog identifier
    Translate {
        identifier: String,
    },

    /// Overwrite the resource at an identifier with a staging file
    Replace {
        identifier: String,

        /// File holding the new content
        staging: PathBuf,
    },

    /// Ask up front for write access to one or more identifiers
    RequestWrite {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },

    /// Answer a pending grant prompt
    #[command(group(ArgGroup::new("answer").required(true).args(["approve", "deny", "dismiss"])))]
    Consent {
        /// Correlation token printed by `replace` or `request-write`
        token: String,

        #[arg(long)]
        approve: bool,

        #[arg(long)]
        deny: bool,

        #[arg(long)]
        dismiss: bool,
    },

    /// List grant prompts waiting for an answer
    Pending,

    /// Index every media file on the volume
    Scan {
        /// Register new files as written by this app
        #[arg(long)]
        owned: bool,
    },

    /// Register or refresh a single file
    ScanFile {
        /// Absolute logical path of the file
        path: String,

        #[arg(long)]
        owned: bool,
    },

    /// Show config status and location, or create default config if missing
    InitConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}
