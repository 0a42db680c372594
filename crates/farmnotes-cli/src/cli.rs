use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use farmnotes_core::models::CompletionFilter;

#[derive(Parser)]
#[command(name = "farmnotes")]
#[command(about = "Field notes for the farm, online or off")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to the local cache file
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_path: Option<PathBuf>,

    /// CLI profile name for backend and session configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Skip the connectivity probe and work from the local cache only
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title
        #[arg(required = true)]
        title: Vec<String>,
        /// Note body (read from piped stdin when omitted)
        #[arg(short, long)]
        content: Option<String>,
        /// Date the note refers to (YYYY-MM-DD, defaults to today)
        #[arg(short, long, value_name = "DATE")]
        date: Option<NaiveDate>,
        /// Mark the note completed on creation
        #[arg(long)]
        completed: bool,
    },
    /// List notes, newest first
    #[command(alias = "ls")]
    List {
        /// Completion status to show
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        /// Only notes whose title or content contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Earliest note date (inclusive)
        #[arg(long, value_name = "DATE")]
        from: Option<NaiveDate>,
        /// Latest note date (inclusive)
        #[arg(long, value_name = "DATE")]
        to: Option<NaiveDate>,
        /// Number of notes to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note (opens $EDITOR when no field is given)
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New body
        #[arg(long)]
        content: Option<String>,
        /// New note date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },
    /// Flip a note between pending and completed
    #[command(alias = "done")]
    Toggle {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Delete an existing note
    #[command(alias = "rm")]
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Push queued offline changes and reload from the backend
    Sync,
    /// Show connectivity, session and pending sync state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate a CLI profile with Supabase
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    All,
    Pending,
    Completed,
}

impl From<StatusFilter> for CompletionFilter {
    fn from(value: StatusFilter) -> Self {
        match value {
            StatusFilter::All => Self::All,
            StatusFilter::Pending => Self::Pending,
            StatusFilter::Completed => Self::Completed,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the selected profile and make it active
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Timeout for backend requests, in seconds
        #[arg(long, value_name = "SECONDS")]
        request_timeout_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved configuration for the selected profile
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password; the session is kept in the local cache
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show who the selected profile is signed in as
    Status,
    /// Revoke the session and forget it locally
    Logout,
}
