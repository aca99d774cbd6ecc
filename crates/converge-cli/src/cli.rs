//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use converge_schema::ProductVersion;

/// converge - Offline planning for declarative remote configuration
#[derive(Parser, Debug)]
#[command(name = "converge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding converge.toml (defaults to the current directory)
    #[arg(short, long, global = true, env = "CONVERGE_CONFIG_DIR")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Check a plan file without contacting anything
    ///
    /// Runs the version gate, variant resolution and canonicalization, and
    /// builds the request that creating the object would send.
    ///
    /// Examples:
    ///   converge validate plan.json
    ///   converge validate plan.json --remote-version 9.1
    Validate {
        /// Plan file (JSON configuration object)
        plan: PathBuf,

        /// Version of the remote service, overriding [remote] version
        #[arg(long, env = "CONVERGE_REMOTE_VERSION")]
        remote_version: Option<ProductVersion>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the operations that would converge a state to a plan
    ///
    /// Without --state the object is treated as absent and the create
    /// request is shown instead.
    ///
    /// Examples:
    ///   converge diff plan.json --state state.json
    ///   converge diff plan.json --json
    Diff {
        /// Plan file (JSON configuration object)
        plan: PathBuf,

        /// Last observed state (JSON configuration object)
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Version of the remote service, overriding [remote] version
        #[arg(long, env = "CONVERGE_REMOTE_VERSION")]
        remote_version: Option<ProductVersion>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Parse an import identifier for a resource type
    ///
    /// Examples:
    ///   converge import-id local_db_index userRoot/uid
    ///   converge import-id request_criteria writes --json
    ImportId {
        /// Resource type name
        resource: String,

        /// Identifier, e.g. "[backend_name]/[name]"
        id: String,

        /// Segment delimiter, overriding [import] delimiter
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Print a plan skeleton as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect the schema registry
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

/// Schema registry actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SchemaAction {
    /// List every registered resource type
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the attributes of one resource type
    Show {
        /// Resource type name
        resource: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
