use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

use crate::config::HOME_ENV;
use crate::sync::OperationKind;

#[derive(Parser)]
#[command(name = "kitchen-queue")]
#[command(about = "Offline mutation queue for the kitchen terminal")]
#[command(long_about = "kitchen-queue - offline writes for the kitchen terminal

Buffers database writes made while the terminal is disconnected, keeps them
in a local SQLite mirror and replays them against the remote row store
(PostgREST / Supabase) once connectivity returns.

QUICK START:
  kitchen-queue add --table orders --kind insert --data '{\"id\":\"o1\",\"total\":18}'
  kitchen-queue status            How many writes are waiting
  kitchen-queue run               Sync now
  kitchen-queue watch             Stay up, sync whenever the network returns

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Defaults to `general.default_output` from config.yaml (pretty).
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Data directory holding config.yaml and queue.db
    #[arg(long, global = true, env = HOME_ENV)]
    pub root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show queue status
    ///
    /// Pending operations, dead letters and the age of the oldest write.
    #[command(alias = "s")]
    Status,

    /// List pending operations in replay order
    #[command(alias = "ls")]
    List {
        /// Maximum operations to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Queue a write
    ///
    /// The write is stored locally and sent on the next sync.
    ///
    /// # Examples
    ///
    ///   kitchen-queue add -t orders -k insert -d '{"id":"o1","total":18}'
    ///   kitchen-queue add -t orders -k update -d '{"id":"o1","status":"ready"}'
    ///   kitchen-queue add -t orders -k delete -d '{"id":"o1"}'
    #[command(alias = "a")]
    Add(AddArgs),

    /// Sync pending operations now
    ///
    /// Runs one replay pass against the configured remote store. Failed
    /// operations stay queued for the next run.
    Run,

    /// Remove every pending operation
    Clear {
        /// Required: clearing drops unsynced writes
        #[arg(long)]
        force: bool,
    },

    /// Inspect or recover operations evicted after repeated failures
    #[command(name = "dead-letter", alias = "dl")]
    DeadLetter(DeadLetterArgs),

    /// Stay running and sync whenever the remote store is reachable
    ///
    /// Probes the remote store every `queue.probe_interval_secs` seconds,
    /// replays on reconnect and exits on Ctrl-C.
    Watch,

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct AddArgs {
    /// Remote table the write applies to
    #[arg(long, short = 't')]
    pub table: String,

    /// Write kind
    #[arg(long, short = 'k', value_enum)]
    pub kind: KindArg,

    /// Row as a JSON object (update and delete need the row id)
    #[arg(long, short = 'd')]
    pub data: String,
}

/// Operation kind as accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    Insert,
    Update,
    Delete,
}

impl From<KindArg> for OperationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Insert => Self::Insert,
            KindArg::Update => Self::Update,
            KindArg::Delete => Self::Delete,
        }
    }
}

#[derive(Args)]
pub struct DeadLetterArgs {
    #[command(subcommand)]
    pub command: DeadLetterCommands,
}

/// Dead-letter subcommands.
#[derive(Subcommand)]
pub enum DeadLetterCommands {
    /// List dead letters
    List {
        /// Maximum operations to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Move every dead letter back into the queue
    Retry,

    /// Drop every dead letter
    Purge {
        /// Required: purging drops unsynced writes
        #[arg(long)]
        force: bool,
    },
}
