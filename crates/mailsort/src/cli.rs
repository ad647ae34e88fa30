//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mailsort_core::config::CONFIG_ENV;

/// Sorts an IMAP inbox into labeled folders.
#[derive(Debug, Parser)]
#[command(name = "mailsort", version, about)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move inbox messages into their rule folders.
    Organize {
        /// Search and report without moving anything.
        #[arg(long)]
        dry_run: bool,
        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the number of unread inbox messages.
    Unread,
    /// List sender, subject and date of unread inbox messages.
    ShowUnread {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print every rule folder with its search filter, offline.
    Rules,
}
