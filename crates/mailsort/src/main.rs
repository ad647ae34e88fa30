//! `mailsort` - sorts an IMAP inbox into labeled folders.
//!
//! Exit codes: 0 when a run completes (even if some mail stayed in the
//! inbox), 1 on configuration or connection errors, 130 when interrupted.

#![forbid(unsafe_code)]

mod cli;
mod logging;
mod output;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use mailsort_core::{Config, config};
use tracing::{error, info, warn};

use cli::{Cli, Command};

const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            logging::init(cli.verbose, None);
            error!(critical = true, "{err:#}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(cli.verbose, Some(&config.settings.log_dir));
    for label in config.rules.unfiltered_labels() {
        warn!(label = %label, "folder has no filter and will be skipped");
    }

    match dispatch(cli.command, &config).await {
        Ok(code) => code,
        Err(err) => {
            error!(critical = true, "{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = config::locate(cli.config.as_deref()).context("no configuration file")?;
    Config::load(&path).with_context(|| format!("invalid configuration in {}", path.display()))
}

async fn dispatch(command: Command, config: &Config) -> anyhow::Result<ExitCode> {
    match command {
        Command::Organize { dry_run, json } => organize(config, dry_run, json).await,
        Command::Unread => {
            let count = mailsort_core::count_unread(config)
                .await
                .context("could not count unread messages")?;
            println!("{count}");
            Ok(ExitCode::SUCCESS)
        }
        Command::ShowUnread { json } => {
            let messages = mailsort_core::show_unread(config)
                .await
                .context("could not list unread messages")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else {
                print!("{}", output::unread_list(&messages));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Rules => {
            print!("{}", output::rules(&config.rules));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn organize(config: &Config, dry_run: bool, json: bool) -> anyhow::Result<ExitCode> {
    let cancel = Arc::new(AtomicBool::new(false));
    let handle = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current folder");
            handle.store(true, Ordering::SeqCst);
        }
    });

    info!(server = %config.login.imap_server, dry_run, "starting mailsort");
    let report = mailsort_core::organize(config, dry_run, cancel)
        .await
        .context("run aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output::run_report(&report));
    }

    if report.cancelled {
        Ok(ExitCode::from(EXIT_CANCELLED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
