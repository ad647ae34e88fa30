//! Connected operations.
//!
//! Each function opens one session, does its work and logs out on every
//! path, including when the work itself failed.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::warn;

use crate::config::Config;
use crate::engine::{Engine, RunOptions, RunReport};
use crate::session::{ImapSession, MailSession};
use crate::unread::{self, UnreadMessage};
use crate::Result;

/// Builds run options from the configuration.
#[must_use]
pub fn run_options(config: &Config, dry_run: bool) -> RunOptions {
    RunOptions {
        inbox: config.settings.inbox.clone(),
        folder_delimiter: config.settings.folder_delimiter.clone(),
        dry_run,
    }
}

/// Connects and runs the classification engine.
///
/// # Errors
///
/// Returns an error if the connection or the inbox baseline fails.
pub async fn organize(config: &Config, dry_run: bool, cancel: Arc<AtomicBool>) -> Result<RunReport> {
    let mut session = ImapSession::connect(&config.login, &config.settings).await?;
    let engine = Engine::new(&config.rules, run_options(config, dry_run)).with_cancel(cancel);

    let report = engine.run(&mut session).await;
    close(session).await;
    Ok(report?)
}

/// Connects and counts unread inbox messages.
///
/// # Errors
///
/// Returns an error if the connection, SELECT or SEARCH fails.
pub async fn count_unread(config: &Config) -> Result<usize> {
    let mut session = ImapSession::connect(&config.login, &config.settings).await?;
    let count = unread::unread_count(&mut session, &config.settings.inbox).await;
    close(session).await;
    Ok(count?)
}

/// Connects and lists unread inbox messages.
///
/// # Errors
///
/// Returns an error if the connection, SELECT or SEARCH fails.
pub async fn show_unread(config: &Config) -> Result<Vec<UnreadMessage>> {
    let mut session = ImapSession::connect(&config.login, &config.settings).await?;
    let messages = unread::list_unread(&mut session, &config.settings.inbox).await;
    close(session).await;
    Ok(messages?)
}

async fn close<S: MailSession>(session: S) {
    if let Err(err) = session.logout().await {
        warn!(error = %err, "logout failed");
    }
}
