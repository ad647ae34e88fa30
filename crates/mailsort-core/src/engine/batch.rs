//! Relocation of one leaf's matches.
//!
//! Each step reports per-id results, so an id whose copy failed can never
//! reach the delete step.

use tracing::{debug, error, info, warn};

use crate::rules::FolderPath;
use crate::session::{Flag, FlagDelta, MailSession, MessageId, SessionError};

/// Ids matched by one query and the folder they are going to.
#[derive(Debug, Clone)]
pub struct MoveBatch {
    /// Destination as configured.
    pub folder: FolderPath,
    /// Destination wire name, already checked to exist.
    pub destination: String,
    /// Ids in the source folder.
    pub ids: Vec<MessageId>,
}

/// Per-id results of executing a batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Confirmed copies: source id and destination id if reported.
    pub copied: Vec<(MessageId, Option<MessageId>)>,
    /// Ids whose copy failed. They stay in the source folder.
    pub copy_failures: Vec<(MessageId, SessionError)>,
    /// Ids flagged `\Deleted` after a confirmed copy.
    pub deleted: Vec<MessageId>,
    /// Ids whose `\Deleted` flag could not be set.
    pub delete_failures: Vec<(MessageId, SessionError)>,
    /// Whether the expunge after flagging succeeded.
    pub expunged: bool,
    /// Ids still flagged `\Deleted` after a failed expunge, because the
    /// flag could not be taken back. The next expunge removes them.
    pub left_deleted: Vec<MessageId>,
    /// Destination copies whose `\Seen` flag was removed.
    pub marked_unread: usize,
}

impl BatchOutcome {
    /// Messages that are now only in the destination.
    #[must_use]
    pub fn routed(&self) -> usize {
        if self.expunged { self.deleted.len() } else { 0 }
    }
}

impl MoveBatch {
    /// Copies, deletes and expunges the batch, then marks the copies unread.
    ///
    /// The source folder must be selected.
    pub async fn execute<S: MailSession>(&self, session: &mut S) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for &id in &self.ids {
            match session.copy(id, &self.destination).await {
                Ok(dest) => outcome.copied.push((id, dest)),
                Err(err) => {
                    error!(folder = %self.folder, %id, error = %err, "copy failed; message stays in place");
                    outcome.copy_failures.push((id, err));
                }
            }
        }

        for &(id, _) in &outcome.copied {
            match session.set_flags(id, FlagDelta::Add(Flag::Deleted)).await {
                Ok(()) => outcome.deleted.push(id),
                Err(err) => {
                    error!(folder = %self.folder, %id, error = %err, "could not flag copied message as deleted");
                    outcome.delete_failures.push((id, err));
                }
            }
        }

        // Issued even when nothing was flagged.
        match session.expunge().await {
            Ok(()) => outcome.expunged = true,
            Err(err) => {
                error!(folder = %self.folder, error = %err, critical = true, "expunge failed; copies may be duplicated");
                self.undelete(session, &mut outcome).await;
            }
        }

        if outcome.expunged && !outcome.deleted.is_empty() {
            outcome.marked_unread = self.mark_unread(session, &outcome).await;
        }

        info!(
            folder = %self.folder,
            matched = self.ids.len(),
            copied = outcome.copied.len(),
            failed = outcome.copy_failures.len(),
            routed = outcome.routed(),
            "leaf processed"
        );

        outcome
    }

    /// Takes `\Deleted` back so the originals really stay in the source.
    async fn undelete<S: MailSession>(&self, session: &mut S, outcome: &mut BatchOutcome) {
        for &id in &outcome.deleted {
            if let Err(err) = session.set_flags(id, FlagDelta::Remove(Flag::Deleted)).await {
                warn!(folder = %self.folder, %id, error = %err, "message stays flagged for deletion");
                outcome.left_deleted.push(id);
            }
        }
    }

    async fn mark_unread<S: MailSession>(&self, session: &mut S, outcome: &BatchOutcome) -> usize {
        let dest_ids: Vec<MessageId> = outcome
            .copied
            .iter()
            .filter(|(id, _)| outcome.deleted.contains(id))
            .filter_map(|&(id, dest)| {
                if dest.is_none() {
                    debug!(%id, "no destination id reported; leaving copy as is");
                }
                dest
            })
            .collect();

        if dest_ids.is_empty() {
            return 0;
        }

        if let Err(err) = session.select(&self.destination).await {
            warn!(folder = %self.folder, error = %err, "could not open destination to mark copies unread");
            return 0;
        }

        let mut marked = 0;
        for id in dest_ids {
            match session.set_flags(id, FlagDelta::Remove(Flag::Seen)).await {
                Ok(()) => marked += 1,
                Err(err) => warn!(folder = %self.folder, %id, error = %err, "could not mark copy unread"),
            }
        }
        marked
    }
}
