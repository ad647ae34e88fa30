//! Classification and move engine.
//!
//! A run takes a baseline of the inbox, then walks the rule tree leaf by
//! leaf. For each leaf it re-selects the inbox, searches with the compiled
//! query, checks the destination exists and moves the matches. Failures are
//! absorbed per leaf. At the end the routed count is reconciled against the
//! baseline.
//!
//! ```text
//! select inbox ─→ search ALL ─→ for each leaf:
//!     compile ─→ select inbox ─→ search ─→ guard ─→ copy ─→ +\Deleted ─→ expunge ─→ -\Seen
//! ```

mod batch;
mod report;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

pub use self::batch::{BatchOutcome, MoveBatch};
pub use self::report::{LeafOutcome, LeafReport, RunReport};
use crate::guard::{FolderGuard, GuardError};
use crate::rules::{Leaf, RuleTree, compile};
use crate::session::{MailSession, MessageId, SearchCriteria, SessionError};

/// Options for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Folder to classify.
    pub inbox: String,
    /// Server hierarchy delimiter.
    pub folder_delimiter: String,
    /// Search and report only.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            inbox: "INBOX".to_string(),
            folder_delimiter: "/".to_string(),
            dry_run: false,
        }
    }
}

/// Runs the rule tree against one mailbox.
#[derive(Debug)]
pub struct Engine<'a> {
    rules: &'a RuleTree,
    options: RunOptions,
    cancel: Arc<AtomicBool>,
}

impl<'a> Engine<'a> {
    /// Creates an engine for the given rules.
    #[must_use]
    pub fn new(rules: &'a RuleTree, options: RunOptions) -> Self {
        Self {
            rules,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses `flag` to stop the run between leaves.
    #[must_use]
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Returns a handle that cancels the run when set.
    #[must_use]
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Executes a run.
    ///
    /// Only a failure to take the baseline is returned as an error. The
    /// caller owns the session and must log out afterwards.
    pub async fn run<S: MailSession>(&self, session: &mut S) -> Result<RunReport, SessionError> {
        let inbox = self.options.inbox.as_str();
        let mut report = RunReport {
            dry_run: self.options.dry_run,
            ..RunReport::default()
        };

        session.select(inbox).await?;
        let baseline: HashSet<MessageId> =
            session.search(&SearchCriteria::All).await?.into_iter().collect();
        report.total_messages = baseline.len();

        if baseline.is_empty() {
            info!(inbox, "inbox is empty; nothing to do");
            return Ok(report);
        }
        info!(inbox, total = baseline.len(), leaves = self.rules.len(), "starting run");

        let mut guard = FolderGuard::new(self.options.folder_delimiter.as_str());
        let mut claimed: HashSet<MessageId> = HashSet::new();
        // Flagged `\Deleted` by a leaf whose expunge failed.
        let mut pending: HashSet<MessageId> = HashSet::new();

        for leaf in self.rules.leaves() {
            if self.cancel.load(Ordering::SeqCst) {
                warn!("run cancelled; remaining leaves skipped");
                report.cancelled = true;
                break;
            }

            let leaf_report = self
                .process_leaf(session, &mut guard, leaf, &baseline, &mut claimed, &mut pending)
                .await;
            report.leaves.push(leaf_report);

            let routed: usize = report.leaves.iter().map(|l| l.routed + l.late_expunged).sum();
            info!(routed, total = report.total_messages, "progress");
        }

        report.finish();
        if report.is_complete() {
            info!(routed = report.routed, total = report.total_messages, "all messages routed");
        } else {
            warn!(
                routed = report.routed,
                total = report.total_messages,
                unrouted = report.unrouted,
                "run incomplete: not every inbox message was routed"
            );
        }

        Ok(report)
    }

    async fn process_leaf<S: MailSession>(
        &self,
        session: &mut S,
        guard: &mut FolderGuard,
        leaf: &Leaf,
        baseline: &HashSet<MessageId>,
        claimed: &mut HashSet<MessageId>,
        pending: &mut HashSet<MessageId>,
    ) -> LeafReport {
        let query = compile(&leaf.predicate);
        let folder = leaf.path.to_string();
        info!(folder = %folder, query = %query, "processing leaf");

        if query.is_empty() {
            warn!(folder = %folder, "empty filter; leaf skipped");
            return LeafReport::new(folder, String::new(), LeafOutcome::EmptyQuery);
        }

        let mut report = LeafReport::new(folder, query.to_string(), LeafOutcome::NoMatches);

        // Ids shift after an expunge, so search again in a fresh selection.
        let found = match session.select(&self.options.inbox).await {
            Ok(_) => session.search(query.criteria()).await,
            Err(err) => Err(err),
        };
        let found = match found {
            Ok(found) => found,
            Err(err) => {
                warn!(folder = %report.folder, error = %err, "search failed; leaf skipped");
                report.outcome = LeafOutcome::SearchFailed;
                return report;
            }
        };

        let ids: Vec<MessageId> = found
            .into_iter()
            .filter(|id| baseline.contains(id) && !claimed.contains(id))
            .collect();
        report.matched = ids.len();

        if ids.is_empty() {
            info!(folder = %report.folder, "no matching messages");
            return report;
        }

        let destination = match guard.resolve(session, &leaf.path).await {
            Ok(destination) => destination,
            Err(err) => {
                match &err {
                    GuardError::Missing(_) => {
                        warn!(folder = %report.folder, error = %err, "destination missing; leaf skipped");
                    }
                    GuardError::ListingUnavailable(_) => {
                        warn!(folder = %report.folder, error = %err, "destination unverified; leaf skipped");
                    }
                }
                report.outcome = LeafOutcome::FolderMissing;
                return report;
            }
        };

        if self.options.dry_run {
            info!(
                folder = %report.folder,
                matched = ids.len(),
                destination = %destination,
                "dry run: would move"
            );
            report.outcome = LeafOutcome::WouldMove;
            return report;
        }

        let batch = MoveBatch {
            folder: leaf.path.clone(),
            destination,
            ids,
        };
        let outcome = batch.execute(session).await;

        claimed.extend(outcome.copied.iter().map(|&(id, _)| id));
        if outcome.expunged && !pending.is_empty() {
            info!(folder = %report.folder, count = pending.len(), "expunge removed messages left from an earlier leaf");
            report.late_expunged = pending.len();
            pending.clear();
        }
        pending.extend(outcome.left_deleted.iter().copied());
        report.copied = outcome.copied.len();
        report.failed_copies = outcome.copy_failures.len();
        report.routed = outcome.routed();
        report.outcome = if report.routed == report.matched {
            LeafOutcome::Moved
        } else if report.routed > 0 {
            LeafOutcome::Partial
        } else {
            LeafOutcome::Failed
        };
        debug!(folder = %report.folder, outcome = ?report.outcome, "leaf done");

        report
    }
}
