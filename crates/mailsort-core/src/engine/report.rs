//! Run reports.

use serde::Serialize;

/// What happened to one leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafOutcome {
    /// Every match was copied, deleted and expunged.
    Moved,
    /// Some matches were routed and some were not.
    Partial,
    /// Nothing was routed although there were matches.
    Failed,
    /// The predicate was empty; the server was not queried.
    EmptyQuery,
    /// The search returned nothing.
    NoMatches,
    /// The inbox could not be re-selected or searched.
    SearchFailed,
    /// The destination folder was not found.
    FolderMissing,
    /// Dry run: matches were found but left in place.
    WouldMove,
}

/// Per-leaf line of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafReport {
    /// Destination, `parent/leaf`.
    pub folder: String,
    /// Compiled search filter.
    pub query: String,
    /// Messages matched (within the baseline).
    pub matched: usize,
    /// Messages copied to the destination.
    pub copied: usize,
    /// Copies that failed.
    pub failed_copies: usize,
    /// Messages removed from the inbox after a confirmed copy.
    pub routed: usize,
    /// Messages of earlier leaves that this leaf's expunge removed.
    pub late_expunged: usize,
    /// Overall result.
    pub outcome: LeafOutcome,
}

impl LeafReport {
    pub(crate) fn new(folder: String, query: String, outcome: LeafOutcome) -> Self {
        Self {
            folder,
            query,
            matched: 0,
            copied: 0,
            failed_copies: 0,
            routed: 0,
            late_expunged: 0,
            outcome,
        }
    }
}

/// Result of one classification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Inbox size at the start of the run.
    pub total_messages: usize,
    /// Messages moved out of the inbox.
    pub routed: usize,
    /// `total_messages - routed`.
    pub unrouted: usize,
    /// The run stopped early on request.
    pub cancelled: bool,
    /// No changes were made.
    pub dry_run: bool,
    /// One entry per processed leaf, in tree order.
    pub leaves: Vec<LeafReport>,
}

impl RunReport {
    /// Returns true if every inbox message was routed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.routed == self.total_messages
    }

    pub(crate) fn finish(&mut self) {
        self.routed = self.leaves.iter().map(|leaf| leaf.routed + leaf.late_expunged).sum();
        self.unrouted = self.total_messages.saturating_sub(self.routed);
    }
}
