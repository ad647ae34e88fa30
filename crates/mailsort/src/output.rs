//! Human-readable and JSON rendering of results.

use std::fmt::Write as _;

use mailsort_core::{LeafOutcome, LeafReport, RuleTree, RunReport, UnreadMessage, compile};

const fn outcome_label(outcome: LeafOutcome) -> &'static str {
    match outcome {
        LeafOutcome::Moved => "moved",
        LeafOutcome::Partial => "partial",
        LeafOutcome::Failed => "failed",
        LeafOutcome::EmptyQuery => "empty filter",
        LeafOutcome::NoMatches => "no matches",
        LeafOutcome::SearchFailed => "search failed",
        LeafOutcome::FolderMissing => "folder missing",
        LeafOutcome::WouldMove => "would move",
    }
}

fn leaf_line(leaf: &LeafReport) -> String {
    let mut line = format!("{:<32} {:<14}", leaf.folder, outcome_label(leaf.outcome));
    if leaf.matched > 0 {
        let _ = write!(line, " matched {:>4}  moved {:>4}", leaf.matched, leaf.routed);
    }
    if leaf.failed_copies > 0 {
        let _ = write!(line, "  copy failures {}", leaf.failed_copies);
    }
    if leaf.late_expunged > 0 {
        let _ = write!(line, "  plus {} left by earlier leaves", leaf.late_expunged);
    }
    line
}

/// Renders a run report as text.
pub fn run_report(report: &RunReport) -> String {
    let mut out = String::new();
    for leaf in &report.leaves {
        out.push_str(&leaf_line(leaf));
        out.push('\n');
    }

    if report.dry_run {
        let would: usize = report
            .leaves
            .iter()
            .filter(|l| l.outcome == LeafOutcome::WouldMove)
            .map(|l| l.matched)
            .sum();
        let _ = writeln!(out, "dry run: {would} of {} messages would move", report.total_messages);
    } else {
        let _ = writeln!(
            out,
            "routed {} of {} messages, {} left in the inbox",
            report.routed, report.total_messages, report.unrouted
        );
    }
    if report.cancelled {
        out.push_str("run cancelled before all rules were applied\n");
    }
    out
}

/// Renders unread messages as text.
pub fn unread_list(messages: &[UnreadMessage]) -> String {
    if messages.is_empty() {
        return "no unread messages\n".to_string();
    }
    let mut out = String::new();
    for message in messages {
        let _ = writeln!(out, "{}  {}", message.date, message.from);
        let _ = writeln!(out, "    {}", message.subject);
    }
    out
}

/// Renders the rule tree with each leaf's compiled filter.
pub fn rules(tree: &RuleTree) -> String {
    let mut out = String::new();
    for group in tree.groups() {
        let _ = writeln!(out, "{}", group.parent);
        for leaf in &group.leaves {
            let query = compile(&leaf.predicate);
            if query.is_empty() {
                let _ = writeln!(out, "  {:<24} (empty filter, skipped)", leaf.path.leaf());
            } else {
                let _ = writeln!(out, "  {:<24} {query}", leaf.path.leaf());
            }
        }
    }
    out
}
