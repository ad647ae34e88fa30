//! Classification rules.
//!
//! A rule tree groups leaf labels under parent labels. Each leaf owns a
//! [`LeafPredicate`] of substring tests, and the [`compile`] step turns the
//! predicate into one server-side search filter.
//!
//! ```text
//! banco ──┬── openbank   { sender = "openbank" }
//!         └── santander  { sender = "santander", subject = "recibo" }
//! ```

mod model;
mod query;

pub use model::{FolderEntry, FolderPath, Leaf, LeafPredicate, RuleGroup, RuleTree, RuleTreeError};
pub use query::{CompiledQuery, compile};
