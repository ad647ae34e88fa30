//! Command argument types.

use crate::types::Flag;

use super::serialize::{CommandBytes, write_search_criteria};

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// A body section, `BODY[section]` or `BODY.PEEK[section]`.
    Body {
        /// Section specifier, `None` for the whole message.
        section: Option<String>,
        /// Peek (don't set \Seen).
        peek: bool,
    },
}

/// STORE action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Add flags.
    AddFlags(Vec<Flag>),
    /// Remove flags.
    RemoveFlags(Vec<Flag>),
}

/// SEARCH criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages without \Seen flag.
    Unseen,
    /// From header contains text.
    From(String),
    /// Subject contains text.
    Subject(String),
    /// Body contains text.
    Body(String),
    /// AND of criteria.
    And(Vec<Self>),
}

impl SearchCriteria {
    /// Returns true if any text argument needs `CHARSET UTF-8`.
    #[must_use]
    pub fn needs_utf8(&self) -> bool {
        match self {
            Self::From(s) | Self::Subject(s) | Self::Body(s) => !s.is_ascii(),
            Self::And(all) => all.iter().any(Self::needs_utf8),
            Self::All | Self::Unseen => false,
        }
    }

    /// Returns true if the criteria render to nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(all) => all.iter().all(Self::is_empty),
            _ => false,
        }
    }
}

/// Human-readable form: 8-bit values are shown quoted, not as literals.
impl std::fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buf = CommandBytes::display();
        write_search_criteria(&mut buf, self);
        f.write_str(&String::from_utf8_lossy(&buf.into_bytes()))
    }
}
