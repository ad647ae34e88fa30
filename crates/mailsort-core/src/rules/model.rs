//! Rule tree model.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Substring tests for one leaf.
///
/// A field that is absent or blank takes no part in the search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeafPredicate {
    /// Text the `From` header must contain.
    #[serde(default)]
    pub sender: Option<String>,
    /// Text the `Subject` header must contain.
    #[serde(default)]
    pub subject: Option<String>,
    /// Text the body must contain.
    #[serde(default)]
    pub body: Option<String>,
}

static EMPTY_PREDICATE: LeafPredicate = LeafPredicate {
    sender: None,
    subject: None,
    body: None,
};

impl LeafPredicate {
    /// Creates a predicate matching on the sender only.
    #[must_use]
    pub fn sender(sender: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            ..Self::default()
        }
    }

    /// Returns the non-blank fields in sender, subject, body order.
    pub(crate) fn fields(&self) -> impl Iterator<Item = (Field, &str)> {
        [
            (Field::Sender, self.sender.as_deref()),
            (Field::Subject, self.subject.as_deref()),
            (Field::Body, self.body.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            let value = value?.trim();
            (!value.is_empty()).then_some((field, value))
        })
    }

    /// Returns true if no field carries any text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }
}

/// Predicate field, in compile order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Sender,
    Subject,
    Body,
}

/// Destination folder of a leaf: `(parent, leaf)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderPath {
    parent: String,
    leaf: String,
}

impl FolderPath {
    /// Creates a folder path.
    #[must_use]
    pub fn new(parent: impl Into<String>, leaf: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            leaf: leaf.into(),
        }
    }

    /// Returns the parent label.
    #[must_use]
    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// Returns the leaf label.
    #[must_use]
    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    /// Joins parent and leaf with the server's hierarchy delimiter.
    #[must_use]
    pub fn render(&self, delimiter: &str) -> String {
        format!("{}{delimiter}{}", self.parent, self.leaf)
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.leaf)
    }
}

/// One leaf of the tree: where matches go and how they are matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Destination folder.
    pub path: FolderPath,
    /// Substring tests.
    pub predicate: LeafPredicate,
}

/// A parent label and its leaves, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGroup {
    /// Parent label.
    pub parent: String,
    /// Leaves under this parent.
    pub leaves: Vec<Leaf>,
}

/// One `[[folders]]` entry as written in the configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FolderEntry {
    /// Parent label.
    pub parent: String,
    /// Leaf labels under the parent.
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Structural problems that make a rule tree unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleTreeError {
    /// A leaf label appears under more than one parent.
    #[error("label '{label}' appears under both '{first}' and '{second}'")]
    DuplicateLabel {
        /// The repeated label.
        label: String,
        /// Parent where it first appeared.
        first: String,
        /// Parent where it appeared again.
        second: String,
    },

    /// A parent or leaf label is blank.
    #[error("blank label under parent '{0}'")]
    BlankLabel(String),
}

/// Immutable rule tree, built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTree {
    groups: Vec<RuleGroup>,
    unfiltered: Vec<String>,
}

impl RuleTree {
    /// Builds the tree from folder entries and the predicate table.
    ///
    /// Labels without a predicate get an empty one and are reported by
    /// [`unfiltered_labels`](Self::unfiltered_labels).
    pub fn build(
        folders: &[FolderEntry],
        filters: &HashMap<String, LeafPredicate>,
    ) -> Result<Self, RuleTreeError> {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        let mut groups = Vec::with_capacity(folders.len());
        let mut unfiltered = Vec::new();

        for entry in folders {
            let parent = entry.parent.trim();
            if parent.is_empty() {
                return Err(RuleTreeError::BlankLabel(String::new()));
            }

            let mut leaves = Vec::with_capacity(entry.labels.len());
            for label in &entry.labels {
                let label = label.trim();
                if label.is_empty() {
                    return Err(RuleTreeError::BlankLabel(parent.to_string()));
                }
                if let Some(first) = owners.insert(label, parent) {
                    return Err(RuleTreeError::DuplicateLabel {
                        label: label.to_string(),
                        first: first.to_string(),
                        second: parent.to_string(),
                    });
                }

                let predicate = if let Some(predicate) = filters.get(label) {
                    predicate.clone()
                } else {
                    warn!(label, parent, "label has no filter; it will be skipped");
                    unfiltered.push(label.to_string());
                    LeafPredicate::default()
                };

                leaves.push(Leaf {
                    path: FolderPath::new(parent, label),
                    predicate,
                });
            }

            groups.push(RuleGroup {
                parent: parent.to_string(),
                leaves,
            });
        }

        let known: HashSet<&str> = owners.keys().copied().collect();
        let mut orphans: Vec<&str> = filters
            .keys()
            .map(String::as_str)
            .filter(|label| !known.contains(label))
            .collect();
        orphans.sort_unstable();
        for label in orphans {
            warn!(label, "filter is not used by any folder");
        }

        Ok(Self { groups, unfiltered })
    }

    /// Returns the parent groups in configuration order.
    #[must_use]
    pub fn groups(&self) -> &[RuleGroup] {
        &self.groups
    }

    /// Iterates over every leaf in tree order.
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.groups.iter().flat_map(|group| group.leaves.iter())
    }

    /// Returns the predicate for a leaf label.
    ///
    /// Unknown labels get the empty predicate.
    #[must_use]
    pub fn predicate_of(&self, label: &str) -> &LeafPredicate {
        self.leaves()
            .find(|leaf| leaf.path.leaf() == label)
            .map_or(&EMPTY_PREDICATE, |leaf| &leaf.predicate)
    }

    /// Returns labels that had no filter entry.
    #[must_use]
    pub fn unfiltered_labels(&self) -> &[String] {
        &self.unfiltered
    }

    /// Returns the number of leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.leaves.len()).sum()
    }

    /// Returns true if the tree has no leaves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
