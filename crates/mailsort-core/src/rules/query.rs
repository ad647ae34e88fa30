//! Query compilation.
//!
//! A leaf predicate becomes one `UID SEARCH` filter with clauses in fixed
//! order: `FROM`, `SUBJECT`, `BODY`. Values are written as IMAP astrings, so
//! `openbank` stays bare and `extracto mensual` is sent as one quoted phrase.

use std::fmt;

use mailsort_imap::SearchCriteria;

use super::model::{Field, LeafPredicate};

/// A compiled search filter.
///
/// An empty query must be skipped by the caller. It never means "match all".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    text: String,
    criteria: SearchCriteria,
}

impl CompiledQuery {
    /// Returns the filter as sent to the server.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the structured criteria.
    #[must_use]
    pub const fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    /// Returns true if the predicate had no usable field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Compiles a leaf predicate into a search filter.
#[must_use]
pub fn compile(predicate: &LeafPredicate) -> CompiledQuery {
    let clauses: Vec<SearchCriteria> = predicate
        .fields()
        .map(|(field, value)| match field {
            Field::Sender => SearchCriteria::From(value.to_string()),
            Field::Subject => SearchCriteria::Subject(value.to_string()),
            Field::Body => SearchCriteria::Body(value.to_string()),
        })
        .collect();

    let criteria = SearchCriteria::And(clauses);
    let text = criteria.to_string().trim().to_string();

    CompiledQuery { text, criteria }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn predicate(sender: Option<&str>, subject: Option<&str>, body: Option<&str>) -> LeafPredicate {
        LeafPredicate {
            sender: sender.map(str::to_string),
            subject: subject.map(str::to_string),
            body: body.map(str::to_string),
        }
    }

    #[test]
    fn test_sender_only() {
        let query = compile(&LeafPredicate::sender("openbank"));
        assert_eq!(query.as_str(), "FROM openbank");
        assert!(!query.is_empty());
    }

    #[test]
    fn test_clause_order() {
        let query = compile(&predicate(Some("santander"), Some("recibo"), Some("IBAN")));
        assert_eq!(query.as_str(), "FROM santander SUBJECT recibo BODY IBAN");
    }

    #[test]
    fn test_multi_word_value_is_one_phrase() {
        let query = compile(&predicate(None, Some("extracto mensual"), None));
        assert_eq!(query.as_str(), "SUBJECT \"extracto mensual\"");
    }

    #[test]
    fn test_values_are_trimmed() {
        let query = compile(&predicate(Some("  openbank "), Some(""), Some("   ")));
        assert_eq!(query.as_str(), "FROM openbank");
    }

    #[test]
    fn test_empty_predicate() {
        let query = compile(&LeafPredicate::default());
        assert!(query.is_empty());
        assert_eq!(query.as_str(), "");
        assert!(query.criteria().is_empty());
    }

    #[test]
    fn test_non_ascii_value_displays_quoted() {
        let query = compile(&predicate(None, Some("facturación"), None));
        assert_eq!(query.as_str(), "SUBJECT \"facturación\"");
        assert!(query.criteria().needs_utf8());
    }

    fn field() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            Just(Some("   ".to_string())),
            "[a-z0-9@.]{1,12}".prop_map(Some),
        ]
    }

    proptest! {
        #[test]
        fn prop_blank_predicates_compile_empty(
            sender in prop_oneof![Just(None), "[ \t]{0,4}".prop_map(Some)],
            subject in prop_oneof![Just(None), "[ \t]{0,4}".prop_map(Some)],
            body in prop_oneof![Just(None), "[ \t]{0,4}".prop_map(Some)],
        ) {
            let query = compile(&LeafPredicate { sender, subject, body });
            prop_assert!(query.is_empty());
        }

        #[test]
        fn prop_clauses_follow_fields(sender in field(), subject in field(), body in field()) {
            let present = |v: &Option<String>| {
                v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
            };
            let mut expected = Vec::new();
            if let Some(v) = present(&sender) {
                expected.push(format!("FROM {v}"));
            }
            if let Some(v) = present(&subject) {
                expected.push(format!("SUBJECT {v}"));
            }
            if let Some(v) = present(&body) {
                expected.push(format!("BODY {v}"));
            }

            let query = compile(&LeafPredicate { sender, subject, body });

            prop_assert_eq!(query.as_str(), expected.join(" "));
            prop_assert_eq!(query.as_str(), query.as_str().trim());
            prop_assert_eq!(query.is_empty(), expected.is_empty());
        }
    }
}
