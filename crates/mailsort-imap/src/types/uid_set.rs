//! Ordered UID sets with range compression.

use super::Uid;

/// An ordered list of UIDs, written on the wire as a compressed
/// `sequence-set` such as `3:5,9`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UidSet(Vec<Uid>);

impl UidSet {
    /// Creates a set holding one UID.
    #[must_use]
    pub fn single(uid: Uid) -> Self {
        Self(vec![uid])
    }

    /// Returns the UIDs in the order they were given.
    #[must_use]
    pub fn as_slice(&self) -> &[Uid] {
        &self.0
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a wire `sequence-set` of explicit UIDs, expanding ranges in
    /// the order they are written. `*` is rejected because it has no fixed
    /// value outside the server.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut uids = Vec::new();
        for part in s.split(',') {
            match part.split_once(':') {
                Some((a, b)) => {
                    let a: u32 = a.parse().ok()?;
                    let b: u32 = b.parse().ok()?;
                    if a <= b {
                        for n in a..=b {
                            uids.push(Uid::new(n)?);
                        }
                    } else {
                        for n in (b..=a).rev() {
                            uids.push(Uid::new(n)?);
                        }
                    }
                }
                None => uids.push(Uid::new(part.parse().ok()?)?),
            }
        }
        Some(Self(uids))
    }
}

impl FromIterator<Uid> for UidSet {
    fn from_iter<I: IntoIterator<Item = Uid>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for UidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut iter = self.0.iter().map(|u| u.get()).peekable();
        let mut first = true;
        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek().is_some_and(|&next| Some(next) == end.checked_add(1)) {
                end += 1;
                iter.next();
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}:{end}")?;
            }
        }
        Ok(())
    }
}
