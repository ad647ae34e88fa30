//! Response codes.

use super::{Capability, Flag, Uid, UidSet, UidValidity};

/// Bracketed response code carried by a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: Human-readable message that MUST be shown to user.
    Alert,
    /// CAPABILITY list sent with a greeting or LOGIN completion.
    Capability(Vec<Capability>),
    /// PERMANENTFLAGS: Flags that can be changed permanently.
    PermanentFlags(Vec<Flag>),
    /// READ-ONLY: Mailbox selected as read-only.
    ReadOnly,
    /// READ-WRITE: Mailbox selected as read-write.
    ReadWrite,
    /// TRYCREATE: target mailbox of a COPY does not exist.
    TryCreate,
    /// NONEXISTENT: mailbox does not exist (RFC 5530).
    NonExistent,
    /// AUTHENTICATIONFAILED (RFC 5530).
    AuthenticationFailed,
    /// UIDNEXT: Next UID to be assigned.
    UidNext(Uid),
    /// UIDVALIDITY: Unique identifier validity value.
    UidValidity(UidValidity),
    /// COPYUID (RFC 4315): UIDs assigned to copied messages.
    CopyUid(CopyResult),
    /// Unknown response code.
    Unknown(String),
}

/// UID mapping reported by a `COPYUID` response code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResult {
    /// UIDVALIDITY of the destination mailbox.
    pub uid_validity: UidValidity,
    /// Source UIDs, in server order.
    pub source: UidSet,
    /// Destination UIDs, positionally matching `source`.
    pub dest: UidSet,
}

impl CopyResult {
    /// Returns the destination UID assigned to a source UID.
    #[must_use]
    pub fn dest_for(&self, source: Uid) -> Option<Uid> {
        let pos = self.source.as_slice().iter().position(|&u| u == source)?;
        self.dest.as_slice().get(pos).copied()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dest_for_is_positional() {
        let result = CopyResult {
            uid_validity: UidValidity::new(38505).unwrap(),
            source: UidSet::parse("304,319:320").unwrap(),
            dest: UidSet::parse("3956:3958").unwrap(),
        };
        assert_eq!(result.dest_for(Uid::new(304).unwrap()), Uid::new(3956));
        assert_eq!(result.dest_for(Uid::new(320).unwrap()), Uid::new(3958));
        assert_eq!(result.dest_for(Uid::new(305).unwrap()), None);
    }
}
