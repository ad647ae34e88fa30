//! Core IMAP types.
//!
//! Identifiers, flags, mailbox names and the response codes the client
//! inspects, following RFC 3501 (`IMAP4rev1`).

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod response_code;
mod uid_set;

pub use capability::{Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus, encode_name};
pub use response_code::{CopyResult, ResponseCode};
pub use uid_set::UidSet;
