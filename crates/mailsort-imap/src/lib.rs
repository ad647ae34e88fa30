//! # mailsort-imap
//!
//! A small async IMAP4rev1 client covering the commands a mailbox sorter
//! needs: LOGIN, LIST, SELECT, UID SEARCH, UID FETCH, UID COPY, UID STORE,
//! EXPUNGE and LOGOUT.
//!
//! ## Connection States
//!
//! The client uses the type-state pattern so that only commands valid in the
//! current protocol state can be called:
//!
//! ```text
//! NotAuthenticated ─── login() ───→ Authenticated ─── select() ───→ Selected
//!                                        ↑                             │
//!                                        └──── SelectFailure (NO) ─────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use mailsort_imap::{Client, Mailbox, SearchCriteria, connection::connect_tls};
//!
//! let stream = connect_tls("imap.example.com", 993).await?;
//! let client = Client::from_stream(stream).await?.login("me", "secret").await?;
//! let (mut inbox, status) = client.select(&Mailbox::from_wire("INBOX")).await.map_err(|f| f.error)?;
//! let unread = inbox.uid_search(&SearchCriteria::Unseen).await?;
//! inbox.logout().await?;
//! ```
//!
//! ## Modules
//!
//! - [`command`]: command types and wire serialization
//! - [`connection`]: TLS stream, framing and the type-state client
//! - [`parser`]: sans-I/O response parser
//! - [`types`]: flags, identifiers, mailbox names and response codes

#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, SearchCriteria, StoreAction, TagGenerator};
pub use connection::{
    Authenticated, Client, FramedStream, ImapStream, NotAuthenticated, ResponseAccumulator,
    SelectFailure, Selected,
};
pub use error::{Error, Result};
pub use parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{
    Capability, CopyResult, Flag, ListResponse, Mailbox, MailboxAttribute, MailboxStatus,
    ResponseCode, SeqNum, Status, Uid, UidSet, UidValidity,
};
