//! Mail session capability.
//!
//! The engine talks to the server only through [`MailSession`]. One session
//! owns one connection and every call completes before the next is issued.
//! Folder names crossing this interface are in wire form (modified UTF-7).

mod imap;

use std::time::Duration;

use thiserror::Error;

pub use self::imap::ImapSession;
pub use mailsort_imap::{Flag, SearchCriteria};

/// Server-issued message identifier (the UID), scoped to the selected folder.
pub type MessageId = mailsort_imap::Uid;

/// A single flag change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagDelta {
    /// Add the flag.
    Add(Flag),
    /// Remove the flag.
    Remove(Flag),
}

/// Raw RFC 5322 message, or just its header block, as fetched from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Identifier the message was fetched by.
    pub id: MessageId,
    /// Message bytes.
    pub bytes: Vec<u8>,
}

impl RawMessage {
    /// Returns the unfolded value of the first header called `name`.
    ///
    /// Matching is case-insensitive and stops at the end of the header block.
    /// Encoded words are returned as-is.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        let text = String::from_utf8_lossy(&self.bytes);
        let mut value: Option<String> = None;

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }

            let continuation = line.starts_with([' ', '\t']);
            if let Some(current) = value.as_mut() {
                if continuation {
                    current.push(' ');
                    current.push_str(line.trim());
                    continue;
                }
                break;
            }

            if continuation {
                continue;
            }
            if let Some((key, rest)) = line.split_once(':')
                && key.trim().eq_ignore_ascii_case(name)
            {
                value = Some(rest.trim().to_string());
            }
        }

        value
    }
}

/// Failure of a single session operation.
///
/// The engine absorbs these per leaf; they never abort a run on their own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The folder or message does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server rejected the command or sent something unexpected.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server did not answer in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The connection is gone.
    #[error("connection error: {0}")]
    Connection(String),
}

impl SessionError {
    /// Returns true if the connection can no longer be used.
    #[must_use]
    pub const fn is_connection_lost(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }
}

impl From<mailsort_imap::Error> for SessionError {
    fn from(err: mailsort_imap::Error) -> Self {
        use mailsort_imap::Error as E;

        match err {
            E::MailboxNotFound(text) => Self::NotFound(text),
            E::Timeout(limit) => Self::Timeout(limit),
            E::Io(_) | E::Tls(_) | E::Bye(_) | E::Dns { .. } | E::InvalidDnsName(_) => {
                Self::Connection(err.to_string())
            }
            E::No(_) | E::Bad(_) | E::Auth(_) | E::Parse { .. } | E::Protocol(_) => {
                Self::Protocol(err.to_string())
            }
        }
    }
}

/// Failure to open an authenticated session.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The server name did not resolve.
    #[error("could not resolve {host}")]
    Dns {
        /// Server host.
        host: String,
        /// Underlying error.
        #[source]
        source: mailsort_imap::Error,
    },

    /// The TLS handshake failed.
    #[error("TLS handshake with {host} failed")]
    Tls {
        /// Server host.
        host: String,
        /// Underlying error.
        #[source]
        source: mailsort_imap::Error,
    },

    /// The server rejected the credentials.
    #[error("login rejected for {username}: {reason}")]
    Auth {
        /// Login name.
        username: String,
        /// Server text.
        reason: String,
    },

    /// Any other transport failure, including timeouts.
    #[error("connection to {host} failed")]
    Io {
        /// Server host.
        host: String,
        /// Underlying error.
        #[source]
        source: mailsort_imap::Error,
    },
}

/// Operations the engine needs from a mail server.
///
/// Implementations must not be shared between concurrent callers.
#[allow(async_fn_in_trait)]
pub trait MailSession {
    /// Selects a folder and returns its message count.
    async fn select(&mut self, folder: &str) -> Result<u32, SessionError>;

    /// Returns the ids of messages in the selected folder matching `criteria`.
    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<MessageId>, SessionError>;

    /// Fetches a whole message. With `peek` the `\Seen` flag is left alone.
    async fn fetch(&mut self, id: MessageId, peek: bool) -> Result<RawMessage, SessionError>;

    /// Fetches only the header block of a message, leaving `\Seen` alone.
    async fn fetch_headers(&mut self, id: MessageId) -> Result<RawMessage, SessionError>;

    /// Copies a message to `folder`, returning its id there if the server
    /// reports one.
    async fn copy(&mut self, id: MessageId, folder: &str)
    -> Result<Option<MessageId>, SessionError>;

    /// Changes one flag on one message in the selected folder.
    async fn set_flags(&mut self, id: MessageId, delta: FlagDelta) -> Result<(), SessionError>;

    /// Removes messages flagged `\Deleted` from the selected folder.
    async fn expunge(&mut self) -> Result<(), SessionError>;

    /// Returns the wire names of all selectable folders.
    async fn list_folders(&mut self) -> Result<Vec<String>, SessionError>;

    /// Ends the session.
    async fn logout(self) -> Result<(), SessionError>
    where
        Self: Sized;
}
