//! Type-state IMAP client connection.
//!
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: after the greeting
//! - `Authenticated`: after a successful LOGIN
//! - `Selected`: after a successful SELECT
//!
//! Each state only exposes the commands valid in it. Transitions consume the
//! client, so a failed SELECT hands the connection back through
//! [`SelectFailure`] rather than leaving it in an unknown state.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::{FramedStream, ResponseAccumulator};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ListResponse, Mailbox, MailboxStatus, ResponseCode, Status};
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) state: State,
}

impl<S, State: fmt::Debug> fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Untagged data and the tagged OK of one completed command.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    pub(crate) untagged: Vec<UntaggedResponse>,
    pub(crate) code: Option<ResponseCode>,
}

/// A SELECT that did not succeed.
///
/// When the server answered NO or BAD the connection is still usable and is
/// handed back in the authenticated state. After a transport failure there
/// is nothing to hand back.
pub struct SelectFailure<S> {
    /// The connection, if it survived.
    pub client: Option<Client<S, Authenticated>>,
    /// What went wrong.
    pub error: Error,
}

impl<S> fmt::Debug for SelectFailure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectFailure")
            .field("recovered", &self.client.is_some())
            .field("error", &self.error)
            .finish()
    }
}

impl<S> fmt::Display for SelectFailure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT failed: {}", self.error)
    }
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns true if the server supports UIDPLUS (RFC 4315).
    ///
    /// Without it, UID COPY carries no COPYUID mapping.
    #[must_use]
    pub fn supports_uidplus(&self) -> bool {
        self.capabilities.contains(&Capability::UidPlus)
    }

    /// Ends the session with LOGOUT.
    ///
    /// A server that closes the socket right after its BYE is not an error.
    pub async fn logout(mut self) -> Result<()> {
        match self.execute(&Command::Logout).await {
            Ok(_) => Ok(()),
            Err(Error::Io(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Sends a command and collects its responses up to the tagged
    /// completion, turning NO, BAD and BYE into errors.
    ///
    /// A command carrying literals is sent piece by piece, each piece after
    /// the server's continuation. If the server answers a literal marker
    /// with the tagged completion instead, the rest is not sent.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Completion> {
        let tag = self.tag_gen.next_tag();
        debug!(tag = %tag, command = command.name(), "sending command");

        let parts = command.serialize_parts(&tag);
        let mut accumulator = ResponseAccumulator::new(tag.as_str());
        for (i, part) in parts.iter().enumerate() {
            self.stream.write_command(part).await?;
            let more = i + 1 < parts.len();
            if more && !accumulator.read_continuation(&mut self.stream).await? {
                break;
            }
        }
        let raw = accumulator.read_until_tagged(&mut self.stream).await?;

        let mut completion = Completion::default();
        let mut outcome = None;

        for bytes in &raw {
            match ResponseParser::parse(bytes) {
                Ok(Response::Tagged {
                    tag: resp_tag,
                    status,
                    code,
                    text,
                }) if resp_tag.as_str() == tag => {
                    outcome = Some((status, code, text));
                }
                Ok(Response::Untagged(UntaggedResponse::Capability(caps))) => {
                    self.capabilities = caps;
                }
                Ok(Response::Untagged(UntaggedResponse::Ok {
                    code: Some(ResponseCode::Alert),
                    text,
                })) => {
                    warn!(alert = %text, "server alert");
                }
                Ok(Response::Untagged(untagged)) => completion.untagged.push(untagged),
                Ok(_) => {}
                Err(err) => {
                    debug!(error = %err, "skipping unparseable response");
                }
            }
        }

        let Some((status, code, text)) = outcome else {
            return Err(Error::Protocol(format!(
                "no parseable completion for {}",
                command.name()
            )));
        };

        match status {
            Status::Ok | Status::PreAuth => {
                if let Some(ResponseCode::Capability(caps)) = &code {
                    self.capabilities.clone_from(caps);
                }
                completion.code = code;
                Ok(completion)
            }
            Status::No
                if matches!(
                    code,
                    Some(ResponseCode::TryCreate | ResponseCode::NonExistent)
                ) =>
            {
                Err(Error::MailboxNotFound(text))
            }
            Status::No => Err(Error::No(text)),
            Status::Bad => Err(Error::Bad(text)),
            Status::Bye => Err(Error::Bye(text)),
        }
    }

    /// Moves the connection into another state.
    pub(crate) fn into_state<T>(self, state: T) -> Client<S, T> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state,
        }
    }

    /// Lists mailboxes matching `pattern` under `reference`.
    ///
    /// Both arguments are sent as given, so non-ASCII names must already be
    /// in their modified UTF-7 wire form.
    pub(crate) async fn list_mailboxes(
        &mut self,
        reference: &str,
        pattern: &str,
    ) -> Result<Vec<ListResponse>> {
        let completion = self
            .execute(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|response| match response {
                UntaggedResponse::List(list) => Some(list),
                _ => None,
            })
            .collect())
    }

    /// Issues SELECT from either the authenticated or the selected state.
    pub(crate) async fn select_mailbox(
        mut self,
        mailbox: &Mailbox,
    ) -> std::result::Result<(Client<S, Selected>, MailboxStatus), SelectFailure<S>> {
        let command = Command::Select {
            mailbox: mailbox.clone(),
        };

        match self.execute(&command).await {
            Ok(completion) => {
                let status = mailbox_status(completion);
                let state = Selected::new(mailbox.clone());
                Ok((self.into_state(state), status))
            }
            Err(error @ (Error::No(_) | Error::Bad(_) | Error::MailboxNotFound(_))) => {
                Err(SelectFailure {
                    client: Some(self.into_state(Authenticated)),
                    error,
                })
            }
            Err(error) => Err(SelectFailure {
                client: None,
                error,
            }),
        }
    }
}

/// Builds the mailbox status from the data returned by SELECT.
fn mailbox_status(completion: Completion) -> MailboxStatus {
    let mut status = MailboxStatus {
        read_only: matches!(completion.code, Some(ResponseCode::ReadOnly)),
        ..MailboxStatus::default()
    };

    for response in completion.untagged {
        match response {
            UntaggedResponse::Exists(n) => status.exists = n,
            UntaggedResponse::Recent(n) => status.recent = n,
            UntaggedResponse::Flags(flags) => status.flags = flags,
            UntaggedResponse::Ok {
                code: Some(code), ..
            } => match code {
                ResponseCode::UidValidity(v) => status.uid_validity = Some(v),
                ResponseCode::UidNext(uid) => status.uid_next = Some(uid),
                _ => {}
            },
            _ => {}
        }
    }

    status
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Flag, Flags, Uid, UidValidity};

    #[test]
    fn test_mailbox_status_from_select_data() {
        let completion = Completion {
            untagged: vec![
                UntaggedResponse::Flags([Flag::Seen, Flag::Deleted].into_iter().collect::<Flags>()),
                UntaggedResponse::Exists(17),
                UntaggedResponse::Recent(2),
                UntaggedResponse::Ok {
                    code: Some(ResponseCode::UidValidity(UidValidity::new(3_857_529_045).unwrap())),
                    text: "UIDs valid".to_string(),
                },
                UntaggedResponse::Ok {
                    code: Some(ResponseCode::UidNext(Uid::new(4392).unwrap())),
                    text: "Predicted next UID".to_string(),
                },
            ],
            code: Some(ResponseCode::ReadWrite),
        };

        let status = mailbox_status(completion);
        assert_eq!(status.exists, 17);
        assert_eq!(status.recent, 2);
        assert_eq!(status.uid_next.map(Uid::get), Some(4392));
        assert_eq!(status.uid_validity.map(UidValidity::get), Some(3_857_529_045));
        assert!(status.flags.contains(&Flag::Deleted));
        assert!(!status.read_only);
    }

    #[test]
    fn test_mailbox_status_read_only() {
        let completion = Completion {
            untagged: Vec::new(),
            code: Some(ResponseCode::ReadOnly),
        };
        assert!(mailbox_status(completion).read_only);
    }
}
