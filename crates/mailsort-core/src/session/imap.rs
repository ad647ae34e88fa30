//! [`MailSession`] over a single IMAP connection.
//!
//! `ImapSession` hides the type-state client behind a state enum and moves
//! the client between states with `std::mem::replace`. Every command runs
//! under the configured timeout. A timeout or transport failure drops the
//! connection, since the stream may have stopped mid-response, and later
//! calls fail with [`SessionError::Connection`].

use std::future::Future;
use std::time::Duration;

use mailsort_imap::connection::{connect_plain, connect_tls};
use mailsort_imap::{
    Authenticated, Client, FetchAttribute, FetchItem, ImapStream, Mailbox, Selected, StoreAction,
    UidSet,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{
    ConnectError, FlagDelta, MailSession, MessageId, RawMessage, SearchCriteria, SessionError,
};
use crate::config::{LoginConfig, Settings};

/// Current state of the connection.
enum SessionState<S> {
    /// Connection dropped or never usable.
    Disconnected,
    /// Logged in, no folder selected.
    Authenticated(Client<S, Authenticated>),
    /// A folder is selected.
    Selected(Client<S, Selected>),
}

/// An authenticated IMAP session.
pub struct ImapSession<S = ImapStream> {
    state: SessionState<S>,
    timeout: Duration,
}

impl<S> std::fmt::Debug for ImapSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            SessionState::Disconnected => "disconnected",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::Selected(_) => "selected",
        };
        f.debug_struct("ImapSession")
            .field("state", &state)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ImapSession {
    /// Connects, reads the greeting and logs in.
    ///
    /// # Errors
    ///
    /// Returns an error if name resolution, the TLS handshake or LOGIN fails,
    /// or if any step exceeds the command timeout.
    pub async fn connect(login: &LoginConfig, settings: &Settings) -> Result<Self, ConnectError> {
        let host = login.imap_server.as_str();
        let limit = settings.command_timeout();
        let io_error = |source: mailsort_imap::Error| connect_error(host, source);

        let stream = within(limit, async {
            if settings.tls {
                connect_tls(host, login.port).await
            } else {
                warn!(host, "connecting without TLS");
                connect_plain(host, login.port).await
            }
        })
        .await
        .map_err(io_error)?;

        let client = within(limit, Client::from_stream(stream))
            .await
            .map_err(io_error)?;

        let client = within(limit, client.login(&login.username, &login.password))
            .await
            .map_err(|err| match err {
                mailsort_imap::Error::Auth(reason) => ConnectError::Auth {
                    username: login.username.clone(),
                    reason,
                },
                other => connect_error(host, other),
            })?;

        info!(host, port = login.port, "logged in");
        if !client.supports_uidplus() {
            info!(host, "server lacks UIDPLUS; moved copies will stay marked read");
        }
        Ok(Self::from_client(client, limit))
    }
}

impl<S> ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already authenticated client.
    #[must_use]
    pub const fn from_client(client: Client<S, Authenticated>, timeout: Duration) -> Self {
        Self {
            state: SessionState::Authenticated(client),
            timeout,
        }
    }

    /// Returns true while the connection is usable.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        !matches!(self.state, SessionState::Disconnected)
    }

    fn selected(&mut self) -> Result<&mut Client<S, Selected>, SessionError> {
        match &mut self.state {
            SessionState::Selected(client) => Ok(client),
            SessionState::Authenticated(_) => {
                Err(SessionError::Protocol("no folder selected".to_string()))
            }
            SessionState::Disconnected => Err(not_connected()),
        }
    }

    /// Fetches one body section, the whole message when `section` is `None`.
    async fn fetch_section(
        &mut self,
        id: MessageId,
        section: Option<&str>,
        peek: bool,
    ) -> Result<RawMessage, SessionError> {
        let limit = self.timeout;
        let client = self.selected()?;
        let items = vec![FetchAttribute::Body {
            section: section.map(str::to_string),
            peek,
        }];
        let result = within(limit, client.uid_fetch(&UidSet::single(id), items))
            .await
            .map_err(SessionError::from);

        let bytes = self.settle(result)?.into_iter().find_map(|(_, items)| {
            items.into_iter().find_map(|item| match item {
                FetchItem::Body {
                    section: returned,
                    data,
                } if returned.as_deref() == section => data,
                _ => None,
            })
        });

        bytes
            .map(|bytes| RawMessage { id, bytes })
            .ok_or_else(|| SessionError::NotFound(format!("message {id}")))
    }

    /// Drops the connection if the error left it unusable.
    fn settle<T>(&mut self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(err) = &result
            && err.is_connection_lost()
        {
            warn!(error = %err, "dropping IMAP connection");
            self.state = SessionState::Disconnected;
        }
        result
    }
}

impl<S> MailSession for ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn select(&mut self, folder: &str) -> Result<u32, SessionError> {
        let limit = self.timeout;
        let mailbox = Mailbox::from_wire(folder);

        let outcome = match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Authenticated(client) => timeout(limit, client.select(&mailbox)).await,
            SessionState::Selected(client) => timeout(limit, client.select(&mailbox)).await,
            SessionState::Disconnected => return Err(not_connected()),
        };

        match outcome {
            Ok(Ok((client, status))) => {
                debug!(folder, exists = status.exists, "selected");
                if status.read_only {
                    warn!(folder, "folder opened read-only; flag changes will be refused");
                }
                self.state = SessionState::Selected(client);
                Ok(status.exists)
            }
            Ok(Err(failure)) => {
                if let Some(client) = failure.client {
                    self.state = SessionState::Authenticated(client);
                }
                Err(match failure.error {
                    mailsort_imap::Error::No(text) => SessionError::NotFound(text),
                    other => SessionError::from(other),
                })
            }
            Err(_) => {
                warn!(folder, "SELECT timed out; dropping IMAP connection");
                Err(SessionError::Timeout(limit))
            }
        }
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<MessageId>, SessionError> {
        let limit = self.timeout;
        let client = self.selected()?;
        let result = within(limit, client.uid_search(criteria))
            .await
            .map_err(SessionError::from);
        self.settle(result)
    }

    async fn fetch(&mut self, id: MessageId, peek: bool) -> Result<RawMessage, SessionError> {
        self.fetch_section(id, None, peek).await
    }

    async fn fetch_headers(&mut self, id: MessageId) -> Result<RawMessage, SessionError> {
        self.fetch_section(id, Some("HEADER"), true).await
    }

    async fn copy(
        &mut self,
        id: MessageId,
        folder: &str,
    ) -> Result<Option<MessageId>, SessionError> {
        let limit = self.timeout;
        let client = self.selected()?;
        let result = within(
            limit,
            client.uid_copy(&UidSet::single(id), &Mailbox::from_wire(folder)),
        )
        .await
        .map_err(SessionError::from);

        Ok(self.settle(result)?.and_then(|copy| copy.dest_for(id)))
    }

    async fn set_flags(&mut self, id: MessageId, delta: FlagDelta) -> Result<(), SessionError> {
        let limit = self.timeout;
        let client = self.selected()?;
        let action = match delta {
            FlagDelta::Add(flag) => StoreAction::AddFlags(vec![flag]),
            FlagDelta::Remove(flag) => StoreAction::RemoveFlags(vec![flag]),
        };
        let result = within(limit, client.uid_store(&UidSet::single(id), action))
            .await
            .map_err(SessionError::from);
        self.settle(result)
    }

    async fn expunge(&mut self) -> Result<(), SessionError> {
        let limit = self.timeout;
        let client = self.selected()?;
        let result = within(limit, client.expunge())
            .await
            .map_err(SessionError::from);
        let expunged = self.settle(result)?;
        debug!(count = expunged.len(), "expunged");
        Ok(())
    }

    async fn list_folders(&mut self) -> Result<Vec<String>, SessionError> {
        let limit = self.timeout;
        let listing = match &mut self.state {
            SessionState::Authenticated(client) => within(limit, client.list("", "*")).await,
            SessionState::Selected(client) => within(limit, client.list("", "*")).await,
            SessionState::Disconnected => return Err(not_connected()),
        };

        let folders = self.settle(listing.map_err(SessionError::from))?;
        Ok(folders
            .into_iter()
            .filter(mailsort_imap::ListResponse::is_selectable)
            .map(|folder| folder.mailbox.as_str().to_string())
            .collect())
    }

    async fn logout(self) -> Result<(), SessionError> {
        let limit = self.timeout;
        let result = match self.state {
            SessionState::Authenticated(client) => within(limit, client.logout()).await,
            SessionState::Selected(client) => within(limit, client.logout()).await,
            SessionState::Disconnected => return Ok(()),
        };
        result.map_err(SessionError::from)?;
        info!("logged out");
        Ok(())
    }
}

/// Runs an IMAP operation under a timeout.
async fn within<T>(
    limit: Duration,
    operation: impl Future<Output = mailsort_imap::Result<T>>,
) -> mailsort_imap::Result<T> {
    timeout(limit, operation)
        .await
        .unwrap_or(Err(mailsort_imap::Error::Timeout(limit)))
}

fn not_connected() -> SessionError {
    SessionError::Connection("not connected".to_string())
}

fn connect_error(host: &str, source: mailsort_imap::Error) -> ConnectError {
    let host = host.to_string();
    match source {
        mailsort_imap::Error::Dns { .. } => ConnectError::Dns { host, source },
        mailsort_imap::Error::Tls(_) | mailsort_imap::Error::InvalidDnsName(_) => {
            ConnectError::Tls { host, source }
        }
        _ => ConnectError::Io { host, source },
    }
}
