//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, Selected};
use super::{Client, SelectFailure};
use crate::Result;
use crate::types::{ListResponse, Mailbox, MailboxStatus};

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox for read-write access.
    pub async fn select(
        self,
        mailbox: &Mailbox,
    ) -> std::result::Result<(Client<S, Selected>, MailboxStatus), SelectFailure<S>> {
        self.select_mailbox(mailbox).await
    }

    /// Lists mailboxes matching `pattern` under `reference`.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        self.list_mailboxes(reference, pattern).await
    }
}
