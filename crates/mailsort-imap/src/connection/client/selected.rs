//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::Selected;
use super::{Client, SelectFailure};
use crate::Result;
use crate::command::{Command, FetchAttribute, SearchCriteria, StoreAction};
use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::{
    CopyResult, ListResponse, Mailbox, MailboxStatus, ResponseCode, SeqNum, Uid, UidSet,
};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        self.state.mailbox()
    }

    /// Selects a different mailbox.
    pub async fn select(
        self,
        mailbox: &Mailbox,
    ) -> std::result::Result<(Self, MailboxStatus), SelectFailure<S>> {
        self.select_mailbox(mailbox).await
    }

    /// Lists mailboxes matching `pattern` under `reference`.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        self.list_mailboxes(reference, pattern).await
    }

    /// Returns the UIDs of the messages matching `criteria`.
    pub async fn uid_search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>> {
        let completion = self
            .execute(&Command::UidSearch {
                criteria: criteria.clone(),
            })
            .await?;

        let mut uids = Vec::new();
        for response in completion.untagged {
            if let UntaggedResponse::Search(ids) = response {
                uids.extend(ids.into_iter().filter_map(Uid::new));
            }
        }
        Ok(uids)
    }

    /// Fetches message data by UID.
    ///
    /// Returns a vector of (sequence number, fetch items) pairs.
    pub async fn uid_fetch(
        &mut self,
        uids: &UidSet,
        items: Vec<FetchAttribute>,
    ) -> Result<Vec<(SeqNum, Vec<FetchItem>)>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let completion = self
            .execute(&Command::UidFetch {
                uids: uids.clone(),
                items,
            })
            .await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|response| match response {
                UntaggedResponse::Fetch { seq, items } => Some((seq, items)),
                _ => None,
            })
            .collect())
    }

    /// Changes flags on messages by UID without asking for the new flags.
    pub async fn uid_store(&mut self, uids: &UidSet, action: StoreAction) -> Result<()> {
        if uids.is_empty() {
            return Ok(());
        }

        self.execute(&Command::UidStore {
            uids: uids.clone(),
            action,
            silent: true,
        })
        .await?;
        Ok(())
    }

    /// Copies messages by UID to another mailbox.
    ///
    /// Returns the COPYUID mapping when the server supplies one.
    pub async fn uid_copy(
        &mut self,
        uids: &UidSet,
        mailbox: &Mailbox,
    ) -> Result<Option<CopyResult>> {
        if uids.is_empty() {
            return Ok(None);
        }

        let completion = self
            .execute(&Command::UidCopy {
                uids: uids.clone(),
                mailbox: mailbox.clone(),
            })
            .await?;

        Ok(match completion.code {
            Some(ResponseCode::CopyUid(result)) => Some(result),
            _ => None,
        })
    }

    /// Permanently removes messages flagged `\Deleted`.
    ///
    /// Returns the sequence numbers reported as expunged.
    pub async fn expunge(&mut self) -> Result<Vec<SeqNum>> {
        let completion = self.execute(&Command::Expunge).await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|response| match response {
                UntaggedResponse::Expunge(seq) => Some(seq),
                _ => None,
            })
            .collect())
    }
}
