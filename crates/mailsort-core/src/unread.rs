//! Unread mail in the inbox.

use serde::Serialize;
use tracing::{info, warn};

use crate::session::{MailSession, MessageId, SearchCriteria, SessionError};

/// Header summary of an unread message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadMessage {
    /// Message id in the inbox.
    #[serde(serialize_with = "serialize_id")]
    pub id: MessageId,
    /// `From` header.
    pub from: String,
    /// `Subject` header.
    pub subject: String,
    /// `Date` header.
    pub date: String,
}

fn serialize_id<S: serde::Serializer>(id: &MessageId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u32(id.get())
}

/// Returns the number of unread messages in `inbox`.
pub async fn unread_count<S: MailSession>(
    session: &mut S,
    inbox: &str,
) -> Result<usize, SessionError> {
    session.select(inbox).await?;
    let count = session.search(&SearchCriteria::Unseen).await?.len();
    info!(inbox, count, "unread messages");
    Ok(count)
}

/// Lists sender, subject and date of every unread message in `inbox`.
///
/// Only the header block is fetched, with peek, so messages stay unread. A
/// message that cannot be fetched is logged and left out.
pub async fn list_unread<S: MailSession>(
    session: &mut S,
    inbox: &str,
) -> Result<Vec<UnreadMessage>, SessionError> {
    session.select(inbox).await?;
    let ids = session.search(&SearchCriteria::Unseen).await?;

    let mut messages = Vec::with_capacity(ids.len());
    for id in ids {
        match session.fetch_headers(id).await {
            Ok(raw) => messages.push(UnreadMessage {
                id,
                from: raw.header("From").unwrap_or_default(),
                subject: raw.header("Subject").unwrap_or_default(),
                date: raw.header("Date").unwrap_or_default(),
            }),
            Err(err) => warn!(%id, error = %err, "could not fetch unread message"),
        }
    }

    Ok(messages)
}
