//! Folder existence guard.
//!
//! Before anything is copied, the destination is encoded to its wire form
//! and looked up in the server's folder listing. The listing is fetched once
//! per run. If it cannot be fetched every check fails, so no leaf moves
//! mail into a folder nobody verified.

use std::collections::HashSet;

use mailsort_imap::types::encode_name;
use thiserror::Error;
use tracing::{debug, error};

use crate::rules::FolderPath;
use crate::session::{MailSession, SessionError};

/// Why a destination was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// The folder is not in the server listing.
    #[error("folder '{0}' does not exist on the server")]
    Missing(String),

    /// The listing could not be fetched.
    #[error("folder listing unavailable: {0}")]
    ListingUnavailable(SessionError),
}

#[derive(Debug)]
enum Listing {
    NotLoaded,
    Loaded(HashSet<String>),
    Failed(SessionError),
}

/// Checks destinations against the server's folder listing.
#[derive(Debug)]
pub struct FolderGuard {
    delimiter: String,
    listing: Listing,
}

impl FolderGuard {
    /// Creates a guard for a server using `delimiter` between levels.
    #[must_use]
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            listing: Listing::NotLoaded,
        }
    }

    /// Returns the wire name of a destination.
    #[must_use]
    pub fn wire_name(&self, path: &FolderPath) -> String {
        encode_name(&path.render(&self.delimiter))
    }

    /// Resolves a destination to its wire name if the folder exists.
    pub async fn resolve<S: MailSession>(
        &mut self,
        session: &mut S,
        path: &FolderPath,
    ) -> Result<String, GuardError> {
        let wire = self.wire_name(path);

        if matches!(self.listing, Listing::NotLoaded) {
            self.listing = match session.list_folders().await {
                Ok(folders) => {
                    debug!(count = folders.len(), "loaded folder listing");
                    Listing::Loaded(folders.into_iter().collect())
                }
                Err(err) => {
                    error!(error = %err, "could not list folders; no folder will be used");
                    Listing::Failed(err)
                }
            };
        }

        match &self.listing {
            Listing::Loaded(folders) if folders.contains(&wire) => Ok(wire),
            Listing::Loaded(_) => Err(GuardError::Missing(wire)),
            Listing::Failed(err) => Err(GuardError::ListingUnavailable(err.clone())),
            Listing::NotLoaded => Err(GuardError::ListingUnavailable(SessionError::Protocol(
                "listing not loaded".to_string(),
            ))),
        }
    }

    /// Returns true if the destination exists.
    pub async fn exists<S: MailSession>(&mut self, session: &mut S, path: &FolderPath) -> bool {
        self.resolve(session, path).await.is_ok()
    }
}
