//! Type-state markers for IMAP client connection states.

use crate::types::Mailbox;

/// Marker type for the not-authenticated state.
///
/// In this state only LOGIN is valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker type for the authenticated state.
///
/// In this state LIST and SELECT are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// State for a selected mailbox.
///
/// Carries the name of the mailbox the server has open.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: Mailbox,
}

impl Selected {
    /// Creates a new Selected state.
    #[must_use]
    pub const fn new(mailbox: Mailbox) -> Self {
        Self { mailbox }
    }

    /// Returns the selected mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_states_are_send_sync() {
        assert_send::<NotAuthenticated>();
        assert_sync::<NotAuthenticated>();
        assert_send::<Authenticated>();
        assert_sync::<Authenticated>();
        assert_send::<Selected>();
        assert_sync::<Selected>();
    }

    #[test]
    fn test_selected_mailbox() {
        let selected = Selected::new(Mailbox::from_wire("facturaci&APM-n/luz"));
        assert_eq!(selected.mailbox().as_str(), "facturaci&APM-n/luz");
    }
}
