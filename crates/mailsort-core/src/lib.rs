//! # mailsort-core
//!
//! Rule-based classification of an IMAP inbox.
//!
//! This crate provides:
//! - Configuration loading ([`Config`])
//! - The rule tree and query compiler ([`rules`])
//! - The mail session capability and its IMAP implementation ([`session`])
//! - The folder existence guard ([`FolderGuard`])
//! - The move and reconcile engine ([`Engine`])
//! - Unread mail reporting ([`unread`])

#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
mod error;
pub mod guard;
pub mod rules;
pub mod service;
pub mod session;
pub mod unread;

pub use config::{Config, ConfigError, LoginConfig, Settings};
pub use engine::{Engine, LeafOutcome, LeafReport, MoveBatch, RunOptions, RunReport};
pub use error::{Error, Result};
pub use guard::{FolderGuard, GuardError};
pub use rules::{CompiledQuery, FolderPath, LeafPredicate, RuleTree, compile};
pub use service::{count_unread, organize, show_unread};
pub use session::{
    ConnectError, FlagDelta, ImapSession, MailSession, MessageId, RawMessage, SessionError,
};
pub use unread::UnreadMessage;
