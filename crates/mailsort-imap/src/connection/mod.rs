//! IMAP connection management.
//!
//! - TLS/plaintext stream abstraction
//! - Framed I/O for IMAP responses and literals
//! - Type-state client wrapper

mod client;
mod framed;
mod stream;

pub use client::{Authenticated, Client, NotAuthenticated, SelectFailure, Selected};
pub use framed::{FramedStream, ResponseAccumulator};
pub use stream::{ImapStream, connect_plain, connect_tls, create_tls_connector, resolve};
