//! IMAP protocol parser.
//!
//! A sans-I/O parser for server responses. The [`lexer`] turns raw bytes
//! into tokens and [`ResponseParser`] builds structured responses from them.
//! Framing (finding where one response ends) is the job of
//! [`FramedStream`](crate::connection::FramedStream); the parser only ever
//! sees one complete response at a time.
//!
//! # Example
//!
//! ```
//! use mailsort_imap::parser::{ResponseParser, Response, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* 5 EXISTS\r\n").unwrap();
//! assert!(matches!(response, Response::Untagged(UntaggedResponse::Exists(5))));
//! ```

mod fetch;
pub mod lexer;
mod response;

pub use fetch::FetchItem;
pub use lexer::{Lexer, Token};
pub use response::{Response, ResponseParser, UntaggedResponse};
