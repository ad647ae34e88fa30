//! FETCH response parsing.

use crate::types::{Flags, Uid};
use crate::{Error, Result};

use super::lexer::{Lexer, Token};
use super::response::parse_flag_list;

/// One data item of a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// Message flags.
    Flags(Flags),
    /// UID.
    Uid(Uid),
    /// Body section data.
    Body {
        /// Section specifier, `None` for the whole message.
        section: Option<String>,
        /// Body data, `None` when the server sent NIL.
        data: Option<Vec<u8>>,
    },
}

/// Parses the parenthesized item list of a FETCH response.
pub fn parse_fetch_items(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;
    let mut items = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => match name.to_ascii_uppercase().as_str() {
                "FLAGS" => {
                    lexer.expect_space()?;
                    items.push(FetchItem::Flags(parse_flag_list(lexer)?));
                }
                "UID" => {
                    lexer.expect_space()?;
                    let n = lexer.read_number()?;
                    let uid = Uid::new(n).ok_or_else(|| Error::Parse {
                        position: lexer.position(),
                        message: "UID cannot be 0".to_string(),
                    })?;
                    items.push(FetchItem::Uid(uid));
                }
                "BODY" | "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" => {
                    let section = parse_section(lexer)?;
                    skip_origin(lexer);
                    lexer.expect_space()?;
                    let data = lexer.read_nstring_bytes()?;
                    items.push(FetchItem::Body { section, data });
                }
                _ => {
                    lexer.expect_space()?;
                    skip_value(lexer)?;
                }
            },
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("Unexpected token in FETCH: {token:?}"),
                });
            }
        }
    }

    Ok(items)
}

/// Reads `[section]` if present. The section text may contain spaces and
/// parentheses (`HEADER.FIELDS (FROM)`), so it is read byte-wise.
fn parse_section(lexer: &mut Lexer<'_>) -> Result<Option<String>> {
    if lexer.peek() != Some(b'[') {
        return Ok(None);
    }
    lexer.advance();

    let mut section = String::new();
    loop {
        match lexer.advance() {
            Some(b']') => break,
            Some(b) => section.push(char::from(b)),
            None => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: "Unterminated body section".to_string(),
                });
            }
        }
    }

    Ok(if section.is_empty() {
        None
    } else {
        Some(section)
    })
}

/// Skips a partial-fetch origin such as `<0>`.
fn skip_origin(lexer: &mut Lexer<'_>) {
    if lexer.peek() == Some(b'<') {
        while let Some(b) = lexer.advance() {
            if b == b'>' {
                break;
            }
        }
    }
}

/// Skips one value of an item the client did not ask for.
fn skip_value(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen if depth > 0 => depth -= 1,
            Token::RParen | Token::Crlf | Token::Eof => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: "Unexpected end of FETCH item".to_string(),
                });
            }
            _ => {}
        }
        if depth == 0 {
            return Ok(());
        }
    }
}
