//! IMAP response parser.

#![allow(clippy::missing_errors_doc)]

use crate::types::{
    Capability, CopyResult, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, ResponseCode,
    SeqNum, Status, Tag, Uid, UidSet, UidValidity,
};
use crate::{Error, Result};

use super::fetch::{FetchItem, parse_fetch_items};
use super::lexer::{Lexer, Token};

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Response status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged response (server data).
    Untagged(UntaggedResponse),
    /// Continuation request.
    Continuation {
        /// Optional text.
        text: Option<String>,
    },
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`
    Ok {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* NO`
    No {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BAD`
    Bad {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* PREAUTH`
    PreAuth {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BYE`
    Bye {
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capability(Vec<Capability>),
    /// `* LIST ...`
    List(ListResponse),
    /// `* FLAGS (...)`
    Flags(Flags),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(SeqNum),
    /// `* SEARCH ...`, numbers are UIDs for UID SEARCH.
    Search(Vec<u32>),
    /// `* n FETCH (...)`
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Data items.
        items: Vec<FetchItem>,
    },
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response, including any embedded literals.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer),
            Token::Plus => Ok(Self::parse_continuation(&mut lexer)),
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag),
            token => Err(Error::Parse {
                position: 0,
                message: format!("Expected *, +, or tag, got {token:?}"),
            }),
        }
    }

    fn parse_tagged(lexer: &mut Lexer<'_>, tag: &str) -> Result<Response> {
        lexer.expect_space()?;
        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged {
            tag: Tag::new(tag),
            status,
            code,
            text,
        })
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
        lexer.expect_space()?;

        let untagged = match lexer.next_token()? {
            Token::Atom(keyword) => match keyword.to_ascii_uppercase().as_str() {
                "OK" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Ok { code, text }
                }
                "NO" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::No { code, text }
                }
                "BAD" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Bad { code, text }
                }
                "PREAUTH" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::PreAuth { code, text }
                }
                "BYE" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Bye { code, text }
                }
                "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
                "FLAGS" => {
                    lexer.expect_space()?;
                    UntaggedResponse::Flags(parse_flag_list(lexer)?)
                }
                "LIST" => {
                    lexer.expect_space()?;
                    UntaggedResponse::List(parse_list_response(lexer)?)
                }
                "SEARCH" => UntaggedResponse::Search(parse_search_response(lexer)?),
                _ => {
                    return Err(Error::Parse {
                        position: lexer.position(),
                        message: format!("Unknown untagged response: {keyword}"),
                    });
                }
            },
            Token::Number(n) => {
                lexer.expect_space()?;
                let keyword = lexer.read_atom_string()?;
                let seq = || {
                    SeqNum::new(n).ok_or_else(|| Error::Parse {
                        position: lexer.position(),
                        message: "Invalid sequence number 0".to_string(),
                    })
                };

                match keyword.to_ascii_uppercase().as_str() {
                    "EXISTS" => UntaggedResponse::Exists(n),
                    "RECENT" => UntaggedResponse::Recent(n),
                    "EXPUNGE" => UntaggedResponse::Expunge(seq()?),
                    "FETCH" => {
                        let seq = seq()?;
                        lexer.expect_space()?;
                        let items = parse_fetch_items(lexer)?;
                        UntaggedResponse::Fetch { seq, items }
                    }
                    _ => {
                        return Err(Error::Parse {
                            position: lexer.position(),
                            message: format!("Unknown message data: {keyword}"),
                        });
                    }
                }
            }
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("Unexpected token in untagged response: {token:?}"),
                });
            }
        };

        Ok(Response::Untagged(untagged))
    }

    fn parse_continuation(lexer: &mut Lexer<'_>) -> Response {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let text = lexer.read_text_until_crlf();
        Response::Continuation {
            text: (!text.is_empty()).then_some(text),
        }
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let s = lexer.read_atom_string()?;
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(Error::Parse {
                position: lexer.position(),
                message: format!("Invalid status: {s}"),
            }),
        }
    }

    /// Parses ` [code] text`. Some servers omit the text entirely.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }

        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };

        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }

        Ok((code, lexer.read_text_until_crlf()))
    }
}

fn parse_error(lexer: &Lexer<'_>, message: &str) -> Error {
    Error::Parse {
        position: lexer.position(),
        message: message.to_string(),
    }
}

/// Parses a bracketed response code.
fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;
    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "NONEXISTENT" => ResponseCode::NonExistent,
        "AUTHENTICATIONFAILED" => ResponseCode::AuthenticationFailed,
        "UIDNEXT" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidNext(Uid::new(n).ok_or_else(|| parse_error(lexer, "Invalid UID 0"))?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidValidity(
                UidValidity::new(n).ok_or_else(|| parse_error(lexer, "Invalid UIDVALIDITY 0"))?,
            )
        }
        "COPYUID" => ResponseCode::CopyUid(parse_copyuid(lexer)?),
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?.iter().cloned().collect())
        }
        _ => ResponseCode::Unknown(atom.to_string()),
    };

    // Skip any arguments we do not interpret.
    while lexer.peek().is_some_and(|b| b != b']') {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Parses ` uidvalidity source-set dest-set` of a COPYUID code.
fn parse_copyuid(lexer: &mut Lexer<'_>) -> Result<CopyResult> {
    lexer.expect_space()?;
    let validity = lexer.read_number()?;
    let uid_validity =
        UidValidity::new(validity).ok_or_else(|| parse_error(lexer, "Invalid UIDVALIDITY 0"))?;

    lexer.expect_space()?;
    let source = read_uid_set(lexer)?;
    lexer.expect_space()?;
    let dest = read_uid_set(lexer)?;

    if source.as_slice().len() != dest.as_slice().len() {
        return Err(parse_error(lexer, "COPYUID source and destination sizes differ"));
    }

    Ok(CopyResult {
        uid_validity,
        source,
        dest,
    })
}

fn read_uid_set(lexer: &mut Lexer<'_>) -> Result<UidSet> {
    let raw = match lexer.next_token()? {
        Token::Number(n) => n.to_string(),
        Token::Atom(s) => s.to_string(),
        token => return Err(parse_error(lexer, &format!("Expected UID set, got {token:?}"))),
    };
    UidSet::parse(&raw).ok_or_else(|| parse_error(lexer, &format!("Invalid UID set: {raw}")))
}

/// Parses space-prefixed capability atoms.
fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }

    Ok(caps)
}

/// Parses a parenthesized flag list.
pub(super) fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;
    let mut flags = Flags::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            // `\*` in PERMANENTFLAGS lexes as a lone backslash atom then `*`.
            Token::Atom("\\") if lexer.peek() == Some(b'*') => {
                lexer.advance();
                flags.insert(Flag::Keyword("\\*".to_string()));
            }
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            token => {
                return Err(parse_error(
                    lexer,
                    &format!("Unexpected token in flag list: {token:?}"),
                ));
            }
        }
    }

    Ok(flags)
}

/// Parses `(attrs) delimiter name` of a LIST response.
fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            token => {
                return Err(parse_error(
                    lexer,
                    &format!("Unexpected token in LIST attributes: {token:?}"),
                ));
            }
        }
    }

    lexer.expect_space()?;

    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => {
            return Err(parse_error(lexer, &format!("Expected delimiter, got {token:?}")));
        }
    };

    lexer.expect_space()?;
    let name = lexer.read_astring()?;

    Ok(ListResponse {
        attributes,
        delimiter,
        mailbox: Mailbox::from_wire(name),
    })
}

fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut nums = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Number(n) if n > 0 => nums.push(n),
            // Trailing `(MODSEQ n)` from CONDSTORE servers.
            Token::LParen => break,
            _ => {}
        }
    }

    Ok(nums)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_greeting() {
        let response = ResponseParser::parse(b"* OK [CAPABILITY IMAP4rev1 UIDPLUS] ready\r\n")
            .unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Ok {
                code: Some(ResponseCode::Capability(caps)),
                text,
            }) => {
                assert!(caps.contains(&Capability::UidPlus));
                assert_eq!(text, "ready");
            }
            other => panic!("Expected greeting, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_tagged_no() {
        let response =
            ResponseParser::parse(b"A0004 NO [TRYCREATE] Mailbox doesn't exist\r\n").unwrap();

        assert_eq!(
            response,
            Response::Tagged {
                tag: Tag::new("A0004"),
                status: Status::No,
                code: Some(ResponseCode::TryCreate),
                text: "Mailbox doesn't exist".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_tagged_without_text() {
        let response = ResponseParser::parse(b"A0001 OK\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Tagged {
                status: Status::Ok,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_copyuid() {
        let response =
            ResponseParser::parse(b"A0005 OK [COPYUID 38505 304,319:320 3956:3958] Done\r\n")
                .unwrap();

        let Response::Tagged {
            code: Some(ResponseCode::CopyUid(result)),
            ..
        } = response
        else {
            panic!("Expected COPYUID");
        };
        assert_eq!(result.uid_validity.get(), 38505);
        assert_eq!(result.dest_for(Uid::new(319).unwrap()), Uid::new(3957));
    }

    #[test]
    fn test_parse_copyuid_single() {
        let response = ResponseParser::parse(b"A0006 OK [COPYUID 9 12 501] Copied\r\n").unwrap();
        let Response::Tagged {
            code: Some(ResponseCode::CopyUid(result)),
            ..
        } = response
        else {
            panic!("Expected COPYUID");
        };
        assert_eq!(result.dest_for(Uid::new(12).unwrap()), Uid::new(501));
    }

    #[test]
    fn test_parse_search() {
        let response = ResponseParser::parse(b"* SEARCH 2 84 882\r\n").unwrap();
        assert_eq!(
            response,
            Response::Untagged(UntaggedResponse::Search(vec![2, 84, 882]))
        );

        let empty = ResponseParser::parse(b"* SEARCH\r\n").unwrap();
        assert_eq!(empty, Response::Untagged(UntaggedResponse::Search(vec![])));
    }

    #[test]
    fn test_parse_list_encoded_name() {
        let response =
            ResponseParser::parse(b"* LIST (\\HasNoChildren) \"/\" \"facturaci&APM-n/luz\"\r\n")
                .unwrap();

        let Response::Untagged(UntaggedResponse::List(list)) = response else {
            panic!("Expected LIST");
        };
        assert_eq!(list.delimiter, Some('/'));
        assert_eq!(list.mailbox.as_str(), "facturaci&APM-n/luz");
    }

    #[test]
    fn test_parse_list_nil_delimiter() {
        let response = ResponseParser::parse(b"* LIST (\\Noselect) NIL \"\"\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::List(list)) = response else {
            panic!("Expected LIST");
        };
        assert_eq!(list.delimiter, None);
        assert!(!list.is_selectable());
    }

    #[test]
    fn test_parse_exists_and_expunge() {
        assert_eq!(
            ResponseParser::parse(b"* 23 EXISTS\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Exists(23))
        );
        assert_eq!(
            ResponseParser::parse(b"* 3 EXPUNGE\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Expunge(SeqNum::new(3).unwrap()))
        );
        assert!(ResponseParser::parse(b"* 0 EXPUNGE\r\n").is_err());
    }

    #[test]
    fn test_parse_fetch() {
        let response = ResponseParser::parse(b"* 12 FETCH (UID 100 FLAGS (\\Seen))\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::Fetch { seq, items }) = response else {
            panic!("Expected FETCH");
        };
        assert_eq!(seq.get(), 12);
        assert_eq!(items[0], FetchItem::Uid(Uid::new(100).unwrap()));
    }

    #[test]
    fn test_parse_permanentflags() {
        let response = ResponseParser::parse(
            b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n",
        )
        .unwrap();
        let Response::Untagged(UntaggedResponse::Ok {
            code: Some(ResponseCode::PermanentFlags(flags)),
            ..
        }) = response
        else {
            panic!("Expected PERMANENTFLAGS");
        };
        assert!(flags.contains(&Flag::Deleted));
    }

    #[test]
    fn test_parse_continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ go ahead\r\n").unwrap(),
            Response::Continuation {
                text: Some("go ahead".to_string())
            }
        );
    }

    #[test]
    fn test_unknown_code_is_kept() {
        let response = ResponseParser::parse(b"* OK [HIGHESTMODSEQ 715194045007] Ok\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Untagged(UntaggedResponse::Ok {
                code: Some(ResponseCode::Unknown(_)),
                ..
            })
        ));
    }
}
