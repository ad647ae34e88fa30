//! Integration tests for the IMAP client.
//!
//! These tests use a mock stream to simulate IMAP server responses
//! without requiring a real server connection.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailsort_imap::types::encode_name;
use mailsort_imap::{
    Client, Error, FetchAttribute, FetchItem, Flag, Mailbox, SearchCriteria, StoreAction, Uid,
    UidSet,
};

/// Mock stream that returns predefined responses and records what the
/// client wrote.
struct MockStream {
    responses: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
    String::from_utf8(sent.lock().unwrap().clone())
        .unwrap()
        .split_terminator("\r\n")
        .map(str::to_string)
        .collect()
}

fn uids(ns: &[u32]) -> UidSet {
    ns.iter().map(|&n| Uid::new(n).unwrap()).collect()
}

const GREETING: &[u8] = b"* OK [CAPABILITY IMAP4rev1 UIDPLUS AUTH=PLAIN] ready\r\n";

#[tokio::test]
async fn test_greeting_capabilities() {
    let (mock, _) = MockStream::new(GREETING);
    let client = Client::from_stream(mock).await.unwrap();

    assert!(client.supports_uidplus());
}

#[tokio::test]
async fn test_greeting_without_uidplus() {
    let (mock, _) = MockStream::new(b"* OK [CAPABILITY IMAP4rev1] ready\r\n");
    let client = Client::from_stream(mock).await.unwrap();

    assert!(!client.supports_uidplus());
}

#[tokio::test]
async fn test_greeting_bye() {
    let (mock, _) = MockStream::new(b"* BYE too many connections\r\n");
    let err = Client::from_stream(mock).await.unwrap_err();

    assert!(matches!(err, Error::Bye(text) if text == "too many connections"));
}

#[tokio::test]
async fn test_login_rejected() {
    let mut script = GREETING.to_vec();
    script.extend_from_slice(b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n");
    let (mock, sent) = MockStream::new(&script);

    let client = Client::from_stream(mock).await.unwrap();
    let err = client.login("user@example.com", "wrong").await.unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    assert_eq!(sent_lines(&sent), ["A0001 LOGIN user@example.com wrong"]);
}

#[tokio::test]
async fn test_list_keeps_wire_names() {
    let mut script = GREETING.to_vec();
    script.extend_from_slice(b"A0001 OK LOGIN completed\r\n");
    script.extend_from_slice(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n");
    script.extend_from_slice(b"* LIST (\\HasChildren) \"/\" facturaci&APM-n\r\n");
    script.extend_from_slice(b"* LIST (\\HasNoChildren) \"/\" \"facturaci&APM-n/luz\"\r\n");
    script.extend_from_slice(b"* LIST (\\Noselect \\HasChildren) \"/\" \"[Gmail]\"\r\n");
    script.extend_from_slice(b"A0002 OK LIST completed\r\n");
    let (mock, sent) = MockStream::new(&script);

    let mut client = Client::from_stream(mock)
        .await
        .unwrap()
        .login("user", "pass")
        .await
        .unwrap();
    let folders = client.list("", "*").await.unwrap();

    let names: Vec<&str> = folders
        .iter()
        .filter(|f| f.is_selectable())
        .map(|f| f.mailbox.as_str())
        .collect();
    assert_eq!(names, ["INBOX", "facturaci&APM-n", "facturaci&APM-n/luz"]);
    assert_eq!(encode_name("facturación/luz"), names[2]);
    assert_eq!(sent_lines(&sent)[1], "A0002 LIST \"\" \"*\"");
}

#[tokio::test]
async fn test_move_workflow() {
    let mut script = GREETING.to_vec();
    script.extend_from_slice(b"A0001 OK LOGIN completed\r\n");
    // SELECT INBOX
    script.extend_from_slice(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n");
    script.extend_from_slice(b"* 3 EXISTS\r\n");
    script.extend_from_slice(b"* 0 RECENT\r\n");
    script.extend_from_slice(b"* OK [UIDVALIDITY 1700000000] UIDs valid\r\n");
    script.extend_from_slice(b"* OK [UIDNEXT 13] Predicted next UID\r\n");
    script.extend_from_slice(b"A0002 OK [READ-WRITE] SELECT completed\r\n");
    // UID SEARCH
    script.extend_from_slice(b"* SEARCH 10 12\r\n");
    script.extend_from_slice(b"A0003 OK SEARCH completed\r\n");
    // UID COPY
    script.extend_from_slice(b"A0004 OK [COPYUID 1700000100 10,12 501:502] COPY completed\r\n");
    // UID STORE
    script.extend_from_slice(b"A0005 OK STORE completed\r\n");
    // EXPUNGE
    script.extend_from_slice(b"* 3 EXPUNGE\r\n");
    script.extend_from_slice(b"* 1 EXPUNGE\r\n");
    script.extend_from_slice(b"A0006 OK EXPUNGE completed\r\n");
    // SELECT destination
    script.extend_from_slice(b"* 2 EXISTS\r\n");
    script.extend_from_slice(b"A0007 OK [READ-WRITE] SELECT completed\r\n");
    // UID STORE -FLAGS
    script.extend_from_slice(b"A0008 OK STORE completed\r\n");
    // LOGOUT
    script.extend_from_slice(b"* BYE logging out\r\n");
    script.extend_from_slice(b"A0009 OK LOGOUT completed\r\n");
    let (mock, sent) = MockStream::new(&script);

    let client = Client::from_stream(mock)
        .await
        .unwrap()
        .login("user", "pass")
        .await
        .unwrap();

    let (mut inbox, status) = client.select(&Mailbox::from_wire("INBOX")).await.unwrap();
    assert_eq!(status.exists, 3);
    assert_eq!(status.uid_next.map(Uid::get), Some(13));
    assert!(!status.read_only);

    let criteria = SearchCriteria::And(vec![
        SearchCriteria::From("openbank".into()),
        SearchCriteria::Subject("extracto mensual".into()),
    ]);
    let found = inbox.uid_search(&criteria).await.unwrap();
    assert_eq!(found, uids(&[10, 12]).as_slice());

    let dest = Mailbox::from_wire(encode_name("facturación/luz"));
    let copy = inbox
        .uid_copy(&uids(&[10, 12]), &dest)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(copy.dest_for(Uid::new(12).unwrap()), Uid::new(502));

    inbox
        .uid_store(&uids(&[10, 12]), StoreAction::AddFlags(vec![Flag::Deleted]))
        .await
        .unwrap();
    let expunged = inbox.expunge().await.unwrap();
    assert_eq!(expunged.len(), 2);

    let (mut folder, _) = inbox.select(&dest).await.unwrap();
    assert_eq!(folder.mailbox(), &dest);
    folder
        .uid_store(&copy.dest, StoreAction::RemoveFlags(vec![Flag::Seen]))
        .await
        .unwrap();
    folder.logout().await.unwrap();

    assert_eq!(
        sent_lines(&sent),
        [
            "A0001 LOGIN user pass",
            "A0002 SELECT INBOX",
            "A0003 UID SEARCH FROM openbank SUBJECT \"extracto mensual\"",
            "A0004 UID COPY 10,12 facturaci&APM-n/luz",
            "A0005 UID STORE 10,12 +FLAGS.SILENT (\\Deleted)",
            "A0006 EXPUNGE",
            "A0007 SELECT facturaci&APM-n/luz",
            "A0008 UID STORE 501:502 -FLAGS.SILENT (\\Seen)",
            "A0009 LOGOUT",
        ]
    );
}

#[tokio::test]
async fn test_select_failure_returns_connection() {
    let mut script = GREETING.to_vec();
    script.extend_from_slice(b"A0001 OK LOGIN completed\r\n");
    script.extend_from_slice(b"A0002 NO [NONEXISTENT] Mailbox doesn't exist\r\n");
    script.extend_from_slice(b"A0003 OK LIST completed\r\n");
    let (mock, _) = MockStream::new(&script);

    let client = Client::from_stream(mock)
        .await
        .unwrap()
        .login("user", "pass")
        .await
        .unwrap();

    let failure = client
        .select(&Mailbox::from_wire("missing"))
        .await
        .unwrap_err();
    assert!(matches!(failure.error, Error::MailboxNotFound(_)));

    let mut client = failure.client.unwrap();
    assert!(client.list("", "*").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_select_failure_after_disconnect() {
    let mut script = GREETING.to_vec();
    script.extend_from_slice(b"A0001 OK LOGIN completed\r\n");
    let (mock, _) = MockStream::new(&script);

    let client = Client::from_stream(mock)
        .await
        .unwrap()
        .login("user", "pass")
        .await
        .unwrap();

    let failure = client.select(&Mailbox::from_wire("INBOX")).await.unwrap_err();
    assert!(failure.client.is_none());
    assert!(failure.error.is_fatal());
}

#[tokio::test]
async fn test_uid_fetch_headers_with_literal() {
    let header = b"From: Openbank <avisos@openbank.es>\r\nSubject: Extracto\r\n\r\n";
    let mut script = GREETING.to_vec();
    script.extend_from_slice(b"A0001 OK LOGIN completed\r\n");
    script.extend_from_slice(b"* 1 EXISTS\r\n");
    script.extend_from_slice(b"A0002 OK [READ-WRITE] SELECT completed\r\n");
    script.extend_from_slice(
        format!(
            "* 1 FETCH (UID 7 BODY[HEADER.FIELDS (FROM SUBJECT)] {{{}}}\r\n",
            header.len()
        )
        .as_bytes(),
    );
    script.extend_from_slice(header);
    script.extend_from_slice(b")\r\n");
    script.extend_from_slice(b"A0003 OK FETCH completed\r\n");
    let (mock, sent) = MockStream::new(&script);

    let client = Client::from_stream(mock)
        .await
        .unwrap()
        .login("user", "pass")
        .await
        .unwrap();
    let (mut inbox, _) = client.select(&Mailbox::from_wire("INBOX")).await.unwrap();

    let fetched = inbox
        .uid_fetch(
            &uids(&[7]),
            vec![FetchAttribute::Body {
                section: Some("HEADER.FIELDS (FROM SUBJECT)".into()),
                peek: true,
            }],
        )
        .await
        .unwrap();

    assert_eq!(fetched.len(), 1);
    let (_, items) = &fetched[0];
    assert!(items.contains(&FetchItem::Uid(Uid::new(7).unwrap())));
    let body = items.iter().find_map(|item| match item {
        FetchItem::Body { data, .. } => data.clone(),
        _ => None,
    });
    assert_eq!(body.as_deref(), Some(&header[..]));
    assert_eq!(
        sent_lines(&sent)[2],
        "A0003 UID FETCH 7 BODY.PEEK[HEADER.FIELDS (FROM SUBJECT)]"
    );
}

#[tokio::test]
async fn test_empty_uid_set_sends_nothing() {
    let mut script = GREETING.to_vec();
    script.extend_from_slice(b"A0001 OK LOGIN completed\r\n");
    script.extend_from_slice(b"A0002 OK [READ-WRITE] SELECT completed\r\n");
    let (mock, sent) = MockStream::new(&script);

    let client = Client::from_stream(mock)
        .await
        .unwrap()
        .login("user", "pass")
        .await
        .unwrap();
    let (mut inbox, _) = client.select(&Mailbox::from_wire("INBOX")).await.unwrap();

    let empty = UidSet::default();
    assert!(inbox.uid_copy(&empty, &Mailbox::from_wire("x")).await.unwrap().is_none());
    inbox
        .uid_store(&empty, StoreAction::AddFlags(vec![Flag::Deleted]))
        .await
        .unwrap();
    let whole = FetchAttribute::Body {
        section: None,
        peek: true,
    };
    assert!(inbox.uid_fetch(&empty, vec![whole]).await.unwrap().is_empty());

    assert_eq!(sent_lines(&sent).len(), 2);
}

#[tokio::test]
async fn test_non_ascii_search_waits_for_continuation() {
    let mut script = GREETING.to_vec();
    script.extend_from_slice(b"A0001 OK LOGIN completed\r\n");
    script.extend_from_slice(b"A0002 OK [READ-WRITE] SELECT completed\r\n");
    script.extend_from_slice(b"+ Ready for literal data\r\n");
    script.extend_from_slice(b"* SEARCH 4 9\r\n");
    script.extend_from_slice(b"A0003 OK SEARCH completed\r\n");
    let (mock, sent) = MockStream::new(&script);

    let client = Client::from_stream(mock)
        .await
        .unwrap()
        .login("user", "pass")
        .await
        .unwrap();
    let (mut inbox, _) = client.select(&Mailbox::from_wire("INBOX")).await.unwrap();

    let found = inbox
        .uid_search(&SearchCriteria::Subject("nómina".into()))
        .await
        .unwrap();

    assert_eq!(found, uids(&[4, 9]).as_slice());
    assert_eq!(
        sent_lines(&sent)[2..],
        ["A0003 UID SEARCH CHARSET UTF-8 SUBJECT {7}", "nómina"]
    );
}

#[tokio::test]
async fn test_refused_literal_is_not_sent() {
    let mut script = GREETING.to_vec();
    script.extend_from_slice(b"A0001 OK LOGIN completed\r\n");
    script.extend_from_slice(b"A0002 OK [READ-WRITE] SELECT completed\r\n");
    script.extend_from_slice(b"A0003 NO [BADCHARSET (US-ASCII)] charset not supported\r\n");
    let (mock, sent) = MockStream::new(&script);

    let client = Client::from_stream(mock)
        .await
        .unwrap()
        .login("user", "pass")
        .await
        .unwrap();
    let (mut inbox, _) = client.select(&Mailbox::from_wire("INBOX")).await.unwrap();

    let err = inbox
        .uid_search(&SearchCriteria::Body("tarifa eléctrica".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::No(_)));
    assert_eq!(
        sent_lines(&sent)[2..],
        ["A0003 UID SEARCH CHARSET UTF-8 BODY {17}"]
    );
}
