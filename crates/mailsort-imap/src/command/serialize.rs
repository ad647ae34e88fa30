//! Command serialization helpers.

use crate::types::Mailbox;

use super::types::{FetchAttribute, SearchCriteria, StoreAction};

/// Bytes of one command, split where a synchronizing literal begins.
///
/// Everything after a `{n}\r\n` marker may only be sent once the server
/// has answered with a `+` continuation.
#[derive(Debug, Default)]
pub struct CommandBytes {
    bytes: Vec<u8>,
    splits: Vec<usize>,
    /// Render 8-bit values as quoted text instead, for logs and reports.
    display: bool,
}

impl CommandBytes {
    /// Buffer for the wire form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer for the human-readable form.
    pub fn display() -> Self {
        Self {
            display: true,
            ..Self::default()
        }
    }

    pub fn push(&mut self, b: u8) {
        self.bytes.push(b);
    }

    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Returns the whole command.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns the command cut at every literal marker.
    pub fn into_parts(self) -> Vec<Vec<u8>> {
        let mut parts = Vec::with_capacity(self.splits.len() + 1);
        let mut start = 0;
        for &end in &self.splits {
            parts.push(self.bytes[start..end].to_vec());
            start = end;
        }
        parts.push(self.bytes[start..].to_vec());
        parts
    }
}

/// Writes an astring: a bare atom when possible, a quoted string for 7-bit
/// text and a literal for anything with 8-bit bytes.
pub fn write_astring(buf: &mut CommandBytes, s: &str) {
    if !s.is_ascii() && !buf.display {
        buf.extend_from_slice(format!("{{{}}}\r\n", s.len()).as_bytes());
        buf.splits.push(buf.bytes.len());
        buf.extend_from_slice(s.as_bytes());
    } else if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Writes a mailbox name in wire form.
pub fn write_mailbox(buf: &mut CommandBytes, mailbox: &Mailbox) {
    write_astring(buf, mailbox.as_str());
}

/// Returns true if the byte cannot appear in an atom.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b >= 0x7F
}

/// Writes a FETCH attribute list.
pub fn write_fetch_attributes(buf: &mut CommandBytes, attrs: &[FetchAttribute]) {
    if let [single] = attrs {
        write_fetch_attribute(buf, single);
        return;
    }
    buf.push(b'(');
    for (i, attr) in attrs.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        write_fetch_attribute(buf, attr);
    }
    buf.push(b')');
}

fn write_fetch_attribute(buf: &mut CommandBytes, attr: &FetchAttribute) {
    let FetchAttribute::Body { section, peek } = attr;
    buf.extend_from_slice(if *peek { b"BODY.PEEK[" } else { b"BODY[" });
    if let Some(s) = section {
        buf.extend_from_slice(s.as_bytes());
    }
    buf.push(b']');
}

/// Writes a STORE action.
pub fn write_store_action(buf: &mut CommandBytes, action: &StoreAction, silent: bool) {
    let (prefix, flags) = match action {
        StoreAction::AddFlags(f) => ("+FLAGS", f),
        StoreAction::RemoveFlags(f) => ("-FLAGS", f),
    };
    buf.extend_from_slice(prefix.as_bytes());
    if silent {
        buf.extend_from_slice(b".SILENT");
    }
    buf.extend_from_slice(b" (");
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(flag.as_str().as_bytes());
    }
    buf.push(b')');
}

/// Writes SEARCH criteria. Empty members of an `And` are dropped so the
/// output never carries stray spaces.
pub fn write_search_criteria(buf: &mut CommandBytes, criteria: &SearchCriteria) {
    match criteria {
        SearchCriteria::All => buf.extend_from_slice(b"ALL"),
        SearchCriteria::Unseen => buf.extend_from_slice(b"UNSEEN"),
        SearchCriteria::From(s) => {
            buf.extend_from_slice(b"FROM ");
            write_astring(buf, s);
        }
        SearchCriteria::Subject(s) => {
            buf.extend_from_slice(b"SUBJECT ");
            write_astring(buf, s);
        }
        SearchCriteria::Body(s) => {
            buf.extend_from_slice(b"BODY ");
            write_astring(buf, s);
        }
        SearchCriteria::And(all) => {
            let mut first = true;
            for c in all.iter().filter(|c| !c.is_empty()) {
                if !first {
                    buf.push(b' ');
                }
                first = false;
                write_search_criteria(buf, c);
            }
        }
    }
}
