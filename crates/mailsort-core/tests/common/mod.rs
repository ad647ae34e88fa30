//! In-memory mail server for engine tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap, HashSet};

use mailsort_core::rules::FolderEntry;
use mailsort_core::session::{Flag, SearchCriteria};
use mailsort_core::{
    FlagDelta, LeafPredicate, MailSession, MessageId, RawMessage, RuleTree, SessionError,
};

/// A stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMessage {
    pub uid: u32,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub seen: bool,
    pub deleted: bool,
}

/// A call the engine made, for asserting on traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Select(String),
    Search(String),
    Fetch(u32, bool),
    FetchHeaders(u32),
    Copy(u32, String),
    SetFlags(u32, FlagDelta),
    Expunge,
    ListFolders,
}

#[derive(Debug, Default)]
struct Folder {
    messages: Vec<FakeMessage>,
    next_uid: u32,
}

/// Fake [`MailSession`] backed by in-memory folders.
#[derive(Debug)]
pub struct FakeMailbox {
    folders: BTreeMap<String, Folder>,
    selected: Option<String>,
    pub calls: Vec<Call>,
    /// Source uids whose copy fails.
    pub fail_copy: HashSet<u32>,
    /// Searches whose text contains one of these fail.
    pub fail_search: HashSet<String>,
    pub fail_list: bool,
    /// Number of upcoming expunges that fail.
    pub fail_expunge: usize,
    /// Removing `\Deleted` fails.
    pub fail_undelete: bool,
    /// Report COPYUID destination ids.
    pub copyuid: bool,
}

impl FakeMailbox {
    pub fn new() -> Self {
        let mut mailbox = Self {
            folders: BTreeMap::new(),
            selected: None,
            calls: Vec::new(),
            fail_copy: HashSet::new(),
            fail_search: HashSet::new(),
            fail_list: false,
            fail_expunge: 0,
            fail_undelete: false,
            copyuid: true,
        };
        mailbox.add_folder("INBOX");
        mailbox
    }

    /// Creates a folder by wire name.
    pub fn add_folder(&mut self, wire: &str) -> &mut Self {
        self.folders.entry(wire.to_string()).or_insert(Folder {
            messages: Vec::new(),
            next_uid: 1,
        });
        self
    }

    /// Appends a read message to the inbox and returns its uid.
    pub fn deliver(&mut self, from: &str, subject: &str, body: &str) -> u32 {
        self.deliver_to("INBOX", from, subject, body, true)
    }

    pub fn deliver_to(&mut self, wire: &str, from: &str, subject: &str, body: &str, seen: bool) -> u32 {
        let folder = self.folders.get_mut(wire).unwrap();
        let uid = folder.next_uid;
        folder.next_uid += 1;
        folder.messages.push(FakeMessage {
            uid,
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            seen,
            deleted: false,
        });
        uid
    }

    pub fn messages(&self, wire: &str) -> &[FakeMessage] {
        &self.folders[wire].messages
    }

    pub fn uids(&self, wire: &str) -> Vec<u32> {
        self.messages(wire).iter().map(|m| m.uid).collect()
    }

    pub fn copies(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Copy(uid, _) => Some(*uid),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::SetFlags(uid, FlagDelta::Add(Flag::Deleted)) => Some(*uid),
                _ => None,
            })
            .collect()
    }

    pub fn searches(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Search(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    fn selected_folder(&mut self) -> Result<&mut Folder, SessionError> {
        let name = self
            .selected
            .clone()
            .ok_or_else(|| SessionError::Protocol("no folder selected".into()))?;
        Ok(self.folders.get_mut(&name).unwrap())
    }
}

fn is_match(message: &FakeMessage, criteria: &SearchCriteria) -> bool {
    let contains = |haystack: &str, needle: &str| {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    };
    match criteria {
        SearchCriteria::All => true,
        SearchCriteria::Unseen => !message.seen,
        SearchCriteria::From(s) => contains(&message.from, s),
        SearchCriteria::Subject(s) => contains(&message.subject, s),
        SearchCriteria::Body(s) => contains(&message.body, s),
        SearchCriteria::And(all) => all.iter().all(|c| is_match(message, c)),
    }
}

fn header_block(message: &FakeMessage) -> String {
    format!(
        "From: {}\r\nSubject: {}\r\nDate: Mon, 6 Jan 2025 10:00:00 +0100\r\n\r\n",
        message.from, message.subject
    )
}

fn id(uid: u32) -> MessageId {
    MessageId::new(uid).unwrap()
}

impl MailSession for FakeMailbox {
    async fn select(&mut self, folder: &str) -> Result<u32, SessionError> {
        self.calls.push(Call::Select(folder.to_string()));
        match self.folders.get(folder) {
            Some(f) => {
                self.selected = Some(folder.to_string());
                Ok(u32::try_from(f.messages.len()).unwrap())
            }
            None => {
                self.selected = None;
                Err(SessionError::NotFound(folder.to_string()))
            }
        }
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<MessageId>, SessionError> {
        let text = criteria.to_string();
        self.calls.push(Call::Search(text.clone()));
        if self.fail_search.iter().any(|needle| text.contains(needle.as_str())) {
            return Err(SessionError::Protocol(format!("search {text} refused")));
        }
        let folder = self.selected_folder()?;
        Ok(folder
            .messages
            .iter()
            .filter(|m| is_match(m, criteria))
            .map(|m| id(m.uid))
            .collect())
    }

    async fn fetch(&mut self, uid: MessageId, peek: bool) -> Result<RawMessage, SessionError> {
        self.calls.push(Call::Fetch(uid.get(), peek));
        let folder = self.selected_folder()?;
        let message = folder
            .messages
            .iter_mut()
            .find(|m| m.uid == uid.get())
            .ok_or_else(|| SessionError::NotFound(uid.to_string()))?;
        if !peek {
            message.seen = true;
        }
        let text = format!("{}{}\r\n", header_block(message), message.body);
        Ok(RawMessage {
            id: uid,
            bytes: text.into_bytes(),
        })
    }

    async fn fetch_headers(&mut self, uid: MessageId) -> Result<RawMessage, SessionError> {
        self.calls.push(Call::FetchHeaders(uid.get()));
        let folder = self.selected_folder()?;
        let message = folder
            .messages
            .iter()
            .find(|m| m.uid == uid.get())
            .ok_or_else(|| SessionError::NotFound(uid.to_string()))?;
        Ok(RawMessage {
            id: uid,
            bytes: header_block(message).into_bytes(),
        })
    }

    async fn copy(&mut self, uid: MessageId, folder: &str) -> Result<Option<MessageId>, SessionError> {
        self.calls.push(Call::Copy(uid.get(), folder.to_string()));
        if self.fail_copy.contains(&uid.get()) {
            return Err(SessionError::Protocol(format!("copy of {uid} refused")));
        }

        let source = self.selected_folder()?;
        let message = source
            .messages
            .iter()
            .find(|m| m.uid == uid.get())
            .cloned()
            .ok_or_else(|| SessionError::NotFound(uid.to_string()))?;

        let copyuid = self.copyuid;
        let dest = self
            .folders
            .get_mut(folder)
            .ok_or_else(|| SessionError::NotFound(folder.to_string()))?;
        let new_uid = dest.next_uid;
        dest.next_uid += 1;
        dest.messages.push(FakeMessage {
            uid: new_uid,
            deleted: false,
            ..message
        });

        Ok(copyuid.then(|| id(new_uid)))
    }

    async fn set_flags(&mut self, uid: MessageId, delta: FlagDelta) -> Result<(), SessionError> {
        self.calls.push(Call::SetFlags(uid.get(), delta.clone()));
        if self.fail_undelete && delta == FlagDelta::Remove(Flag::Deleted) {
            return Err(SessionError::Protocol("store refused".into()));
        }
        let folder = self.selected_folder()?;
        let message = folder
            .messages
            .iter_mut()
            .find(|m| m.uid == uid.get())
            .ok_or_else(|| SessionError::NotFound(uid.to_string()))?;
        match delta {
            FlagDelta::Add(Flag::Deleted) => message.deleted = true,
            FlagDelta::Remove(Flag::Deleted) => message.deleted = false,
            FlagDelta::Add(Flag::Seen) => message.seen = true,
            FlagDelta::Remove(Flag::Seen) => message.seen = false,
            FlagDelta::Add(_) | FlagDelta::Remove(_) => {}
        }
        Ok(())
    }

    async fn expunge(&mut self) -> Result<(), SessionError> {
        self.calls.push(Call::Expunge);
        if self.fail_expunge > 0 {
            self.fail_expunge -= 1;
            return Err(SessionError::Protocol("expunge refused".into()));
        }
        let folder = self.selected_folder()?;
        folder.messages.retain(|m| !m.deleted);
        Ok(())
    }

    async fn list_folders(&mut self) -> Result<Vec<String>, SessionError> {
        self.calls.push(Call::ListFolders);
        if self.fail_list {
            return Err(SessionError::Connection("listing refused".into()));
        }
        Ok(self.folders.keys().cloned().collect())
    }

    async fn logout(self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Builds a rule tree from `(parent, label, predicate)` triples.
pub fn rules(entries: &[(&str, &str, LeafPredicate)]) -> RuleTree {
    let mut folders: Vec<FolderEntry> = Vec::new();
    let mut filters = HashMap::new();
    for (parent, label, predicate) in entries {
        match folders.iter_mut().find(|f| f.parent == *parent) {
            Some(entry) => entry.labels.push((*label).to_string()),
            None => folders.push(FolderEntry {
                parent: (*parent).to_string(),
                labels: vec![(*label).to_string()],
            }),
        }
        filters.insert((*label).to_string(), predicate.clone());
    }
    RuleTree::build(&folders, &filters).unwrap()
}
