//! Owned conversation transcript.
//!
//! Entries are append-only. The one exception is the pending assistant entry,
//! tracked through an explicit slot rather than by scanning, which only the
//! stream mutator and session may touch. Every mutation bumps [`Transcript::version`]
//! so renderers can tell whether a snapshot is stale.

use std::error::Error;
use std::fmt;

use crate::core::message::{ContentPart, EntryId, Role, TranscriptEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    /// A pending assistant entry already exists; another request is in flight.
    PendingInFlight(EntryId),
}

impl fmt::Display for TranscriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptError::PendingInFlight(id) => write!(
                f,
                "a response is already streaming into entry {}",
                id.0
            ),
        }
    }
}

impl Error for TranscriptError {}

/// Point-in-time copy handed to renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSnapshot {
    pub version: u64,
    pub entries: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    pending: Option<EntryId>,
    next_id: u64,
    version: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn get(&self, id: EntryId) -> Option<&TranscriptEntry> {
        self.index_of(id).map(|index| &self.entries[index])
    }

    pub fn pending_id(&self) -> Option<EntryId> {
        self.pending
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            version: self.version,
            entries: self.entries.clone(),
        }
    }

    /// Append a finished entry. Any `pending` flag on the input is ignored;
    /// only [`Transcript::begin_pending`] creates pending entries.
    pub fn push_entry(&mut self, mut entry: TranscriptEntry) -> EntryId {
        entry.pending = false;
        self.append(entry)
    }

    pub fn push_user(&mut self, content: Vec<ContentPart>) -> EntryId {
        self.push_entry(TranscriptEntry::new(Role::User, content))
    }

    pub fn push_system(&mut self, text: impl Into<String>) -> EntryId {
        self.push_entry(TranscriptEntry::system(text))
    }

    /// Append the assistant placeholder that the next response streams into.
    pub fn begin_pending(&mut self, placeholder: &str) -> Result<EntryId, TranscriptError> {
        if let Some(existing) = self.pending {
            return Err(TranscriptError::PendingInFlight(existing));
        }

        let mut entry = TranscriptEntry::assistant(placeholder);
        entry.pending = true;
        let id = self.append(entry);
        self.pending = Some(id);
        Ok(id)
    }

    /// Messages to send upstream: settled, non-tool entries with content.
    pub fn api_messages(&self) -> Vec<TranscriptEntry> {
        self.entries
            .iter()
            .filter(|entry| !entry.pending && !entry.is_tool_interaction())
            .filter(|entry| !entry.content.is_empty())
            .cloned()
            .collect()
    }

    pub(crate) fn pending_entry_mut(&mut self) -> Option<&mut TranscriptEntry> {
        let id = self.pending?;
        let index = self.index_of(id)?;
        let entry = &mut self.entries[index];
        if entry.pending && entry.role.is_assistant() && !entry.is_tool_interaction() {
            Some(entry)
        } else {
            None
        }
    }

    /// Overwrite the placeholder with the first real text.
    pub(crate) fn resolve_placeholder(&mut self, text: &str) -> Option<EntryId> {
        let entry = self.pending_entry_mut()?;
        match entry.content.first_mut() {
            Some(part) => *part = ContentPart::text(text),
            None => entry.content.push(ContentPart::text(text)),
        }
        entry.placeholder_resolved = true;
        let id = entry.id;
        self.touch();
        Some(id)
    }

    pub(crate) fn extend_pending(&mut self, text: &str) -> Option<EntryId> {
        let entry = self.pending_entry_mut()?;
        match entry.content.first_mut() {
            Some(ContentPart::Text(existing)) => existing.push_str(text),
            Some(part) => *part = ContentPart::text(text),
            None => entry.content.push(ContentPart::text(text)),
        }
        let id = entry.id;
        self.touch();
        Some(id)
    }

    /// Drop the pending flag without touching content. Returns the entry that
    /// was pending, or `None` when nothing was.
    pub(crate) fn clear_pending(&mut self) -> Option<EntryId> {
        let id = self.pending.take()?;
        if let Some(index) = self.index_of(id) {
            self.entries[index].pending = false;
        }
        self.touch();
        Some(id)
    }

    fn append(&mut self, mut entry: TranscriptEntry) -> EntryId {
        self.next_id += 1;
        let id = EntryId(self.next_id);
        entry.id = id;
        self.entries.push(entry);
        self.touch();
        id
    }

    fn index_of(&self, id: EntryId) -> Option<usize> {
        // Ids are assigned in increasing order, so the entries stay sorted by id.
        self.entries
            .binary_search_by_key(&id, |entry| entry.id)
            .ok()
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::ToolPhase;
    use serde_json::json;

    #[test]
    fn begin_pending_rejects_second_request() {
        let mut transcript = Transcript::new();
        let first = transcript.begin_pending("…").expect("first pending");
        let err = transcript.begin_pending("…").expect_err("second pending");
        assert_eq!(err, TranscriptError::PendingInFlight(first));

        transcript.clear_pending();
        assert!(transcript.begin_pending("…").is_ok());
    }

    #[test]
    fn push_entry_never_creates_pending() {
        let mut transcript = Transcript::new();
        let mut entry = TranscriptEntry::assistant("done");
        entry.pending = true;
        let id = transcript.push_entry(entry);
        assert!(!transcript.get(id).expect("entry").pending);
        assert_eq!(transcript.pending_id(), None);
    }

    #[test]
    fn every_mutation_bumps_version() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.version(), 0);
        transcript.push_user(vec![ContentPart::text("hi")]);
        let after_push = transcript.version();
        transcript.begin_pending("…").expect("pending");
        transcript.resolve_placeholder("Hello");
        transcript.extend_pending(" world");
        transcript.clear_pending();
        assert_eq!(transcript.version(), after_push + 4);
    }

    #[test]
    fn clear_pending_is_noop_without_pending_entry() {
        let mut transcript = Transcript::new();
        let version = transcript.version();
        assert_eq!(transcript.clear_pending(), None);
        assert_eq!(transcript.version(), version);
    }

    #[test]
    fn api_messages_skip_pending_and_tool_entries() {
        let mut transcript = Transcript::new();
        transcript.push_system("be brief");
        transcript.push_user(vec![ContentPart::text("hi")]);
        transcript.push_entry(TranscriptEntry::tool_interaction(
            "web_search",
            ToolPhase::Call,
            json!({}),
        ));
        transcript.begin_pending("…").expect("pending");

        let roles: Vec<Role> = transcript
            .api_messages()
            .iter()
            .map(|entry| entry.role)
            .collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
    }

    #[test]
    fn snapshot_is_detached_from_later_mutations() {
        let mut transcript = Transcript::new();
        transcript.begin_pending("…").expect("pending");
        let snapshot = transcript.snapshot();
        transcript.resolve_placeholder("Hi");

        assert_eq!(snapshot.entries[0].text_content(), "…");
        assert_eq!(transcript.entries()[0].text_content(), "Hi");
        assert!(snapshot.version < transcript.version());
    }
}
