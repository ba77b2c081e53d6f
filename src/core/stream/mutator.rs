use tracing::{debug, warn};

use crate::core::message::{EntryId, ToolPhase, TranscriptEntry};
use crate::core::stream::decoder::StreamEvent;
use crate::core::transcript::Transcript;

/// What a single applied event did to the transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    ToolAppended {
        id: EntryId,
        tool_name: String,
        phase: ToolPhase,
    },
    /// First content of the response overwrote the placeholder.
    PlaceholderReplaced { id: EntryId, text: String },
    ContentAppended { id: EntryId, delta: String },
    /// Session failure reported as its own assistant entry.
    ErrorAppended { id: EntryId },
    /// Content arrived with no pending entry to receive it.
    Dropped,
    /// Malformed frame; transcript untouched.
    Ignored,
    EndOfStream,
}

impl Mutation {
    pub fn changed_transcript(&self) -> bool {
        matches!(
            self,
            Mutation::ToolAppended { .. }
                | Mutation::PlaceholderReplaced { .. }
                | Mutation::ContentAppended { .. }
                | Mutation::ErrorAppended { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    MalformedFrame,
    OrphanDelta,
    DiscardedPartialFrame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub detail: String,
}

/// Applies decoded events in arrival order and collects non-fatal diagnostics.
#[derive(Debug, Default)]
pub struct TranscriptMutator {
    diagnostics: Vec<Diagnostic>,
}

impl TranscriptMutator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, transcript: &mut Transcript, event: StreamEvent) -> Mutation {
        match event {
            StreamEvent::ToolCallStart {
                tool_name,
                arguments,
            } => append_tool(transcript, tool_name, ToolPhase::Call, arguments),
            StreamEvent::ToolCallResponse {
                tool_name,
                response,
            } => append_tool(transcript, tool_name, ToolPhase::Response, response),
            StreamEvent::ContentDelta(text) => self.apply_content(transcript, text),
            StreamEvent::Malformed { raw, reason } => {
                warn!(%reason, "dropping malformed stream frame");
                self.record(DiagnosticKind::MalformedFrame, format!("{reason}: {raw}"));
                Mutation::Ignored
            }
            StreamEvent::StreamEnd => Mutation::EndOfStream,
        }
    }

    pub fn record(&mut self, kind: DiagnosticKind, detail: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            kind,
            detail: detail.into(),
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn apply_content(&mut self, transcript: &mut Transcript, text: String) -> Mutation {
        let resolved = match transcript.pending_entry_mut() {
            Some(entry) => entry.placeholder_resolved,
            None => {
                warn!("content delta arrived with no pending assistant entry");
                self.record(DiagnosticKind::OrphanDelta, text);
                return Mutation::Dropped;
            }
        };

        if resolved {
            match transcript.extend_pending(&text) {
                Some(id) => Mutation::ContentAppended { id, delta: text },
                None => Mutation::Dropped,
            }
        } else {
            match transcript.resolve_placeholder(&text) {
                Some(id) => Mutation::PlaceholderReplaced { id, text },
                None => Mutation::Dropped,
            }
        }
    }
}

fn append_tool(
    transcript: &mut Transcript,
    tool_name: String,
    phase: ToolPhase,
    payload: serde_json::Value,
) -> Mutation {
    debug!(tool = %tool_name, phase = phase.as_str(), "tool interaction");
    let id = transcript.push_entry(TranscriptEntry::tool_interaction(
        tool_name.clone(),
        phase,
        payload,
    ));
    Mutation::ToolAppended {
        id,
        tool_name,
        phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;
    use serde_json::json;

    fn pending_transcript() -> (Transcript, EntryId) {
        let mut transcript = Transcript::new();
        transcript.push_user(vec![crate::core::message::ContentPart::text("hi")]);
        let id = transcript.begin_pending("Thinking…").expect("pending");
        (transcript, id)
    }

    #[test]
    fn first_delta_replaces_placeholder_then_later_deltas_append() {
        let (mut transcript, id) = pending_transcript();
        let mut mutator = TranscriptMutator::new();

        let first = mutator.apply(&mut transcript, StreamEvent::ContentDelta("Hello".into()));
        assert_eq!(
            first,
            Mutation::PlaceholderReplaced {
                id,
                text: "Hello".into()
            }
        );
        assert!(transcript.get(id).expect("entry").placeholder_resolved);

        let second = mutator.apply(&mut transcript, StreamEvent::ContentDelta(" world".into()));
        assert_eq!(
            second,
            Mutation::ContentAppended {
                id,
                delta: " world".into()
            }
        );

        let entry = transcript.get(id).expect("entry");
        assert_eq!(entry.text_content(), "Hello world");
        assert_eq!(entry.content.len(), 1);
        assert!(entry.pending);
    }

    #[test]
    fn tool_events_do_not_disturb_pending_entry() {
        let (mut transcript, id) = pending_transcript();
        let mut mutator = TranscriptMutator::new();
        let events = [
            StreamEvent::ToolCallStart {
                tool_name: "web_search".into(),
                arguments: json!({"q": "x"}),
            },
            StreamEvent::ContentDelta("A".into()),
            StreamEvent::ToolCallResponse {
                tool_name: "web_search".into(),
                response: json!(["r"]),
            },
            StreamEvent::ContentDelta("B".into()),
        ];
        for event in events {
            mutator.apply(&mut transcript, event);
        }

        let pending: Vec<_> = transcript.entries().iter().filter(|e| e.pending).collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].text_content(), "AB");

        let tools: Vec<_> = transcript
            .entries()
            .iter()
            .filter_map(|e| e.tool_interaction.as_ref())
            .map(|tool| tool.phase)
            .collect();
        assert_eq!(tools, vec![ToolPhase::Call, ToolPhase::Response]);
        assert!(transcript
            .entries()
            .iter()
            .filter(|e| e.is_tool_interaction())
            .all(|e| e.role == Role::Assistant && !e.pending));
    }

    #[test]
    fn orphan_delta_is_dropped_with_diagnostic() {
        let mut transcript = Transcript::new();
        let mut mutator = TranscriptMutator::new();
        let version = transcript.version();

        let mutation = mutator.apply(&mut transcript, StreamEvent::ContentDelta("lost".into()));
        assert_eq!(mutation, Mutation::Dropped);
        assert_eq!(transcript.version(), version);
        assert_eq!(mutator.diagnostics()[0].kind, DiagnosticKind::OrphanDelta);
    }

    #[test]
    fn malformed_first_frame_leaves_placeholder_unresolved() {
        let (mut transcript, id) = pending_transcript();
        let mut mutator = TranscriptMutator::new();
        let version = transcript.version();

        let mutation = mutator.apply(
            &mut transcript,
            StreamEvent::Malformed {
                raw: "{\"content\":\"tru".into(),
                reason: "invalid JSON".into(),
            },
        );
        assert_eq!(mutation, Mutation::Ignored);
        assert!(!mutation.changed_transcript());
        assert_eq!(transcript.version(), version);

        let entry = transcript.get(id).expect("entry");
        assert_eq!(entry.text_content(), "Thinking…");
        assert!(!entry.placeholder_resolved);
        assert_eq!(mutator.diagnostics().len(), 1);
    }

    #[test]
    fn stream_end_does_not_mutate() {
        let (mut transcript, _) = pending_transcript();
        let mut mutator = TranscriptMutator::new();
        let version = transcript.version();
        assert_eq!(
            mutator.apply(&mut transcript, StreamEvent::StreamEnd),
            Mutation::EndOfStream
        );
        assert_eq!(transcript.version(), version);
        assert!(transcript.pending_id().is_some());
    }
}
