//! Streaming response ingestion: bytes → lines → events → transcript mutations.
//!
//! [`FrameSplitter`] reassembles lines across chunk boundaries, [`EventDecoder`]
//! classifies `data: ` frames, [`TranscriptMutator`] applies each event to the
//! transcript, and [`StreamSession`] drives one request end to end and settles
//! the pending entry on every exit path.

pub mod decoder;
pub mod mutator;
pub mod session;
pub mod source;
pub mod splitter;

pub use decoder::{DecoderOptions, EventDecoder, StreamEvent};
pub use mutator::{Diagnostic, DiagnosticKind, Mutation, TranscriptMutator};
pub use session::{
    SessionError, SessionOptions, SessionOutcome, SessionReport, SessionState, StreamNotice,
    StreamSession,
};
pub use source::{ByteSource, ChatRequest, ChatTransport, TransportError};
pub use splitter::FrameSplitter;
