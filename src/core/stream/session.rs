use std::error::Error;
use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::message::{EntryId, TranscriptEntry};
use crate::core::stream::decoder::{DecoderOptions, EventDecoder, StreamEvent};
use crate::core::stream::mutator::{Diagnostic, DiagnosticKind, Mutation, TranscriptMutator};
use crate::core::stream::source::{ByteSource, ChatRequest, ChatTransport, TransportError};
use crate::core::stream::splitter::FrameSplitter;
use crate::core::transcript::{Transcript, TranscriptError};

pub const DEFAULT_PLACEHOLDER: &str = "…";
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Streaming,
    Finalizing,
    Failed,
    Closed,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Text the pending entry shows until the first content arrives.
    pub placeholder: String,
    /// Longest wait for the response to open or for the next chunk.
    pub idle_timeout: Duration,
    pub decoder: DecoderOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            decoder: DecoderOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

impl SessionOutcome {
    /// User-facing message for the completion notification, if any.
    pub fn notice(&self) -> Option<&str> {
        match self {
            SessionOutcome::Completed => None,
            SessionOutcome::Cancelled => Some("Response cancelled"),
            SessionOutcome::Failed(message) => Some(message),
        }
    }
}

/// Change notifications for live renderers.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamNotice {
    PendingOpened { id: EntryId },
    Mutated { version: u64, mutation: Mutation },
    PendingCleared { id: EntryId },
    /// Sent exactly once per session.
    Finished { outcome: SessionOutcome },
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub pending_entry: EntryId,
    /// Every state the session passed through, `Idle` first, `Closed` last.
    pub states: Vec<SessionState>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Transcript(TranscriptError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Transcript(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Transcript(err) => Some(err),
        }
    }
}

impl From<TranscriptError> for SessionError {
    fn from(err: TranscriptError) -> Self {
        SessionError::Transcript(err)
    }
}

enum RunEnd {
    Completed,
    Cancelled,
}

/// Owns the transcript borrow and clears the pending entry if the session is
/// dropped before it finalizes, e.g. when the `submit` future is aborted.
struct FinalizeGuard<'t> {
    transcript: &'t mut Transcript,
    notices: Option<mpsc::UnboundedSender<StreamNotice>>,
    armed: bool,
}

impl FinalizeGuard<'_> {
    fn notify(&self, notice: StreamNotice) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice);
        }
    }

    fn clear_pending(&mut self) {
        self.armed = false;
        if let Some(id) = self.transcript.clear_pending() {
            self.notify(StreamNotice::PendingCleared { id });
        }
    }
}

impl Drop for FinalizeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("stream session dropped mid-flight; clearing pending entry");
            self.clear_pending();
            self.notify(StreamNotice::Finished {
                outcome: SessionOutcome::Cancelled,
            });
        }
    }
}

/// Drives one request from submission to a settled transcript.
///
/// `submit` consumes the session, so a finished session cannot be reused and
/// the exclusive transcript borrow rules out a second concurrent session.
pub struct StreamSession<'t> {
    guard: FinalizeGuard<'t>,
    options: SessionOptions,
    splitter: FrameSplitter,
    decoder: EventDecoder,
    mutator: TranscriptMutator,
    states: Vec<SessionState>,
}

impl<'t> StreamSession<'t> {
    pub fn new(transcript: &'t mut Transcript, options: SessionOptions) -> Self {
        let decoder = EventDecoder::new(options.decoder.clone());
        Self {
            guard: FinalizeGuard {
                transcript,
                notices: None,
                armed: false,
            },
            options,
            splitter: FrameSplitter::new(),
            decoder,
            mutator: TranscriptMutator::new(),
            states: vec![SessionState::Idle],
        }
    }

    pub fn with_notices(mut self, tx: mpsc::UnboundedSender<StreamNotice>) -> Self {
        self.guard.notices = Some(tx);
        self
    }

    pub async fn submit<T>(
        mut self,
        transport: &T,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<SessionReport, SessionError>
    where
        T: ChatTransport + ?Sized,
    {
        let pending_entry = self
            .guard
            .transcript
            .begin_pending(&self.options.placeholder)?;
        self.guard.armed = true;
        self.guard
            .notify(StreamNotice::PendingOpened { id: pending_entry });
        self.enter(SessionState::Requesting);

        let outcome = match self.run(transport, &request, &cancel).await {
            Ok(RunEnd::Completed) => {
                self.enter(SessionState::Finalizing);
                self.guard.clear_pending();
                SessionOutcome::Completed
            }
            Ok(RunEnd::Cancelled) => {
                debug!("stream cancelled");
                self.enter(SessionState::Finalizing);
                self.guard.clear_pending();
                SessionOutcome::Cancelled
            }
            Err(err) => {
                warn!(error = %err, "stream failed");
                self.enter(SessionState::Failed);
                let message = err.to_string();
                self.fail(&message);
                SessionOutcome::Failed(message)
            }
        };

        self.enter(SessionState::Closed);
        self.guard.notify(StreamNotice::Finished {
            outcome: outcome.clone(),
        });

        Ok(SessionReport {
            outcome,
            pending_entry,
            states: std::mem::take(&mut self.states),
            diagnostics: std::mem::take(&mut self.mutator).into_diagnostics(),
        })
    }

    async fn run<T>(
        &mut self,
        transport: &T,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<RunEnd, TransportError>
    where
        T: ChatTransport + ?Sized,
    {
        let idle = self.options.idle_timeout;

        let mut source: Box<dyn ByteSource> = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(RunEnd::Cancelled),
            opened = timeout(idle, transport.open(request)) => match opened {
                Ok(result) => result?,
                Err(_) => return Err(TransportError::Timeout(idle)),
            },
        };

        self.enter(SessionState::Streaming);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(RunEnd::Cancelled),
                next = timeout(idle, source.next_chunk()) => next,
            };

            let chunk = match next {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(err))) => return Err(err),
                Ok(None) => break,
                Err(_) => return Err(TransportError::Timeout(idle)),
            };

            for line in self.splitter.push(&chunk) {
                self.ingest_line(&line);
            }
        }

        if let Some(discarded) = self.splitter.finish() {
            debug!(bytes = discarded, "discarding unterminated frame at end of stream");
            self.mutator.record(
                DiagnosticKind::DiscardedPartialFrame,
                format!("{discarded} bytes without a terminating newline"),
            );
        }
        self.apply(StreamEvent::StreamEnd);
        Ok(RunEnd::Completed)
    }

    fn ingest_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if let Some(event) = self.decoder.decode(line) {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: StreamEvent) {
        let mutation = self.mutator.apply(self.guard.transcript, event);
        if mutation.changed_transcript() {
            let version = self.guard.transcript.version();
            self.guard.notify(StreamNotice::Mutated { version, mutation });
        }
    }

    /// Settle the pending entry, then report the failure as its own entry so
    /// the pending slot is never shadowed by a newer assistant entry.
    fn fail(&mut self, message: &str) {
        self.guard.clear_pending();
        let id = self
            .guard
            .transcript
            .push_entry(TranscriptEntry::assistant(message));
        let version = self.guard.transcript.version();
        self.guard.notify(StreamNotice::Mutated {
            version,
            mutation: Mutation::ErrorAppended { id },
        });
    }

    fn enter(&mut self, state: SessionState) {
        debug!(?state, "stream session state");
        self.states.push(state);
    }
}
