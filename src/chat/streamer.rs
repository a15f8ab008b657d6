//! Answer streaming.
//!
//! Drives one generation stream to completion: every increment goes through
//! the citation rewriter, resolved text is forwarded to the caller and
//! accumulated for persistence. The resolved form is what gets persisted, so
//! citations stay meaningful when the history is replayed later.
//!
//! Phases: `Generating` while increments arrive, `Draining` once the source
//! ends, then `Done`; a generation error is terminal (`Failed`). A caller
//! that stops listening mid-stream turns the exchange into a cancellation:
//! forwarding stops, dropping the source receiver aborts the producer, and
//! whatever text accumulated is kept for the session save.

use tokio::sync::mpsc;

use super::citations::CitationRewriter;
use crate::core::errors::ApiError;
use crate::rag::RetrievedContext;

/// Events emitted to the caller. `Done` is the explicit end-of-stream
/// sentinel; nothing follows `Done` or `Error`.
#[derive(Debug)]
pub enum AnswerEvent {
    Delta(String),
    Done,
    Error(ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Generating,
    Draining,
    Done,
    Failed,
}

/// How an exchange ended, and the resolved answer text accumulated so far.
#[derive(Debug)]
pub struct StreamOutcome {
    pub answer: String,
    pub failed: bool,
    pub cancelled: bool,
}

pub struct AnswerStreamer {
    context: RetrievedContext,
    rewriter: CitationRewriter,
    answer: String,
}

impl AnswerStreamer {
    pub fn new(context: RetrievedContext) -> Self {
        Self {
            context,
            rewriter: CitationRewriter::new(),
            answer: String::new(),
        }
    }

    pub async fn run(
        mut self,
        mut source: mpsc::Receiver<Result<String, ApiError>>,
        events: mpsc::Sender<AnswerEvent>,
    ) -> StreamOutcome {
        let mut phase = Phase::Generating;
        tracing::debug!(?phase, context = self.context.len(), "answer stream started");
        let mut cancelled = false;

        while let Some(item) = source.recv().await {
            match item {
                Ok(increment) => {
                    if increment.is_empty() {
                        continue;
                    }
                    let resolved = self.rewriter.push(&increment, &self.context);
                    if resolved.is_empty() {
                        continue;
                    }
                    self.answer.push_str(&resolved);
                    if !cancelled && events.send(AnswerEvent::Delta(resolved)).await.is_err() {
                        cancelled = true;
                        break;
                    }
                }
                Err(err) => {
                    phase = Phase::Failed;
                    tracing::warn!(?phase, kind = err.kind(), %err, "generation stream failed");
                    let _ = events.send(AnswerEvent::Error(err)).await;
                    return StreamOutcome {
                        answer: self.answer,
                        failed: true,
                        cancelled: false,
                    };
                }
            }
        }

        // Dropping `source` past this point aborts the producer if the loop
        // exited early.
        phase = Phase::Draining;
        tracing::debug!(?phase, "generation source exhausted");
        let remainder = self.rewriter.finish(&self.context);
        if !remainder.is_empty() {
            self.answer.push_str(&remainder);
            if !cancelled && events.send(AnswerEvent::Delta(remainder)).await.is_err() {
                cancelled = true;
            }
        }

        if !cancelled && events.send(AnswerEvent::Done).await.is_err() {
            cancelled = true;
        }

        phase = Phase::Done;
        tracing::debug!(?phase, cancelled, chars = self.answer.len(), "answer stream finished");

        StreamOutcome {
            answer: self.answer,
            failed: false,
            cancelled,
        }
    }
}
