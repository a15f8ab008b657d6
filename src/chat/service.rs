//! Chat orchestration.
//!
//! One `ask` runs a single exchange: validate, serialize on the session key,
//! load history, retrieve context, assemble the prompt, then stream the
//! answer back through [`AnswerStreamer`] and persist the updated history.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::sync::OwnedMutexGuard;

use super::prompt::{self, PromptLimits};
use super::streamer::{AnswerEvent, AnswerStreamer};
use crate::core::config::RetrievalFailurePolicy;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::rag::{RetrievedContext, Retriever};
use crate::session::{ConversationTurn, SessionStore};

/// Keyed mutual exclusion: at most one in-flight exchange per session key,
/// so concurrent saves cannot silently drop each other.
#[derive(Default)]
pub struct SessionLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Clone)]
pub struct ChatService {
    llm: Arc<dyn LlmProvider>,
    retriever: Retriever,
    sessions: SessionStore,
    locks: Arc<SessionLocks>,
    model: String,
    limits: PromptLimits,
    retrieval_failure: RetrievalFailurePolicy,
}

impl ChatService {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        retriever: Retriever,
        sessions: SessionStore,
        model: String,
        limits: PromptLimits,
        retrieval_failure: RetrievalFailurePolicy,
    ) -> Self {
        Self {
            llm,
            retriever,
            sessions,
            locks: Arc::new(SessionLocks::new()),
            model,
            limits,
            retrieval_failure,
        }
    }

    /// Start one exchange. Input validation fails synchronously; everything
    /// after that is reported through the returned event stream.
    pub async fn ask(
        &self,
        session_key: &str,
        question: &str,
    ) -> Result<mpsc::Receiver<AnswerEvent>, ApiError> {
        let session_key = session_key.trim().to_string();
        if session_key.is_empty() {
            return Err(ApiError::InvalidInput("session key is required".into()));
        }
        let question = question.trim().to_string();
        if question.is_empty() {
            return Err(ApiError::InvalidInput("question is required".into()));
        }

        let (events, rx) = mpsc::channel(32);
        let service = self.clone();
        tokio::spawn(async move {
            service.run_exchange(session_key, question, events).await;
        });

        Ok(rx)
    }

    async fn run_exchange(
        &self,
        session_key: String,
        question: String,
        events: mpsc::Sender<AnswerEvent>,
    ) {
        let _guard = self.locks.acquire(&session_key).await;

        let mut history = match self.sessions.load(&session_key).await {
            Ok(history) => history,
            Err(err) => {
                tracing::error!(kind = err.kind(), %err, "failed to load session history");
                let _ = events.send(AnswerEvent::Error(err)).await;
                return;
            }
        };

        let context = match self.retriever.retrieve(&question).await {
            Ok(context) => context,
            Err(err) => match self.retrieval_failure {
                RetrievalFailurePolicy::EmptyContext => {
                    tracing::warn!(%err, "retrieval failed, answering without context");
                    RetrievedContext::empty()
                }
                RetrievalFailurePolicy::Abort => {
                    let _ = events.send(AnswerEvent::Error(err)).await;
                    return;
                }
            },
        };

        let prompt = prompt::assemble(&history, &question, &context, self.limits);
        history.push(ConversationTurn::user(&question));

        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]);
        let source = match self.llm.stream_chat(request, &self.model).await {
            Ok(source) => source,
            Err(err) => {
                let _ = events.send(AnswerEvent::Error(err)).await;
                // record the question even though no answer was produced
                self.persist(&session_key, &history).await;
                return;
            }
        };

        let outcome = AnswerStreamer::new(context).run(source, events).await;

        if outcome.failed {
            // keep the user turn, never a partial assistant turn
            self.persist(&session_key, &history).await;
            return;
        }

        if !outcome.answer.is_empty() {
            history.push(ConversationTurn::assistant(outcome.answer));
        }
        self.persist(&session_key, &history).await;
    }

    /// Save errors are reported, not propagated: the answer already reached
    /// the caller.
    async fn persist(&self, session_key: &str, history: &[ConversationTurn]) {
        if let Err(err) = self.sessions.save(session_key, history).await {
            tracing::error!(
                kind = err.kind(),
                %err,
                "session save failed; delivered answer is not rolled back"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::rag::store::{DocumentChunk, ScoredChunk, VectorIndex};
    use crate::session::{MemoryKvStore, Role};

    struct FakeLlm {
        increments: Vec<String>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl LlmProvider for FakeLlm {
        fn name(&self) -> &str {
            "fake"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn stream_chat(
            &self,
            _request: ChatRequest,
            _model_id: &str,
        ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
            let (tx, rx) = mpsc::channel(8);
            let increments = self.increments.clone();
            let fail_after = self.fail_after;
            tokio::spawn(async move {
                for (i, increment) in increments.into_iter().enumerate() {
                    if fail_after == Some(i) {
                        let _ = tx.send(Err(ApiError::Generation("backend died".into()))).await;
                        return;
                    }
                    if tx.send(Ok(increment)).await.is_err() {
                        return;
                    }
                }
            });
            Ok(rx)
        }

        async fn embed(
            &self,
            inputs: &[String],
            _model_id: &str,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(vec![vec![0.0]; inputs.len()])
        }
    }

    struct FakeIndex {
        hits: Vec<ScoredChunk>,
        fail: bool,
    }

    #[async_trait]
    impl VectorIndex for FakeIndex {
        async fn add_documents(&self, _chunks: Vec<DocumentChunk>) -> Result<(), ApiError> {
            Ok(())
        }

        async fn search(&self, _query: &str, k: usize) -> Result<Vec<ScoredChunk>, ApiError> {
            if self.fail {
                return Err(ApiError::Retrieval("index unreachable".into()));
            }
            Ok(self.hits.iter().take(k).cloned().collect())
        }
    }

    fn election_hits() -> Vec<ScoredChunk> {
        vec![
            ScoredChunk {
                chunk: DocumentChunk {
                    text: "The incumbent conceded at dawn.".into(),
                    title: "Election wrap".into(),
                    url: "https://news.example/wrap".into(),
                    chunk_index: 0,
                },
                score: 0.92,
            },
            ScoredChunk {
                chunk: DocumentChunk {
                    text: "Turnout hit a record.".into(),
                    title: "Turnout".into(),
                    url: "https://news.example/turnout".into(),
                    chunk_index: 1,
                },
                score: 0.81,
            },
        ]
    }

    fn service(
        increments: Vec<&str>,
        fail_after: Option<usize>,
        index: FakeIndex,
        policy: RetrievalFailurePolicy,
    ) -> (ChatService, SessionStore) {
        let sessions = SessionStore::new(Arc::new(MemoryKvStore::new()));
        let llm = Arc::new(FakeLlm {
            increments: increments.into_iter().map(str::to_string).collect(),
            fail_after,
        });
        let retriever = Retriever::new(Arc::new(index), 4);
        let chat = ChatService::new(
            llm,
            retriever,
            sessions.clone(),
            "test-model".into(),
            PromptLimits::default(),
            policy,
        );
        (chat, sessions)
    }

    async fn drain(mut rx: mpsc::Receiver<AnswerEvent>) -> (String, bool, Option<String>) {
        let mut text = String::new();
        let mut done = false;
        let mut error_kind = None;
        while let Some(event) = rx.recv().await {
            match event {
                AnswerEvent::Delta(delta) => text.push_str(&delta),
                AnswerEvent::Done => done = true,
                AnswerEvent::Error(err) => error_kind = Some(err.kind().to_string()),
            }
        }
        (text, done, error_kind)
    }

    async fn wait_for_history(
        sessions: &SessionStore,
        key: &str,
        turns: usize,
    ) -> Vec<ConversationTurn> {
        for _ in 0..100 {
            let history = sessions.load(key).await.unwrap();
            if history.len() >= turns {
                return history;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        sessions.load(key).await.unwrap()
    }

    #[tokio::test]
    async fn empty_question_and_key_are_rejected_before_any_call() {
        let (chat, _) = service(
            vec![],
            None,
            FakeIndex {
                hits: vec![],
                fail: false,
            },
            RetrievalFailurePolicy::EmptyContext,
        );

        let err = chat.ask("user-1", "   ").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        let err = chat.ask("", "What happened?").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[tokio::test]
    async fn election_question_streams_resolved_citation_and_persists_it() {
        let (chat, sessions) = service(
            vec!["The incumbent ", "conceded; final ", "result [Source ", "1]."],
            None,
            FakeIndex {
                hits: election_hits(),
                fail: false,
            },
            RetrievalFailurePolicy::EmptyContext,
        );

        let rx = chat
            .ask("user-1", "What happened in the election?")
            .await
            .unwrap();
        let (text, done, error_kind) = drain(rx).await;

        assert!(done);
        assert_eq!(error_kind, None);
        assert_eq!(
            text,
            "The incumbent conceded; final result [Source https://news.example/wrap]."
        );

        let history = wait_for_history(&sessions, "user-1", 2).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "What happened in the election?");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, text);
    }

    #[tokio::test]
    async fn generation_failure_saves_only_the_user_turn() {
        let (chat, sessions) = service(
            vec!["partial "],
            Some(1),
            FakeIndex {
                hits: election_hits(),
                fail: false,
            },
            RetrievalFailurePolicy::EmptyContext,
        );

        let rx = chat.ask("user-2", "What happened?").await.unwrap();
        let (text, done, error_kind) = drain(rx).await;

        assert_eq!(text, "partial ");
        assert!(!done);
        assert_eq!(error_kind.as_deref(), Some("generation"));

        let history = wait_for_history(&sessions, "user-2", 1).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn retrieval_failure_with_empty_policy_still_answers() {
        let (chat, _) = service(
            vec!["No sources available."],
            None,
            FakeIndex {
                hits: vec![],
                fail: true,
            },
            RetrievalFailurePolicy::EmptyContext,
        );

        let rx = chat.ask("user-3", "Anything?").await.unwrap();
        let (text, done, error_kind) = drain(rx).await;
        assert_eq!(text, "No sources available.");
        assert!(done);
        assert_eq!(error_kind, None);
    }

    #[tokio::test]
    async fn retrieval_failure_with_abort_policy_fails_the_exchange() {
        let (chat, sessions) = service(
            vec!["never sent"],
            None,
            FakeIndex {
                hits: vec![],
                fail: true,
            },
            RetrievalFailurePolicy::Abort,
        );

        let rx = chat.ask("user-4", "Anything?").await.unwrap();
        let (text, done, error_kind) = drain(rx).await;
        assert!(text.is_empty());
        assert!(!done);
        assert_eq!(error_kind.as_deref(), Some("retrieval"));
        assert!(sessions.load("user-4").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_citation_is_forwarded_unchanged() {
        let (chat, _) = service(
            vec!["See [Source 9]."],
            None,
            FakeIndex {
                hits: election_hits(),
                fail: false,
            },
            RetrievalFailurePolicy::EmptyContext,
        );

        let rx = chat.ask("user-5", "What happened?").await.unwrap();
        let (text, _, _) = drain(rx).await;
        assert_eq!(text, "See [Source 9].");
    }

    #[tokio::test]
    async fn caller_hang_up_persists_accumulated_text() {
        let (chat, sessions) = service(
            vec!["first chunk ", "second chunk"],
            None,
            FakeIndex {
                hits: election_hits(),
                fail: false,
            },
            RetrievalFailurePolicy::EmptyContext,
        );

        let mut rx = chat.ask("user-6", "What happened?").await.unwrap();
        // read one delta, then hang up
        let first = rx.recv().await;
        assert!(matches!(first, Some(AnswerEvent::Delta(_))));
        drop(rx);

        let history = wait_for_history(&sessions, "user-6", 2).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
        assert!(history[1].content.starts_with("first chunk "));
    }
}
