//! Prompt assembly.
//!
//! A pure function of history, question and retrieved context, so the exact
//! prompt a given exchange produces can be asserted in tests without any
//! backend running.

use crate::rag::RetrievedContext;
use crate::session::{ConversationTurn, Role};

/// History is bounded here, not in the store: the newest `max_history_turns`
/// turns are included, oldest evicted first.
#[derive(Debug, Clone, Copy)]
pub struct PromptLimits {
    pub max_history_turns: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            max_history_turns: 12,
        }
    }
}

const INSTRUCTIONS: &str = "You are a news assistant. Answer the question using only the \
numbered context articles below. Cite every claim with the matching context number, written \
as [Source N]; cite several articles as [Source N, M]. If the context does not contain the \
answer, say so.";

pub fn assemble(
    history: &[ConversationTurn],
    question: &str,
    context: &RetrievedContext,
    limits: PromptLimits,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\n");

    if context.is_empty() {
        prompt.push_str("Context: no relevant articles were found.\n\n");
    } else {
        prompt.push_str("Context:\n");
        for (rank, hit) in context.ranked() {
            prompt.push_str(&format!(
                "[{rank}] {} ({})\n{}\n\n",
                hit.chunk.title, hit.chunk.url, hit.chunk.text
            ));
        }
    }

    let recent = bounded(history, limits.max_history_turns);
    if !recent.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in recent {
            let role = match turn.role {
                Role::User => "USER",
                Role::Assistant => "ASSISTANT",
            };
            prompt.push_str(&format!("{role}: {}\n", turn.content));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Question: {question}\n"));
    prompt
}

fn bounded(history: &[ConversationTurn], max_turns: usize) -> &[ConversationTurn] {
    let skip = history.len().saturating_sub(max_turns);
    &history[skip..]
}
