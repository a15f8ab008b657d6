//! The question-answering pipeline: prompt assembly, citation rewriting and
//! streaming orchestration.

pub mod citations;
pub mod prompt;
pub mod service;
pub mod streamer;

pub use citations::{resolve_citations, CitationRewriter};
pub use prompt::PromptLimits;
pub use service::ChatService;
pub use streamer::AnswerEvent;
