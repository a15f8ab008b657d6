pub mod extract;
pub mod feed;
pub mod service;

pub use service::{FeedSummary, IngestService};
