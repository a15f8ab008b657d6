//! Word-window chunker for article indexing.
//!
//! Articles are split on whitespace and re-joined into overlapping windows of
//! `window_size` words, each window starting `window_size - overlap` words
//! after the previous one. The overlap keeps sentence context intact across
//! chunk boundaries so retrieval does not lose answers that straddle a cut.

/// Window size and overlap, both in words.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    pub window_size: usize,
    pub overlap: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            window_size: 300,
            overlap: 50,
        }
    }
}

/// Split `text` into overlapping word windows.
///
/// Windows are contiguous word spans in source order; the last window may be
/// shorter than `window_size`. Empty or whitespace-only text yields no
/// chunks; anything shorter than one window yields exactly one. A trailing
/// window that would contain only words already covered by the previous one
/// is not emitted. An overlap at or above the window size is clamped so the
/// step stays positive.
pub fn chunk_words(text: &str, policy: ChunkPolicy) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let window = policy.window_size.max(1);
    let step = window.saturating_sub(policy.overlap).max(1);
    let overlap = window - step;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start == 0 || start < words.len().saturating_sub(overlap) {
        let end = (start + window).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += step;
    }

    chunks
}
