//! Inline citation rewriting.
//!
//! The generator is instructed to cite context positions as `[Source 2]` or
//! `[Source 1, 3]`. Before text reaches the caller those markers are
//! rewritten to `[Source <url>]` per referenced position, space-joined. A
//! marker that resolves to nothing (position out of range, empty context,
//! no parseable numbers) is left exactly as generated.
//!
//! Streaming makes this subtle: an increment boundary can fall inside a
//! marker ("…result [Sou" / "rce 1]."). [`CitationRewriter`] therefore holds
//! back the trailing portion of the text while it still looks like the start
//! of a marker, and releases it once the terminator arrives or the text
//! stops being a possible marker.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::rag::RetrievedContext;

fn citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[Source ([0-9,\s]+)\]").expect("citation pattern compiles"))
}

/// Rewrite every complete citation marker in `text`.
pub fn resolve_citations(text: &str, context: &RetrievedContext) -> String {
    citation_re()
        .replace_all(text, |caps: &Captures<'_>| {
            let links: Vec<String> = caps[1]
                .split(',')
                .filter_map(|num| num.trim().parse::<usize>().ok())
                .filter_map(|rank| context.url_for(rank))
                .map(|url| format!("[Source {url}]"))
                .collect();

            if links.is_empty() {
                caps[0].to_string()
            } else {
                links.join(" ")
            }
        })
        .into_owned()
}

/// Incremental resolver for streamed fragments.
///
/// `push` returns the resolved text that is safe to emit so far; `finish`
/// flushes whatever is still buffered. Concatenating all outputs equals
/// resolving the whole answer in one call, regardless of where the fragment
/// boundaries fell.
#[derive(Debug, Default)]
pub struct CitationRewriter {
    carry: String,
}

impl CitationRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str, context: &RetrievedContext) -> String {
        self.carry.push_str(fragment);

        match unterminated_marker_start(&self.carry) {
            Some(start) => {
                let tail = self.carry.split_off(start);
                let head = std::mem::replace(&mut self.carry, tail);
                resolve_citations(&head, context)
            }
            None => resolve_citations(&std::mem::take(&mut self.carry), context),
        }
    }

    pub fn finish(&mut self, context: &RetrievedContext) -> String {
        resolve_citations(&std::mem::take(&mut self.carry), context)
    }
}

/// Byte offset of a trailing, still-open marker candidate, if any.
///
/// Only the last `[` can open one: marker bodies never contain `[` or `]`,
/// so anything before it is already decidable.
fn unterminated_marker_start(text: &str) -> Option<usize> {
    let start = text.rfind('[')?;
    let tail = &text[start..];
    if tail.contains(']') {
        return None;
    }
    is_marker_prefix(tail).then_some(start)
}

fn is_marker_prefix(tail: &str) -> bool {
    const HEAD: &[u8] = b"[Source ";
    tail.bytes().enumerate().all(|(i, byte)| {
        if i < HEAD.len() {
            byte == HEAD[i]
        } else {
            byte.is_ascii_digit() || byte == b',' || byte.is_ascii_whitespace()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::{DocumentChunk, ScoredChunk};

    fn context(urls: &[&str]) -> RetrievedContext {
        RetrievedContext::from_hits(
            urls.iter()
                .enumerate()
                .map(|(i, url)| ScoredChunk {
                    chunk: DocumentChunk {
                        text: format!("chunk {i}"),
                        title: format!("title {i}"),
                        url: url.to_string(),
                        chunk_index: i,
                    },
                    score: 1.0 - i as f32 * 0.1,
                })
                .collect(),
        )
    }

    #[test]
    fn single_marker_resolves_to_url() {
        let ctx = context(&["https://a/1", "https://a/2"]);
        assert_eq!(
            resolve_citations("The result stood [Source 1].", &ctx),
            "The result stood [Source https://a/1]."
        );
    }

    #[test]
    fn multi_position_marker_joins_urls_in_listed_order() {
        let ctx = context(&["https://a/1", "https://a/2", "https://a/3"]);
        assert_eq!(
            resolve_citations("Reported widely [Source 1, 3].", &ctx),
            "Reported widely [Source https://a/1] [Source https://a/3]."
        );
        assert_eq!(
            resolve_citations("[Source 3,1]", &ctx),
            "[Source https://a/3] [Source https://a/1]"
        );
    }

    #[test]
    fn out_of_range_positions_are_dropped_from_mixed_markers() {
        let ctx = context(&["https://a/1"]);
        assert_eq!(
            resolve_citations("See [Source 1, 4].", &ctx),
            "See [Source https://a/1]."
        );
    }

    #[test]
    fn unresolvable_markers_are_left_unchanged() {
        let ctx = context(&["https://a/1"]);
        assert_eq!(resolve_citations("See [Source 7].", &ctx), "See [Source 7].");
        assert_eq!(
            resolve_citations("See [Source 1].", &RetrievedContext::empty()),
            "See [Source 1]."
        );
        // commas and spaces but no digits
        assert_eq!(resolve_citations("[Source , ]", &ctx), "[Source , ]");
    }

    #[test]
    fn non_marker_brackets_pass_through() {
        let ctx = context(&["https://a/1"]);
        assert_eq!(
            resolve_citations("array[0] and [sic] stay", &ctx),
            "array[0] and [sic] stay"
        );
    }

    #[test]
    fn marker_split_across_fragments_is_buffered() {
        let ctx = context(&["https://a/1", "https://a/2"]);
        let mut rewriter = CitationRewriter::new();

        let mut out = rewriter.push("the count [Sou", &ctx);
        assert_eq!(out, "the count ");
        out.push_str(&rewriter.push("rce 1] held", &ctx));
        out.push_str(&rewriter.finish(&ctx));
        assert_eq!(out, "the count [Source https://a/1] held");
    }

    #[test]
    fn unterminated_trailing_marker_flushes_as_is() {
        let ctx = context(&["https://a/1"]);
        let mut rewriter = CitationRewriter::new();
        let mut out = rewriter.push("dangling [Source 1", &ctx);
        out.push_str(&rewriter.finish(&ctx));
        assert_eq!(out, "dangling [Source 1");
    }

    #[test]
    fn any_split_point_matches_whole_string_resolution() {
        let ctx = context(&["https://a/1", "https://a/2", "https://a/3"]);
        let full = "Early returns [Source 1, 2] pointed one way, but the final tally \
                    [Source 3] flipped it; analysts disagreed [Source 9] about why.";
        let expected = resolve_citations(full, &ctx);

        let boundaries: Vec<usize> = full.char_indices().map(|(i, _)| i).collect();
        for split in boundaries.into_iter().skip(1) {
            let mut rewriter = CitationRewriter::new();
            let mut out = rewriter.push(&full[..split], &ctx);
            out.push_str(&rewriter.push(&full[split..], &ctx));
            out.push_str(&rewriter.finish(&ctx));
            assert_eq!(out, expected, "split at byte {split}");
        }
    }

    #[test]
    fn three_way_split_inside_marker_body() {
        let ctx = context(&["https://a/1", "https://a/2", "https://a/3"]);
        let mut rewriter = CitationRewriter::new();
        let mut out = String::new();
        out.push_str(&rewriter.push("totals [Source 1", &ctx));
        out.push_str(&rewriter.push(", 2", &ctx));
        out.push_str(&rewriter.push("].", &ctx));
        out.push_str(&rewriter.finish(&ctx));
        assert_eq!(out, "totals [Source https://a/1] [Source https://a/2].");
    }

    #[test]
    fn complete_marker_followed_by_partial_one_emits_the_first() {
        let ctx = context(&["https://a/1", "https://a/2"]);
        let mut rewriter = CitationRewriter::new();
        let out = rewriter.push("a [Source 1] b [Sour", &ctx);
        assert_eq!(out, "a [Source https://a/1] b ");
        assert_eq!(rewriter.push("ce 2]", &ctx), "[Source https://a/2]");
    }
}
