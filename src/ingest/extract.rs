//! Article text extraction.
//!
//! Fetches a page and reduces the HTML to plain text: tags become word
//! separators, script/style bodies are elided, the usual entities are
//! decoded and whitespace collapses to single spaces. Good enough for news
//! article bodies; a proper DOM extractor is out of scope.

use std::time::Duration;

use reqwest::Client;

use crate::core::errors::ApiError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn fetch_article(client: &Client, url: &str) -> Result<String, ApiError> {
    let response = client
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(ApiError::internal)?;

    if !response.status().is_success() {
        return Err(ApiError::Internal(format!(
            "fetching {} returned {}",
            url,
            response.status()
        )));
    }

    let html = response.text().await.map_err(ApiError::internal)?;
    Ok(html_to_text(&html))
}

pub fn html_to_text(html: &str) -> String {
    let mut text = String::new();
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        rest = &rest[open..];

        let Some(close) = rest.find('>') else {
            // truncated tag at end of input
            rest = "";
            break;
        };

        let tag = &rest[1..close];
        rest = &rest[close + 1..];
        text.push(' ');

        let name = tag_name(tag);
        if !tag.starts_with('/') && (name == "script" || name == "style") {
            rest = skip_element(rest, &name);
        }
    }

    text.push_str(rest);
    let decoded = decode_entities(&text);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Skip past `</name ...>`, returning the remainder after the closing tag.
fn skip_element<'a>(rest: &'a str, name: &str) -> &'a str {
    let lower = rest.to_ascii_lowercase();
    let closing = format!("</{name}");
    match lower.find(&closing) {
        Some(pos) => {
            let after = &rest[pos..];
            match after.find('>') {
                Some(end) => &after[end + 1..],
                None => "",
            }
        }
        None => "",
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let html = "<html><body><p>One   two</p>\n<p>three</p></body></html>";
        assert_eq!(html_to_text(html), "One two three");
    }

    #[test]
    fn elides_script_and_style_bodies() {
        let html = r#"<head><style>p { color: red }</style>
            <script type="text/javascript">var x = "<p>not text</p>";</script></head>
            <body><p>Visible</p></body>"#;
        let text = html_to_text(html);
        assert_eq!(text, "Visible");
    }

    #[test]
    fn tags_separate_words() {
        assert_eq!(html_to_text("one<br>two"), "one two");
    }

    #[test]
    fn decodes_common_entities() {
        assert_eq!(
            html_to_text("<p>Smith &amp; Jones said &quot;no&quot;</p>"),
            "Smith & Jones said \"no\""
        );
    }

    #[test]
    fn tolerates_truncated_markup() {
        assert_eq!(html_to_text("trailing <p junk"), "trailing");
        assert_eq!(html_to_text("<script>never closed"), "");
    }
}
