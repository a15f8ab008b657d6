//! Minimal RSS parsing: channel title plus item titles and links. That is
//! all the ingestion path needs; full feed semantics (atom, enclosures,
//! dates) stay out of scope.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::core::errors::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub title: Option<String>,
    pub items: Vec<FeedItem>,
}

pub fn parse_rss(xml: &str) -> Result<Feed, ApiError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut in_item = false;
    let mut current: Option<String> = None;
    let mut item_title: Option<String> = None;
    let mut item_link: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
                if name == "item" {
                    in_item = true;
                    item_title = None;
                    item_link = None;
                }
                current = Some(name);
            }
            Ok(Event::End(end)) => {
                if end.name().as_ref() == b"item" {
                    in_item = false;
                    if let (Some(title), Some(link)) = (item_title.take(), item_link.take()) {
                        feed.items.push(FeedItem { title, link });
                    }
                }
                current = None;
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map_err(|err| ApiError::InvalidInput(format!("invalid RSS feed: {err}")))?
                    .trim()
                    .to_string();
                record(&mut feed, in_item, &current, &mut item_title, &mut item_link, value);
            }
            Ok(Event::CData(data)) => {
                let value = String::from_utf8_lossy(&data.into_inner()).trim().to_string();
                record(&mut feed, in_item, &current, &mut item_title, &mut item_link, value);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(ApiError::InvalidInput(format!("invalid RSS feed: {err}")));
            }
        }
    }

    Ok(feed)
}

fn record(
    feed: &mut Feed,
    in_item: bool,
    current: &Option<String>,
    item_title: &mut Option<String>,
    item_link: &mut Option<String>,
    value: String,
) {
    if value.is_empty() {
        return;
    }
    match current.as_deref() {
        Some("title") if in_item => {
            item_title.get_or_insert(value);
        }
        Some("link") if in_item => {
            item_link.get_or_insert(value);
        }
        Some("title") if feed.title.is_none() => {
            feed.title = Some(value);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>World News</title>
    <link>https://news.example</link>
    <description>Top stories</description>
    <item>
      <title>Election wrap</title>
      <link>https://news.example/wrap</link>
      <description>The count finished overnight.</description>
    </item>
    <item>
      <title><![CDATA[Markets & turnout]]></title>
      <link>https://news.example/turnout</link>
    </item>
    <item>
      <title>No link, skipped</title>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_channel_title_and_items() {
        let feed = parse_rss(SAMPLE).unwrap();
        assert_eq!(feed.title.as_deref(), Some("World News"));
        assert_eq!(feed.items.len(), 2);
        assert_eq!(
            feed.items[0],
            FeedItem {
                title: "Election wrap".into(),
                link: "https://news.example/wrap".into(),
            }
        );
        assert_eq!(feed.items[1].title, "Markets & turnout");
    }

    #[test]
    fn item_without_link_is_dropped() {
        let feed = parse_rss(SAMPLE).unwrap();
        assert!(feed.items.iter().all(|item| !item.link.is_empty()));
    }

    #[test]
    fn mismatched_tags_are_an_input_error() {
        let err = parse_rss("<rss><channel></wrong></channel></rss>").unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn empty_feed_has_no_items() {
        let feed = parse_rss("<rss><channel><title>Empty</title></channel></rss>").unwrap();
        assert_eq!(feed.title.as_deref(), Some("Empty"));
        assert!(feed.items.is_empty());
    }
}
