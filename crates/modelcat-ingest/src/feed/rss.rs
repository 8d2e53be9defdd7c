use crate::FeedError;
use async_trait::async_trait;
use modelcat_domain::traits::FeedSource;
use modelcat_domain::{FeedItem, SourceKey};
use quick_xml::events::{BytesStart, Event};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Guid,
    Published,
    Body,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"guid" | b"id" => Some(Field::Guid),
            b"pubDate" | b"published" | b"updated" | b"date" => Some(Field::Published),
            b"description" | b"summary" | b"content" | b"encoded" => Some(Field::Body),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawEntry {
    title: String,
    link: String,
    guid: String,
    published: String,
    body: String,
}

impl RawEntry {
    fn push(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Guid => &mut self.guid,
            // Atom carries both <published> and <updated>; keep the first
            Field::Published if !self.published.is_empty() => return,
            Field::Published => &mut self.published,
            Field::Body => &mut self.body,
        };
        target.push_str(text);
    }

    fn set_href(&mut self, start: &BytesStart<'_>) {
        if !self.link.is_empty() {
            return;
        }
        let href = start
            .attributes()
            .flatten()
            .find(|a| a.key.local_name().as_ref() == b"href")
            .and_then(|a| a.unescape_value().ok());
        if let Some(href) = href {
            self.link = href.into_owned();
        }
    }

    fn into_item(self) -> Option<FeedItem> {
        let origin = if !self.link.trim().is_empty() {
            self.link
        } else {
            self.guid
        };
        if origin.trim().is_empty() {
            return None;
        }

        let title = self.title.trim();
        let body = strip_tags(&self.body);
        let text = match (title.is_empty(), body.is_empty()) {
            (true, true) => return None,
            (false, true) => title.to_string(),
            (true, false) => body,
            (false, false) => format!("{}\n\n{}", title, body),
        };

        Some(FeedItem::new(
            SourceKey::from_origin(&origin, Some(self.published.as_str())),
            text,
        ))
    }
}

/// Drop markup from an HTML fragment and collapse whitespace
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an RSS 2.0 or Atom document into feed items
///
/// Each `<item>` or `<entry>` becomes one item keyed by its link (or guid)
/// plus publish date, with title and description as the text. Entries
/// without any origin or text are dropped.
pub fn parse_feed_document(xml: &str) -> Result<Vec<FeedItem>, FeedError> {
    let mut reader = quick_xml::Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut items = Vec::new();
    let mut entry: Option<RawEntry> = None;
    let mut field: Option<Field> = None;
    let mut dropped = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"item" | b"entry" => entry = Some(RawEntry::default()),
                    tag => {
                        if let Some(current) = entry.as_mut() {
                            field = Field::from_tag(tag);
                            if field == Some(Field::Link) {
                                current.set_href(&e);
                            }
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(current) = entry.as_mut() {
                    if e.local_name().as_ref() == b"link" {
                        current.set_href(&e);
                    }
                }
            }
            Ok(Event::Text(te)) => {
                if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                    let text = te.unescape().map_err(|e| FeedError::Xml(e.to_string()))?;
                    current.push(f, &text);
                }
            }
            Ok(Event::CData(cdata)) => {
                if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                    let bytes = cdata.into_inner();
                    current.push(f, &String::from_utf8_lossy(&bytes));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    field = None;
                    if let Some(done) = entry.take() {
                        match done.into_item() {
                            Some(item) => items.push(item),
                            None => dropped += 1,
                        }
                    }
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if dropped > 0 {
        warn!("Dropped {} feed entries without link or text", dropped);
    }
    Ok(items)
}

/// Feed backed by an RSS or Atom document over HTTP
#[derive(Debug, Clone)]
pub struct RssFeed {
    url: String,
    client: reqwest::Client,
}

impl RssFeed {
    /// Create a feed for a document URL
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Document URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for RssFeed {
    type Error = FeedError;

    async fn fetch_pending(&self) -> Result<Vec<FeedItem>, FeedError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        let items = parse_feed_document(&body)?;
        debug!("Fetched {} item(s) from {}", items.len(), self.url);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>AI News</title>
    <link>https://news.example.com</link>
    <item>
      <title>Meta releases Llama 2</title>
      <link>https://news.example.com/llama-2</link>
      <description><![CDATA[<p>Meta released <b>Llama 2</b> under a community license.</p>]]></description>
      <pubDate>Tue, 18 Jul 2023 09:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Mistral 7B &amp; friends</title>
      <guid>mistral-7b-launch</guid>
      <description>Mistral AI published a 7B model.</description>
    </item>
    <item>
      <description>No link anywhere</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Model Releases</title>
  <entry>
    <title>Claude 3 family</title>
    <link href="https://atom.example.com/claude-3"/>
    <id>urn:uuid:1225c695</id>
    <published>2024-03-04T00:00:00Z</published>
    <updated>2024-03-05T00:00:00Z</updated>
    <summary>Anthropic introduced Opus, Sonnet and Haiku.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let items = parse_feed_document(RSS).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(
            items[0].source_key.as_str(),
            "https://news.example.com/llama-2#Tue, 18 Jul 2023 09:00:00 GMT"
        );
        assert_eq!(
            items[0].raw_text,
            "Meta releases Llama 2\n\nMeta released Llama 2 under a community license."
        );

        assert_eq!(items[1].source_key.as_str(), "mistral-7b-launch");
        assert!(items[1].raw_text.starts_with("Mistral 7B & friends"));
    }

    #[test]
    fn test_parse_atom_entry() {
        let items = parse_feed_document(ATOM).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].source_key.as_str(),
            "https://atom.example.com/claude-3#2024-03-04T00:00:00Z"
        );
        assert!(items[0].raw_text.contains("Opus, Sonnet and Haiku"));
    }

    #[test]
    fn test_channel_fields_are_ignored() {
        let items = parse_feed_document(RSS).unwrap();
        assert!(items.iter().all(|i| !i.raw_text.contains("AI News")));
    }

    #[test]
    fn test_malformed_document() {
        let err = parse_feed_document("<rss><channel><item><title>x</wrong></item>").unwrap_err();
        assert!(matches!(err, FeedError::Xml(_)));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>one <b>two</b></p>\n three"), "one two three");
    }
}
