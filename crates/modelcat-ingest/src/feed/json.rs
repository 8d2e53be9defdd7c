use crate::FeedError;
use async_trait::async_trait;
use modelcat_domain::traits::FeedSource;
use modelcat_domain::{EntityKind, FeedItem, SourceKey};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One entry as written in a feed file
///
/// Either `source_key` or `url` must be present; `url` is combined with
/// `published` to derive the key.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(default, alias = "key")]
    source_key: Option<String>,
    #[serde(default, alias = "link")]
    url: Option<String>,
    #[serde(default, alias = "pub_date")]
    published: Option<String>,
    #[serde(alias = "raw_text", alias = "content")]
    text: String,
    #[serde(default)]
    kind: Option<String>,
}

impl FeedEntry {
    fn into_item(self, line: usize) -> Result<FeedItem, FeedError> {
        let invalid = |message: String| FeedError::InvalidEntry { line, message };

        let source_key = match (self.source_key, self.url) {
            (Some(key), _) if !key.trim().is_empty() => SourceKey::new(key.trim()),
            (_, Some(url)) if !url.trim().is_empty() => {
                SourceKey::from_origin(&url, self.published.as_deref())
            }
            _ => return Err(invalid("entry needs a source_key or url".to_string())),
        };

        let kind = match self.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            Some(name) => Some(
                EntityKind::parse(name).ok_or_else(|| invalid(format!("unknown kind '{}'", name)))?,
            ),
            None => None,
        };

        Ok(FeedItem {
            source_key,
            raw_text: self.text,
            kind,
        })
    }
}

/// Parse a feed file body
///
/// A body starting with `[` is a JSON array; anything else is JSON lines,
/// with blank lines ignored.
fn parse_entries(body: &str) -> Result<Vec<FeedItem>, FeedError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('[') {
        let entries: Vec<FeedEntry> =
            serde_json::from_str(trimmed).map_err(|e| FeedError::InvalidEntry {
                line: e.line(),
                message: e.to_string(),
            })?;
        return entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_item(index + 1))
            .collect();
    }

    let mut items = Vec::new();
    for (index, line) in body.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let entry: FeedEntry = serde_json::from_str(line).map_err(|e| FeedError::InvalidEntry {
            line: line_no,
            message: e.to_string(),
        })?;
        items.push(entry.into_item(line_no)?);
    }
    Ok(items)
}

/// Feed backed by a local JSON or JSON lines file
///
/// The whole file is returned on every fetch; the ledger filters out what
/// was already accepted.
#[derive(Debug, Clone)]
pub struct JsonFileFeed {
    path: PathBuf,
}

impl JsonFileFeed {
    /// Create a feed over a file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the feed file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FeedSource for JsonFileFeed {
    type Error = FeedError;

    async fn fetch_pending(&self) -> Result<Vec<FeedItem>, FeedError> {
        let body = tokio::fs::read_to_string(&self.path).await?;
        let items = parse_entries(&body)?;
        debug!("Read {} item(s) from {}", items.len(), self.path.display());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_json_lines() {
        let body = r#"
{"source_key": "a", "text": "GPT-4 was released by OpenAI."}

{"url": "https://example.com/llama", "published": "2023-07-18", "text": "Meta released Llama 2.", "kind": "model"}
"#;
        let items = parse_entries(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source_key.as_str(), "a");
        assert_eq!(items[0].kind, None);
        assert_eq!(items[1].source_key.as_str(), "https://example.com/llama#2023-07-18");
        assert_eq!(items[1].kind, Some(EntityKind::Model));
    }

    #[test]
    fn test_parse_json_array_with_aliases() {
        let body = r#"[
            {"key": "a", "raw_text": "one"},
            {"link": "https://example.com/b", "content": "two", "kind": "opinion"}
        ]"#;
        let items = parse_entries(body).unwrap();
        assert_eq!(items[0].raw_text, "one");
        assert_eq!(items[1].source_key.as_str(), "https://example.com/b");
        assert_eq!(items[1].kind, Some(EntityKind::Opinion));
    }

    #[test]
    fn test_entry_without_key_is_invalid() {
        let err = parse_entries("{\"text\": \"orphan\"}\n").unwrap_err();
        assert!(matches!(err, FeedError::InvalidEntry { line: 1, .. }));
    }

    #[test]
    fn test_unknown_kind_reports_line() {
        let body = "{\"source_key\": \"a\", \"text\": \"x\"}\n{\"source_key\": \"b\", \"text\": \"y\", \"kind\": \"dataset\"}\n";
        let err = parse_entries(body).unwrap_err();
        assert!(matches!(err, FeedError::InvalidEntry { line: 2, .. }));
        assert!(err.to_string().contains("dataset"));
    }

    #[tokio::test]
    async fn test_fetch_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{\"source_key\": \"a\", \"text\": \"first\"}}").unwrap();
        writeln!(file, "{{\"source_key\": \"b\", \"text\": \"second\"}}").unwrap();

        let feed = JsonFileFeed::new(file.path());
        let items = feed.fetch_pending().await.unwrap();
        assert_eq!(items.len(), 2);

        let again = feed.fetch_pending().await.unwrap();
        assert_eq!(items, again);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let feed = JsonFileFeed::new("/nonexistent/modelcat/feed.jsonl");
        assert!(matches!(feed.fetch_pending().await, Err(FeedError::Io(_))));
    }
}
