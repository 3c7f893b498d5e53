//! RSS/Atom parsing over `feed-rs`, reduced to the entry fields the
//! ingester consumes.

use anyhow::Context;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FeedEntry {
    pub(crate) link: Option<String>,
    pub(crate) title: String,
    pub(crate) summary: Option<String>,
    pub(crate) published: Option<DateTime<Utc>>,
    pub(crate) author: Option<String>,
}

/// Parse a feed document, accepting both RSS 2.0 and Atom 1.0. Malformed
/// documents fail with a parse error the caller logs as a feed-level
/// warning.
pub(crate) fn parse_entries(body: &[u8]) -> anyhow::Result<Vec<FeedEntry>> {
    let feed = feed_rs::parser::parse(body).context("failed to parse feed document")?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());
            let summary = entry.summary.map(|s| s.content);
            let published = entry.published.or(entry.updated);
            let author = entry
                .authors
                .iter()
                .map(|person| person.name.clone())
                .filter(|name| !name.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            let author = if author.is_empty() { None } else { Some(author) };

            FeedEntry {
                link,
                title,
                summary,
                published,
                author,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Wire</title>
    <link>https://example.com</link>
    <description>World news</description>
    <item>
      <title>Parliament approves budget</title>
      <link>https://example.com/articles/budget</link>
      <description>The budget passed after a long debate.</description>
      <pubDate>Mon, 02 Jun 2025 09:30:00 GMT</pubDate>
      <author>newsroom@example.com (Ana Reyes)</author>
    </item>
    <item>
      <title>Storm closes ports</title>
      <link>https://example.com/articles/storm</link>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <id>urn:example:feed</id>
  <updated>2025-06-02T10:00:00Z</updated>
  <entry>
    <title>Court ruling published</title>
    <id>urn:example:1</id>
    <link href="https://example.com/articles/ruling"/>
    <updated>2025-06-02T08:00:00Z</updated>
    <summary>The court released its full opinion.</summary>
    <author><name>Ben Ade</name></author>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_entries() {
        let entries = parse_entries(RSS_SAMPLE.as_bytes()).expect("rss parses");
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(
            first.link.as_deref(),
            Some("https://example.com/articles/budget")
        );
        assert_eq!(first.title, "Parliament approves budget");
        assert!(first.summary.as_deref().unwrap().contains("budget passed"));
        assert!(first.published.is_some());

        // Second item has no date or summary but still parses.
        assert!(entries[1].published.is_none());
        assert!(entries[1].summary.is_none());
    }

    #[test]
    fn parses_atom_entries_with_updated_fallback() {
        let entries = parse_entries(ATOM_SAMPLE.as_bytes()).expect("atom parses");
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(
            entry.link.as_deref(),
            Some("https://example.com/articles/ruling")
        );
        assert!(entry.published.is_some(), "updated serves as published");
        assert_eq!(entry.author.as_deref(), Some("Ben Ade"));
    }

    #[test]
    fn garbage_input_is_an_error() {
        assert!(parse_entries(b"this is not xml at all").is_err());
    }
}
