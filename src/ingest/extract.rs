//! Article body extraction from fetched HTML.
//!
//! Primary path reads paragraph text (scoped to `<article>` when one
//! exists) plus author and publish-date metadata. When paragraphs yield
//! too little, the fallback sanitizes the full document and converts it
//! to plain text. Bodies are capped at 50k chars, raw HTML at 100k.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::util::text::truncate_chars;

pub(crate) const MAX_BODY_CHARS: usize = 50_000;
pub(crate) const MAX_RAW_HTML_CHARS: usize = 100_000;
/// Paragraph extraction below this length falls through to the sanitizer.
const MIN_PARAGRAPH_TEXT_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ExtractedContent {
    pub(crate) body: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) published: Option<DateTime<Utc>>,
    /// A publish-date string was present in the document but none of the
    /// candidates parsed. Distinct from "no date at all": scoring treats
    /// a malformed date more kindly than a missing one.
    pub(crate) published_parse_failed: bool,
    pub(crate) raw_html: Option<String>,
}

static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").expect("valid selector"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));
static META_AUTHOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="author"], meta[property="article:author"]"#)
        .expect("valid selector")
});
static META_PUBLISHED: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="article:published_time"], meta[name="pubdate"]"#)
        .expect("valid selector")
});
static TIME_DATETIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("valid selector"));

/// Extract body text, author and publish date from an HTML document.
#[must_use]
pub(crate) fn extract_from_html(html: &str) -> ExtractedContent {
    let document = Html::parse_document(html);

    let author = document
        .select(&META_AUTHOR)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string);

    let date_candidates: Vec<&str> = document
        .select(&META_PUBLISHED)
        .filter_map(|el| el.value().attr("content"))
        .chain(
            document
                .select(&TIME_DATETIME)
                .filter_map(|el| el.value().attr("datetime")),
        )
        .collect();
    let published = date_candidates.iter().copied().find_map(parse_timestamp);
    let published_parse_failed = published.is_none() && !date_candidates.is_empty();

    let body = paragraph_text(&document)
        .filter(|text| text.len() >= MIN_PARAGRAPH_TEXT_CHARS)
        .or_else(|| sanitized_text(html))
        .map(|text| truncate_chars(&text, MAX_BODY_CHARS).to_string());

    ExtractedContent {
        body,
        author,
        published,
        published_parse_failed,
        raw_html: Some(truncate_chars(html, MAX_RAW_HTML_CHARS).to_string()),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Joined paragraph text, scoped to the first `<article>` element when
/// present. Script and style content never appears because only `<p>`
/// descendants are read.
fn paragraph_text(document: &Html) -> Option<String> {
    let paragraphs: Vec<String> = match document.select(&ARTICLE).next() {
        Some(article) => article
            .select(&PARAGRAPH)
            .map(|p| p.text().collect::<String>())
            .collect(),
        None => document
            .select(&PARAGRAPH)
            .map(|p| p.text().collect::<String>())
            .collect(),
    };

    let joined = paragraphs
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if joined.is_empty() { None } else { Some(joined) }
}

/// Fallback: sanitize the document (drops scripts, styles and event
/// handlers) and flatten what remains to plain text.
fn sanitized_text(html: &str) -> Option<String> {
    let cleaned = ammonia::clean(html);
    let text = html2text::from_read(cleaned.as_bytes(), 80).ok()?;

    let trimmed = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_html(paragraph_count: usize) -> String {
        let mut paragraphs = String::new();
        for i in 0..paragraph_count {
            paragraphs.push_str(&format!(
                "<p>Paragraph {i} covers the negotiations in detail, quoting several of the \
                 officials who attended the closed-door session on Tuesday.</p>"
            ));
        }
        format!(
            r#"<html><head>
            <meta name="author" content="Ana Reyes">
            <meta property="article:published_time" content="2025-06-02T09:30:00Z">
            <script>analytics.track();</script>
            <style>p {{ color: red; }}</style>
            </head><body><article>{paragraphs}</article>
            <p>Subscribe to our newsletter.</p></body></html>"#
        )
    }

    #[test]
    fn extracts_paragraphs_author_and_date() {
        let content = extract_from_html(&article_html(4));

        let body = content.body.expect("body extracted");
        assert!(body.contains("Paragraph 0"));
        assert!(body.contains("Paragraph 3"));
        // Scoped to <article>: the newsletter footer is excluded.
        assert!(!body.contains("Subscribe"));
        assert!(!body.contains("analytics.track"));

        assert_eq!(content.author.as_deref(), Some("Ana Reyes"));
        let published = content.published.expect("published parsed");
        assert_eq!(published.to_rfc3339(), "2025-06-02T09:30:00+00:00");
    }

    #[test]
    fn short_documents_fall_back_to_sanitized_text() {
        let html = "<html><body><div>Breaking update from the newsroom about the summit \
            outcome and the agreements reached by both delegations.</div></body></html>";
        let content = extract_from_html(html);

        let body = content.body.expect("fallback text extracted");
        assert!(body.contains("summit"));
    }

    #[test]
    fn scripts_never_reach_fallback_text() {
        let html = "<html><body><script>var secret = 42;</script><div>Visible report text \
            describing the announcement, long enough to be worth keeping around.</div></body></html>";
        let content = extract_from_html(html);

        let body = content.body.expect("fallback text extracted");
        assert!(!body.contains("secret"));
    }

    #[test]
    fn body_is_capped() {
        let mut huge = String::from("<html><body><article>");
        for _ in 0..4000 {
            huge.push_str("<p>Recurring sentence with enough words to add up quickly.</p>");
        }
        huge.push_str("</article></body></html>");

        let content = extract_from_html(&huge);
        assert!(content.body.expect("body").chars().count() <= MAX_BODY_CHARS);
        assert!(content.raw_html.expect("raw html").chars().count() <= MAX_RAW_HTML_CHARS);
    }

    #[test]
    fn missing_metadata_yields_none() {
        let content = extract_from_html(&String::from(
            "<html><body><article><p>Short.</p></article></body></html>",
        ));
        assert!(content.author.is_none());
        assert!(content.published.is_none());
        assert!(!content.published_parse_failed);
    }

    #[test]
    fn unparseable_date_sets_parse_failed_flag() {
        let html = r#"<html><head>
            <meta property="article:published_time" content="next Tuesday sometime">
            </head><body><article><p>Body.</p></article></body></html>"#;
        let content = extract_from_html(html);

        assert!(content.published.is_none());
        assert!(content.published_parse_failed);
    }

    #[test]
    fn one_good_candidate_clears_parse_failed_flag() {
        let html = r#"<html><head>
            <meta property="article:published_time" content="garbage">
            </head><body><article>
            <p>Body.</p><time datetime="2025-06-02T09:30:00Z">June 2</time>
            </article></body></html>"#;
        let content = extract_from_html(html);

        assert!(content.published.is_some());
        assert!(!content.published_parse_failed);
    }
}
