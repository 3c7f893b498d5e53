//! Per-feed ingestion: fetch the feed document, walk its entries, extract
//! article bodies, and upsert deduplicated article rows.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::ingest::extract::{self, MAX_BODY_CHARS};
use crate::ingest::feed::{self, FeedEntry};
use crate::store::dao::Dao;
use crate::store::models::{Feed, NewArticle};
use crate::util::text::truncate_chars;

/// Entries processed per feed per run.
const MAX_ENTRIES_PER_FEED: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FeedOutcome {
    pub(crate) entries_seen: usize,
    pub(crate) new_articles: usize,
}

/// Timeouts, connection failures, 5xx and 429 are worth another attempt;
/// anything else is terminal.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout()
        || error.is_connect()
        || error.status().is_some_and(|status| {
            status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        })
}

/// HTTP GET with a bounded retry budget. Transient failures are retried
/// on a jittered doubling backoff; 4xx is terminal on first sight.
pub(crate) struct HttpFetcher {
    client: reqwest::Client,
    retries: usize,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl HttpFetcher {
    pub(crate) fn new(
        client: reqwest::Client,
        retries: usize,
        backoff_base: Duration,
        backoff_cap: Duration,
    ) -> Self {
        Self {
            client,
            retries,
            backoff_base,
            backoff_cap,
        }
    }

    /// Delay before the nth retry: the base doubled per retry, capped,
    /// then scaled by a random factor so concurrent feed tasks do not
    /// retry in lockstep.
    fn backoff_delay(&self, retry: usize) -> Duration {
        let doubled = self
            .backoff_base
            .saturating_mul(1_u32 << retry.saturating_sub(1).min(16));
        doubled.min(self.backoff_cap).mul_f64(rand::rng().random())
    }

    pub(crate) async fn fetch(&self, url: &str, timeout: Duration) -> anyhow::Result<String> {
        let mut last_error: Option<anyhow::Error> = None;

        for retry in 0..=self.retries {
            if retry > 0 {
                tokio::time::sleep(self.backoff_delay(retry)).await;
            }

            match self.client.get(url).timeout(timeout).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .text()
                            .await
                            .with_context(|| format!("failed to read body from {url}"));
                    }
                    if status.is_client_error() {
                        bail!("terminal client error {status} from {url}");
                    }
                    debug!(url, %status, retry, "server error, will retry");
                    last_error = Some(anyhow!("server error {status} from {url}"));
                }
                Err(error) if is_transient(&error) => {
                    debug!(url, error = %error, retry, "transient error, will retry");
                    last_error = Some(anyhow::Error::new(error));
                }
                Err(error) => {
                    return Err(anyhow::Error::new(error))
                        .with_context(|| format!("failed to fetch {url}"));
                }
            }
        }

        let attempts = self.retries + 1;
        match last_error {
            Some(error) => Err(error.context(format!("giving up on {url} after {attempts} attempts"))),
            None => bail!("giving up on {url} after {attempts} attempts"),
        }
    }
}

/// Map one feed entry plus extracted content onto an article row.
/// Published-at prefers the entry's parsed date, then the extractor's.
#[must_use]
pub(crate) fn build_article(
    feed: &Feed,
    entry: &FeedEntry,
    content: &extract::ExtractedContent,
    url: String,
) -> NewArticle {
    let body = content
        .body
        .clone()
        .or_else(|| entry.summary.clone())
        .map(|text| truncate_chars(&text, MAX_BODY_CHARS).to_string());

    let published_at: Option<DateTime<Utc>> = entry.published.or(content.published);
    // Only meaningful when no usable date survived: the page carried one
    // the extractor could not parse.
    let published_parse_failed = published_at.is_none() && content.published_parse_failed;
    let author = entry.author.clone().or_else(|| content.author.clone());

    NewArticle {
        url,
        outlet_name: feed.outlet_name.clone(),
        title: truncate_chars(&entry.title, 500).to_string(),
        author,
        published_at,
        published_parse_failed,
        body,
        raw_html: content.raw_html.clone(),
        feed_id: feed.id,
    }
}

pub(crate) struct ArticleIngester {
    dao: Arc<Dao>,
    fetcher: HttpFetcher,
    feed_timeout: Duration,
    article_timeout: Duration,
}

impl ArticleIngester {
    pub(crate) fn new(
        dao: Arc<Dao>,
        fetcher: HttpFetcher,
        feed_timeout: Duration,
        article_timeout: Duration,
    ) -> Self {
        Self {
            dao,
            fetcher,
            feed_timeout,
            article_timeout,
        }
    }

    /// Process one feed end to end. Entry-level failures are logged and
    /// skipped; a feed-document failure aborts the whole feed.
    pub(crate) async fn process_feed(&self, feed: &Feed) -> anyhow::Result<FeedOutcome> {
        info!(feed_id = feed.id, outlet = %feed.outlet_name, url = %feed.url, "processing feed");

        let document = self.fetcher.fetch(&feed.url, self.feed_timeout).await?;
        let entries = match feed::parse_entries(document.as_bytes()) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(feed_id = feed.id, error = %error, "feed parse failure");
                return Ok(FeedOutcome::default());
            }
        };

        let mut outcome = FeedOutcome::default();
        for entry in entries.iter().take(MAX_ENTRIES_PER_FEED) {
            outcome.entries_seen += 1;
            match self.ingest_entry(feed, entry).await {
                Ok(true) => outcome.new_articles += 1,
                Ok(false) => {}
                Err(error) => {
                    warn!(
                        feed_id = feed.id,
                        link = entry.link.as_deref().unwrap_or(""),
                        error = %error,
                        "failed to ingest entry"
                    );
                }
            }
        }

        info!(
            feed_id = feed.id,
            outlet = %feed.outlet_name,
            entries = outcome.entries_seen,
            new_articles = outcome.new_articles,
            "feed processed"
        );
        Ok(outcome)
    }

    /// Returns true when a new article row was written.
    async fn ingest_entry(&self, feed: &Feed, entry: &FeedEntry) -> anyhow::Result<bool> {
        let Some(url) = entry.link.clone() else {
            debug!(feed_id = feed.id, title = %entry.title, "entry without link skipped");
            return Ok(false);
        };

        if self.dao.article_url_exists(&url).await? {
            debug!(url = %url, "article already ingested");
            return Ok(false);
        }

        let content = match self.fetcher.fetch(&url, self.article_timeout).await {
            Ok(html) => extract::extract_from_html(&html),
            Err(error) => {
                // Full-body extraction failed; fall back to the feed's own
                // summary so the entry is still captured.
                warn!(url = %url, error = %error, "article fetch failed, using entry summary");
                extract::ExtractedContent::default()
            }
        };

        let article = build_article(feed, entry, &content, url);
        let article_id = self.dao.upsert_article_by_url(&article).await?;
        debug!(article_id, url = %article.url, "article stored");

        Ok(true)
    }
}
