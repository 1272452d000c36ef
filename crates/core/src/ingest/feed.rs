use crate::config::Settings;
use anyhow::{Context, Result};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The spreadsheet answered with an HTML page (unpublished or access denied).
    #[error("feed returned an HTML document instead of CSV")]
    Unpublished,
    #[error("feed HTTP {status}")]
    Status { status: u16 },
}

#[async_trait::async_trait]
pub trait FeedClient: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Returns the CSV body of a published feed.
    async fn fetch_feed(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOptions {
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

impl FeedOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            timeout: settings
                .feed_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retries: settings.feed_retries.unwrap_or(defaults.retries).max(1),
            backoff: settings
                .feed_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    http: reqwest::Client,
    options: FeedOptions,
}

impl HttpFeedClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(FeedOptions::from_settings(settings))
    }

    pub fn new(options: FeedOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build feed http client")?;
        Ok(Self { http, options })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let res = self
            .http
            .get(url)
            .timeout(self.options.timeout)
            .send()
            .await
            .context("feed request failed")?;

        let status = res.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            }
            .into());
        }

        let text = res.text().await.context("failed to read feed body")?;
        if is_html_document(&text) {
            return Err(FeedError::Unpublished.into());
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl FeedClient for HttpFeedClient {
    fn source_name(&self) -> &'static str {
        "published_csv"
    }

    async fn fetch_feed(&self, url: &str) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    // Retrying will not publish the sheet.
                    let unpublished = matches!(
                        err.downcast_ref::<FeedError>(),
                        Some(FeedError::Unpublished)
                    );
                    if unpublished || attempt >= self.options.retries {
                        return Err(err);
                    }
                    let backoff = self.options.backoff;
                    tracing::warn!(attempt, ?backoff, error = %err, "feed fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

pub fn is_html_document(body: &str) -> bool {
    let head: String = body
        .trim_start_matches('\u{feff}')
        .trim_start()
        .chars()
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local server answering each connection with the next canned response
    /// (the last one repeats). Returns the feed url and a connection counter.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)];

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => request.extend_from_slice(&buf[..read]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{addr}/feed.csv"), hits)
    }

    fn client(retries: u32) -> HttpFeedClient {
        HttpFeedClient::new(FeedOptions {
            timeout: Duration::from_secs(5),
            retries,
            backoff: Duration::ZERO,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn server_errors_are_retried_up_to_the_limit() {
        let (url, hits) = serve(vec![(500, "boom")]).await;
        let err = client(3).fetch_feed(&url).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<FeedError>(),
            Some(&FeedError::Status { status: 500 })
        );
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_still_makes_one_attempt() {
        let (url, hits) = serve(vec![(503, "busy")]).await;
        assert!(client(0).fetch_feed(&url).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn html_body_gives_up_immediately() {
        let (url, hits) = serve(vec![(200, "<!DOCTYPE html><html></html>")]).await;
        let err = client(3).fetch_feed(&url).await.unwrap_err();
        assert_eq!(err.downcast_ref::<FeedError>(), Some(&FeedError::Unpublished));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_a_transient_failure() {
        let (url, hits) = serve(vec![(500, "boom"), (200, "id_plan\n1\n")]).await;
        let body = client(3).fetch_feed(&url).await.unwrap();
        assert_eq!(body, "id_plan\n1\n");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn detects_html_bodies() {
        assert!(is_html_document("<!DOCTYPE html><html>..."));
        assert!(is_html_document("  \n<HTML lang=\"en\">"));
        assert!(!is_html_document("id_plan,ds_plan\n1,<html>"));
        assert!(!is_html_document(""));
    }

    #[test]
    fn options_clamp_retries_to_one_attempt() {
        let settings = Settings {
            feed_timeout_secs: Some(5),
            feed_retries: Some(0),
            ..Settings::default()
        };
        let options = FeedOptions::from_settings(&settings);
        assert_eq!(options.retries, 1);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.backoff, Duration::from_millis(DEFAULT_BACKOFF_MS));
    }
}
