pub mod domain;
pub mod filters;
pub mod ingest;
pub mod pipeline;
pub mod ranking;
pub mod render;
pub mod utm;

pub mod config {
    use anyhow::Context;
    use std::collections::BTreeMap;

    pub const DEFAULT_PLATFORM_BASE_URL: &str = "https://feverup.com";
    pub const DEFAULT_LOCALE: &str = "en";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub plans_feed_url: Option<String>,
        pub translations_feed_url: Option<String>,
        pub feed_timeout_secs: Option<u64>,
        pub feed_retries: Option<u32>,
        pub feed_backoff_ms: Option<u64>,
        pub default_locale: String,
        pub platform_base_url: String,
        pub utm_source: Option<String>,
        pub utm_medium: Option<String>,
        pub utm_content: Option<String>,
        /// `slug -> id_city` overrides on top of the built-in roster.
        pub city_feed_ids: BTreeMap<String, String>,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                plans_feed_url: None,
                translations_feed_url: None,
                feed_timeout_secs: None,
                feed_retries: None,
                feed_backoff_ms: None,
                default_locale: DEFAULT_LOCALE.to_string(),
                platform_base_url: DEFAULT_PLATFORM_BASE_URL.to_string(),
                utm_source: None,
                utm_medium: None,
                utm_content: None,
                city_feed_ids: BTreeMap::new(),
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let city_feed_ids = match std::env::var("CITY_FEED_IDS") {
                Ok(raw) => parse_city_feed_ids(&raw).context("invalid CITY_FEED_IDS")?,
                Err(_) => BTreeMap::new(),
            };

            Ok(Self {
                plans_feed_url: non_empty_var("PLANS_FEED_URL"),
                translations_feed_url: non_empty_var("TRANSLATIONS_FEED_URL"),
                feed_timeout_secs: parsed_var("FEED_TIMEOUT_SECS"),
                feed_retries: parsed_var("FEED_RETRIES"),
                feed_backoff_ms: parsed_var("FEED_BACKOFF_MS"),
                default_locale: non_empty_var("DEFAULT_LOCALE")
                    .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
                platform_base_url: non_empty_var("PLATFORM_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_PLATFORM_BASE_URL.to_string()),
                utm_source: non_empty_var("UTM_SOURCE"),
                utm_medium: non_empty_var("UTM_MEDIUM"),
                utm_content: non_empty_var("UTM_CONTENT"),
                city_feed_ids,
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_plans_feed_url(&self) -> anyhow::Result<&str> {
            self.plans_feed_url
                .as_deref()
                .context("PLANS_FEED_URL is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
    }

    /// Parses `madrid=5,barcelona=7`.
    pub fn parse_city_feed_ids(raw: &str) -> anyhow::Result<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (slug, id) = part
                .split_once('=')
                .with_context(|| format!("expected slug=id, got {part:?}"))?;
            let (slug, id) = (slug.trim(), id.trim());
            anyhow::ensure!(
                !slug.is_empty() && !id.is_empty(),
                "expected slug=id, got {part:?}"
            );
            out.insert(slug.to_ascii_lowercase(), id.to_string());
        }
        Ok(out)
    }

}
