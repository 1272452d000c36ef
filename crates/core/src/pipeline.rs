use crate::config::Settings;
use crate::domain::city::CityRoster;
use crate::domain::plan::CityPlanSet;
use crate::ingest::feed::{is_html_document, FeedClient, FeedError};
use crate::ingest::normalize::{normalize_row, CityTarget};
use crate::ingest::schema::{read_plan_feed, SchemaError};
use crate::ingest::translations::{CategoryLabels, TranslationTable};
use crate::ranking::build_city_plan_set;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedReason {
    /// Network failure or non-2xx after every retry.
    FeedUnreachable(String),
    /// The feed answered with HTML.
    FeedUnpublished,
    SchemaInvalid(SchemaError),
}

impl std::fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradedReason::FeedUnreachable(detail) => write!(f, "feed unreachable: {detail}"),
            DegradedReason::FeedUnpublished => f.write_str("feed is not published as CSV"),
            DegradedReason::SchemaInvalid(err) => write!(f, "{err}"),
        }
    }
}

/// A pipeline run never fails; a degraded run carries an empty plan set.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Ready(CityPlanSet),
    Degraded {
        reason: DegradedReason,
        plans: CityPlanSet,
    },
}

impl PipelineOutcome {
    pub fn degraded(reason: DegradedReason) -> Self {
        PipelineOutcome::Degraded {
            reason,
            plans: CityPlanSet::empty(),
        }
    }

    pub fn plans(&self) -> &CityPlanSet {
        match self {
            PipelineOutcome::Ready(plans) | PipelineOutcome::Degraded { plans, .. } => plans,
        }
    }

    pub fn into_plans(self) -> CityPlanSet {
        match self {
            PipelineOutcome::Ready(plans) | PipelineOutcome::Degraded { plans, .. } => plans,
        }
    }

    pub fn degraded_reason(&self) -> Option<&DegradedReason> {
        match self {
            PipelineOutcome::Ready(_) => None,
            PipelineOutcome::Degraded { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSources {
    pub plans_url: String,
    pub translations_url: Option<String>,
}

impl PlanSources {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            plans_url: settings.require_plans_feed_url()?.to_string(),
            translations_url: settings.translations_feed_url.clone(),
        })
    }
}

pub fn city_target(roster: &CityRoster, slug: &str) -> CityTarget {
    let slug = slug.trim().to_ascii_lowercase();
    CityTarget {
        feed_id: roster.feed_id(&slug),
        slug,
    }
}

/// Fetches both feeds concurrently and builds the plan set for one city.
pub async fn load_city_plans(
    client: &dyn FeedClient,
    sources: &PlanSources,
    target: &CityTarget,
    locale: &str,
) -> PipelineOutcome {
    let translations = async {
        match sources.translations_url.as_deref() {
            Some(url) => Some(client.fetch_feed(url).await),
            None => None,
        }
    };
    let (plans_res, translations_res) =
        tokio::join!(client.fetch_feed(&sources.plans_url), translations);

    let table = match translations_res {
        Some(Ok(text)) => TranslationTable::parse_csv(&text).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "translations feed unreadable; using tag names");
            TranslationTable::default()
        }),
        Some(Err(err)) => {
            tracing::warn!(error = %err, "translations feed fetch failed; using tag names");
            TranslationTable::default()
        }
        None => TranslationTable::default(),
    };
    let labels = table.labels_for(locale);

    let text = match plans_res {
        Ok(text) => text,
        Err(err) => {
            let reason = match err.downcast_ref::<FeedError>() {
                Some(FeedError::Unpublished) => DegradedReason::FeedUnpublished,
                _ => DegradedReason::FeedUnreachable(format!("{err:#}")),
            };
            tracing::error!(
                source = client.source_name(),
                city = %target.slug,
                %reason,
                "plans feed unavailable; serving empty plan set"
            );
            return PipelineOutcome::degraded(reason);
        }
    };

    build_from_csv(&text, target, &labels)
}

/// Pure part of the pipeline: CSV text to ranked plan set.
pub fn build_from_csv(text: &str, target: &CityTarget, labels: &CategoryLabels) -> PipelineOutcome {
    if is_html_document(text) {
        tracing::error!(city = %target.slug, "plans feed returned HTML; is the sheet published?");
        return PipelineOutcome::degraded(DegradedReason::FeedUnpublished);
    }

    let table = match read_plan_feed(text) {
        Ok(table) => table,
        Err(err) => {
            tracing::error!(city = %target.slug, error = %err, "plans feed schema invalid");
            return PipelineOutcome::degraded(DegradedReason::SchemaInvalid(err));
        }
    };

    let plans: Vec<_> = table
        .rows()
        .filter_map(|row| normalize_row(&row, target, labels))
        .collect();

    tracing::info!(
        city = %target.slug,
        rows = table.records.len(),
        kept = plans.len(),
        malformed = table.malformed_records,
        "plans feed normalized"
    );

    PipelineOutcome::Ready(build_city_plan_set(plans, labels))
}
