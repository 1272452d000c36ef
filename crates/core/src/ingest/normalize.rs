use crate::domain::plan::{is_candlelight_title, Plan, DEFAULT_RANK};
use crate::ingest::extract::{extract_category_keys, extract_price, parse_event_dates};
use crate::ingest::schema::PlanRow;
use crate::ingest::translations::CategoryLabels;

/// The city a pipeline run is building for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityTarget {
    pub slug: String,
    /// Value expected in the feed's `id_city` column.
    pub feed_id: String,
}

/// Digits of a plan id after percent-decoding: `"404%2C940"` -> `"404940"`.
pub fn clean_plan_id(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    decoded.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn parse_rank(raw: &str) -> i32 {
    let raw = raw.trim();
    raw.parse::<i32>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.trunc() as i32)
        })
        .unwrap_or(DEFAULT_RANK)
}

/// Builds a plan from one feed row, or `None` when the row belongs to another
/// city or lacks a category, id or title.
pub fn normalize_row(row: &PlanRow<'_>, target: &CityTarget, labels: &CategoryLabels) -> Option<Plan> {
    if row.city != target.feed_id {
        return None;
    }

    let categories = extract_category_keys(row.category);
    let first_category = *categories.first()?;

    let id = clean_plan_id(row.id);
    if id.is_empty() || row.title.is_empty() {
        return None;
    }

    let price = extract_price(row.session_prices);

    Some(Plan {
        id,
        title: row.title.to_string(),
        venue: row.venue.to_string(),
        price: price.formatted,
        price_value: price.value,
        link: row.link.to_string(),
        image_url: row.image_url.map(str::to_string),
        rank: parse_rank(row.rank),
        category_label: labels.get(first_category).to_string(),
        categories,
        city: target.slug.clone(),
        is_candlelight: is_candlelight_title(row.title),
        event_dates: parse_event_dates(row.event_dates),
    })
}
