use crate::domain::plan::{Category, Plan};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const LAST_MINUTE_WINDOW_DAYS: i64 = 14;

const GIFT_CATEGORIES: [Category; 4] = [
    Category::ValentinesRelatedEvents,
    Category::WorkshopsAndActivities,
    Category::WellnessAndRelaxation,
    Category::ConcertsMusicalsTheater,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageType {
    Gifts,
    Restaurants,
    Ideas,
    LastMinute,
}

impl PageType {
    pub const ALL: [PageType; 4] = [
        PageType::Gifts,
        PageType::Restaurants,
        PageType::Ideas,
        PageType::LastMinute,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PageType::Gifts => "gifts",
            PageType::Restaurants => "restaurants",
            PageType::Ideas => "ideas",
            PageType::LastMinute => "last-minute",
        }
    }
}

impl FromStr for PageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        PageType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown page type: {s}"))
    }
}

/// Page subset as of today (UTC).
pub fn filter_plans_by_page_type(plans: &[Plan], page: PageType) -> Vec<&Plan> {
    filter_plans_on(plans, page, Utc::now().date_naive())
}

pub fn filter_plans_on(plans: &[Plan], page: PageType, today: NaiveDate) -> Vec<&Plan> {
    let mut out: Vec<&Plan> = match page {
        PageType::Gifts => plans
            .iter()
            .filter(|p| p.has_any_category(&GIFT_CATEGORIES) && !p.is_exclusively(Category::Food))
            .collect(),
        PageType::Restaurants => plans
            .iter()
            .filter(|p| p.has_category(Category::Food))
            .collect(),
        PageType::Ideas => plans
            .iter()
            .filter(|p| !p.is_exclusively(Category::Food))
            .collect(),
        PageType::LastMinute => return last_minute(plans, today),
    };
    out.sort_by_key(|p| p.rank);
    out
}

/// Plans without dates, or with a date in `[today, today + 14 days]`, soonest
/// first. Undated plans sort last.
fn last_minute(plans: &[Plan], today: NaiveDate) -> Vec<&Plan> {
    let until = today + Duration::days(LAST_MINUTE_WINDOW_DAYS);

    let mut keyed: Vec<(NaiveDate, &Plan)> = plans
        .iter()
        .filter_map(|plan| {
            if plan.event_dates.is_empty() {
                return Some((NaiveDate::MAX, plan));
            }
            plan.event_dates
                .iter()
                .copied()
                .filter(|d| (today..=until).contains(d))
                .min()
                .map(|earliest| (earliest, plan))
        })
        .collect();

    keyed.sort_by_key(|(earliest, plan)| (*earliest, plan.rank));
    keyed.into_iter().map(|(_, plan)| plan).collect()
}
