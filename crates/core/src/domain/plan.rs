use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Title substring (case-insensitive) marking the special brand.
pub const CANDLELIGHT_MARKER: &str = "candlelight";

/// Rank assigned when the feed has none.
pub const DEFAULT_RANK: i32 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    ConcertsMusicalsTheater,
    ValentinesRelatedEvents,
    Food,
    WorkshopsAndActivities,
    WellnessAndRelaxation,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::ConcertsMusicalsTheater,
        Category::ValentinesRelatedEvents,
        Category::Food,
        Category::WorkshopsAndActivities,
        Category::WellnessAndRelaxation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::ConcertsMusicalsTheater => "concerts-musicals-theater",
            Category::ValentinesRelatedEvents => "valentines-related-events",
            Category::Food => "food",
            Category::WorkshopsAndActivities => "workshops-and-activities",
            Category::WellnessAndRelaxation => "wellness-and-relaxation",
        }
    }

    /// Matches an already trimmed, lowercased tag against the whitelist.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Digits only.
    pub id: String,
    pub title: String,
    pub venue: String,
    /// Rounded minimum session price, empty when unknown.
    pub price: String,
    pub price_value: f64,
    pub link: String,
    pub image_url: Option<String>,
    pub rank: i32,
    pub categories: Vec<Category>,
    /// Display name of the first category in the requested locale.
    pub category_label: String,
    pub city: String,
    pub is_candlelight: bool,
    pub event_dates: Vec<NaiveDate>,
}

impl Plan {
    pub fn has_category(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    pub fn has_any_category(&self, categories: &[Category]) -> bool {
        self.categories.iter().any(|c| categories.contains(c))
    }

    pub fn is_exclusively(&self, category: Category) -> bool {
        self.categories.len() == 1 && self.categories[0] == category
    }
}

pub fn is_candlelight_title(title: &str) -> bool {
    title.to_lowercase().contains(CANDLELIGHT_MARKER)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBucket {
    /// Translated display name; tags sharing a translation share a bucket.
    pub name: String,
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityPlanSet {
    pub top3: Vec<Plan>,
    /// Ordered by first appearance in rank order.
    pub categories: Vec<CategoryBucket>,
    pub candlelight: Vec<Plan>,
    pub all: Vec<Plan>,
}

impl CityPlanSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn find(&self, plan_id: &str) -> Option<&Plan> {
        self.all.iter().find(|p| p.id == plan_id)
    }

    pub fn bucket(&self, name: &str) -> Option<&CategoryBucket> {
        self.categories.iter().find(|b| b.name == name)
    }
}
