use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use heartpicks_core::domain::city::city_code;
use heartpicks_core::filters::{filter_plans_on, PageType};
use heartpicks_core::pipeline::PipelineOutcome;
use heartpicks_core::render::{LinkRenderer, PlanSetView};
use heartpicks_core::utm::UtmConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Build-time data for one city landing.
#[derive(Debug, Clone, Serialize)]
pub struct CitySnapshot {
    pub city: String,
    pub city_code: &'static str,
    pub locale: String,
    pub generated_at: DateTime<Utc>,
    pub degraded: Option<String>,
    /// Plans with build-time booking links (configured UTM defaults, no session params).
    pub plans: PlanSetView,
    /// Plan ids per page type, in page order.
    pub pages: BTreeMap<&'static str, Vec<String>>,
}

impl CitySnapshot {
    pub fn build(
        city: &str,
        locale: &str,
        outcome: PipelineOutcome,
        utm: &UtmConfig,
        today: NaiveDate,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let degraded = outcome.degraded_reason().map(|r| r.to_string());
        let plans = outcome.into_plans();

        let pages = PageType::ALL
            .into_iter()
            .map(|page| {
                let ids = filter_plans_on(&plans.all, page, today)
                    .into_iter()
                    .map(|p| p.id.clone())
                    .collect();
                (page.as_str(), ids)
            })
            .collect();

        let renderer = LinkRenderer {
            city_slug: city,
            incoming: &[],
            utm,
        };

        Self {
            city: city.to_string(),
            city_code: city_code(city),
            locale: locale.to_string(),
            generated_at,
            degraded,
            plans: renderer.plan_set(&plans),
            pages,
        }
    }

    pub fn write_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output dir {}", dir.display()))?;
        let path = dir.join(format!("{}.json", self.city));
        let body = serde_json::to_vec_pretty(self).context("failed to serialize city snapshot")?;
        std::fs::write(&path, body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}
