use crate::domain::plan::{CategoryBucket, CityPlanSet, Plan};
use crate::utm::{build_plan_utm_link, UtmConfig};
use serde::Serialize;

/// A plan as served to a page, with its outbound booking link.
#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    #[serde(flatten)]
    pub plan: Plan,
    pub booking_url: String,
    pub attributed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketView {
    pub name: String,
    pub plans: Vec<PlanView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSetView {
    pub top3: Vec<PlanView>,
    pub categories: Vec<BucketView>,
    pub candlelight: Vec<PlanView>,
    pub all: Vec<PlanView>,
}

/// Renders booking links for one city. `incoming` are the visitor's tracking
/// params; a static build passes none.
pub struct LinkRenderer<'a> {
    pub city_slug: &'a str,
    pub incoming: &'a [(String, String)],
    pub utm: &'a UtmConfig,
}

impl LinkRenderer<'_> {
    pub fn plan(&self, plan: &Plan) -> PlanView {
        let link = build_plan_utm_link(
            &plan.link,
            Some(&plan.id),
            self.city_slug,
            self.incoming,
            self.utm,
        );
        PlanView {
            plan: plan.clone(),
            attributed: link.is_attributed(),
            booking_url: link.into_url(),
        }
    }

    pub fn plans<'p>(&self, plans: impl IntoIterator<Item = &'p Plan>) -> Vec<PlanView> {
        plans.into_iter().map(|p| self.plan(p)).collect()
    }

    fn bucket(&self, bucket: &CategoryBucket) -> BucketView {
        BucketView {
            name: bucket.name.clone(),
            plans: self.plans(&bucket.plans),
        }
    }

    pub fn plan_set(&self, set: &CityPlanSet) -> PlanSetView {
        PlanSetView {
            top3: self.plans(&set.top3),
            categories: set.categories.iter().map(|b| self.bucket(b)).collect(),
            candlelight: self.plans(&set.candlelight),
            all: self.plans(&set.all),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::Category;

    fn plan(id: &str, link: &str) -> Plan {
        Plan {
            id: id.to_string(),
            title: "Wine Tasting".to_string(),
            venue: String::new(),
            price: "15".to_string(),
            price_value: 15.0,
            link: link.to_string(),
            image_url: None,
            rank: 1,
            categories: vec![Category::Food],
            category_label: "Food".to_string(),
            city: "lisbon".to_string(),
            is_candlelight: false,
            event_dates: Vec::new(),
        }
    }

    #[test]
    fn plan_views_carry_campaign_links() {
        let utm = UtmConfig::default();
        let incoming = vec![("gclid".to_string(), "abc".to_string())];
        let renderer = LinkRenderer {
            city_slug: "lisbon",
            incoming: &incoming,
            utm: &utm,
        };
        let view = renderer.plan(&plan("101", "https://feverup.com/m/101"));
        assert!(view.attributed);
        assert!(view.booking_url.contains("utm_campaign=101_lis"));
        assert!(view.booking_url.contains("gclid=abc"));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "101");
        assert_eq!(json["categories"][0], "food");
    }

    #[test]
    fn configured_defaults_apply_without_session_params() {
        let utm = UtmConfig {
            source: "newsletter".to_string(),
            ..UtmConfig::default()
        };
        let renderer = LinkRenderer {
            city_slug: "lisbon",
            incoming: &[],
            utm: &utm,
        };
        let view = renderer.plan(&plan("5", "https://feverup.com/m/5"));
        assert!(view.booking_url.contains("utm_campaign=5_lis&utm_source=newsletter"));
    }
}
