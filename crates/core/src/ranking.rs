use crate::domain::plan::{Category, CategoryBucket, CityPlanSet, Plan};
use crate::ingest::translations::CategoryLabels;
use std::collections::HashSet;

pub const TOP_N: usize = 3;

/// Stable ascending sort; equal ranks keep feed order.
pub fn sort_by_rank(plans: &mut [Plan]) {
    plans.sort_by_key(|p| p.rank);
}

/// Picks up to `n` positions from a rank-sorted list, admitting at most one
/// candlelight plan unless nothing else is left to fill the slots.
/// Returned positions are ascending, i.e. in rank order.
pub fn select_top(plans: &[Plan], n: usize) -> Vec<usize> {
    let mut picked: Vec<usize> = Vec::with_capacity(n);
    let mut has_candlelight = false;

    for (idx, plan) in plans.iter().enumerate() {
        if picked.len() >= n {
            break;
        }
        if plan.is_candlelight {
            if has_candlelight {
                continue;
            }
            has_candlelight = true;
        }
        picked.push(idx);
    }

    if picked.len() < n {
        for idx in 0..plans.len() {
            if picked.len() >= n {
                break;
            }
            if !picked.contains(&idx) {
                picked.push(idx);
            }
        }
    }

    picked.sort_unstable();
    picked
}

/// Groups plans by translated category name. Candlelight plans only go under
/// the valentines umbrella.
pub fn bucket_by_category<'a>(
    plans: impl IntoIterator<Item = &'a Plan>,
    labels: &CategoryLabels,
) -> Vec<CategoryBucket> {
    let mut buckets: Vec<CategoryBucket> = Vec::new();
    for plan in plans {
        // Two tags sharing a label must not list the same row twice.
        let mut joined: HashSet<&str> = HashSet::new();
        for &category in &plan.categories {
            if plan.is_candlelight && category != Category::ValentinesRelatedEvents {
                continue;
            }
            let name = labels.get(category);
            if !joined.insert(name) {
                continue;
            }
            match buckets.iter_mut().find(|b| b.name == name) {
                Some(bucket) => bucket.plans.push(plan.clone()),
                None => buckets.push(CategoryBucket {
                    name: name.to_string(),
                    plans: vec![plan.clone()],
                }),
            }
        }
    }
    buckets
}

pub fn build_city_plan_set(mut plans: Vec<Plan>, labels: &CategoryLabels) -> CityPlanSet {
    sort_by_rank(&mut plans);

    let top = select_top(&plans, TOP_N);
    let top3: Vec<Plan> = top.iter().map(|&idx| plans[idx].clone()).collect();
    let rest: Vec<&Plan> = plans
        .iter()
        .enumerate()
        .filter(|(idx, _)| !top.contains(idx))
        .map(|(_, plan)| plan)
        .collect();

    let categories = bucket_by_category(rest.iter().copied(), labels);
    let candlelight = rest
        .iter()
        .filter(|p| p.is_candlelight)
        .map(|&p| p.clone())
        .collect();

    CityPlanSet {
        top3,
        categories,
        candlelight,
        all: plans,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::plan::{is_candlelight_title, Category, Plan};

    pub fn plan(id: &str, title: &str, rank: i32, categories: &[Category]) -> Plan {
        Plan {
            id: id.to_string(),
            title: title.to_string(),
            venue: String::new(),
            price: String::new(),
            price_value: 0.0,
            link: format!("https://feverup.com/m/{id}"),
            image_url: None,
            rank,
            categories: categories.to_vec(),
            category_label: String::new(),
            city: "madrid".to_string(),
            is_candlelight: is_candlelight_title(title),
            event_dates: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::plan;
    use super::*;
    use crate::ingest::translations::TranslationTable;
    use Category::*;

    fn ids(plans: &[Plan]) -> Vec<&str> {
        plans.iter().map(|p| p.id.as_str()).collect()
    }

    fn labels() -> CategoryLabels {
        TranslationTable::default().labels_for("en")
    }

    #[test]
    fn top_admits_only_best_candlelight() {
        let plans = vec![
            plan("1", "Candlelight: Vivaldi", 1, &[ValentinesRelatedEvents]),
            plan("2", "Candlelight: Queen", 2, &[ValentinesRelatedEvents]),
            plan("3", "Wine tasting", 3, &[Food]),
            plan("4", "Candlelight: Coldplay", 4, &[ValentinesRelatedEvents]),
            plan("5", "Spa day", 5, &[WellnessAndRelaxation]),
        ];
        let set = build_city_plan_set(plans, &labels());
        assert_eq!(ids(&set.top3), vec!["1", "3", "5"]);
        assert_eq!(set.top3.iter().filter(|p| p.is_candlelight).count(), 1);
        assert_eq!(ids(&set.candlelight), vec!["2", "4"]);
    }

    #[test]
    fn top_fills_with_candlelight_when_nothing_else_remains() {
        let plans = vec![
            plan("1", "Candlelight A", 1, &[ValentinesRelatedEvents]),
            plan("2", "Candlelight B", 2, &[ValentinesRelatedEvents]),
            plan("3", "Dinner", 3, &[Food]),
        ];
        let top = select_top(&plans, TOP_N);
        assert_eq!(top, vec![0, 1, 2]);
    }

    #[test]
    fn top_is_never_larger_than_input() {
        let plans = vec![plan("1", "Dinner", 1, &[Food])];
        assert_eq!(select_top(&plans, TOP_N), vec![0]);
        assert!(select_top(&[], TOP_N).is_empty());
    }

    #[test]
    fn top_is_resorted_by_rank() {
        let mut plans = vec![
            plan("9", "Late", 9, &[Food]),
            plan("1", "Early", 1, &[Food]),
            plan("5", "Candlelight Mid", 5, &[Food]),
        ];
        sort_by_rank(&mut plans);
        let set = build_city_plan_set(plans, &labels());
        assert_eq!(ids(&set.top3), vec!["1", "5", "9"]);
    }

    #[test]
    fn candlelight_only_lands_in_valentines_bucket() {
        let plans = vec![
            plan("1", "Top a", 1, &[Food]),
            plan("2", "Top b", 2, &[Food]),
            plan("3", "Top c", 3, &[Food]),
            plan(
                "4",
                "Candlelight Jazz",
                4,
                &[ConcertsMusicalsTheater, ValentinesRelatedEvents],
            ),
            plan("5", "Cooking class", 5, &[Food, WorkshopsAndActivities]),
        ];
        let set = build_city_plan_set(plans, &labels());

        let valentines = set.bucket("Valentines Related Events").unwrap();
        assert_eq!(ids(&valentines.plans), vec!["4"]);
        assert!(set.bucket("Concerts Musicals Theater").is_none());
        assert_eq!(ids(&set.bucket("Food").unwrap().plans), vec!["5"]);
        assert_eq!(
            ids(&set.bucket("Workshops And Activities").unwrap().plans),
            vec!["5"]
        );
        assert_eq!(set.all.len(), 5);
    }

    #[test]
    fn tags_with_same_label_share_a_bucket() {
        let mut table = TranslationTable::default();
        table.insert("food", "en", "Experiences");
        table.insert("workshops-and-activities", "en", "Experiences");
        let labels = table.labels_for("en");

        let plans = vec![
            plan("1", "A", 1, &[Food, WorkshopsAndActivities]),
            plan("2", "B", 2, &[WorkshopsAndActivities]),
        ];
        let buckets = bucket_by_category(plans.iter(), &labels);
        assert_eq!(buckets.len(), 1);
        assert_eq!(ids(&buckets[0].plans), vec!["1", "2"]);
    }

    #[test]
    fn rows_sharing_an_id_each_land_in_their_bucket() {
        let plans = vec![
            plan("1", "Top a", 1, &[Food]),
            plan("2", "Top b", 2, &[Food]),
            plan("3", "Top c", 3, &[Food]),
            plan("7", "Dinner Mon", 4, &[Food]),
            plan("7", "Dinner Tue", 5, &[Food]),
        ];
        let set = build_city_plan_set(plans, &labels());
        assert_eq!(set.all.len(), 5);
        let titles: Vec<&str> = set
            .bucket("Food")
            .unwrap()
            .plans
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Dinner Mon", "Dinner Tue"]);
    }

    #[test]
    fn empty_input_builds_empty_set() {
        let set = build_city_plan_set(Vec::new(), &labels());
        assert!(set.is_empty());
        assert_eq!(set, CityPlanSet::empty());
    }
}
