use crate::domain::plan::Category;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Price {
    pub formatted: String,
    pub value: f64,
}

impl Price {
    pub fn unknown() -> Self {
        Self {
            formatted: String::new(),
            value: 0.0,
        }
    }
}

/// Cheapest positive session price from a comma separated list.
pub fn extract_price(sessions: &str) -> Price {
    let min = sessions
        .split(',')
        .filter_map(parse_price_token)
        .reduce(f64::min);

    match min {
        Some(value) => Price {
            formatted: format!("{}", value.round() as i64),
            value,
        },
        None => Price::unknown(),
    }
}

fn parse_price_token(token: &str) -> Option<f64> {
    let normalized = token.trim().replace(',', ".");
    let value = parse_leading_float(&normalized)?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Longest numeric prefix (`"12.5€"` -> 12.5); `None` when the token does not
/// start with a number.
fn parse_leading_float(s: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, ch) in s.char_indices() {
        match ch {
            '+' | '-' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            '0'..='9' => seen_digit = true,
            _ => break,
        }
        end = i + ch.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    s[..end].trim_end_matches('.').parse::<f64>().ok()
}

/// Whitelisted tags in feed order, without duplicates.
pub fn extract_category_keys(categories: &str) -> Vec<Category> {
    let mut out = Vec::new();
    for token in categories.split(',') {
        let key = token.trim().to_lowercase();
        if let Some(category) = Category::from_key(&key) {
            if !out.contains(&category) {
                out.push(category);
            }
        }
    }
    out
}

/// Parses `YYYYMMDD` tokens; anything else is skipped.
pub fn parse_event_dates(dates: &str) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    for token in dates.split(',') {
        let Some(date) = parse_compact_date(token.trim()) else {
            continue;
        };
        if !out.contains(&date) {
            out.push(date);
        }
    }
    out
}

fn parse_compact_date(token: &str) -> Option<NaiveDate> {
    if token.len() != 8 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = token[0..4].parse::<i32>().ok()?;
    let month = token[4..6].parse::<u32>().ok()?;
    let day = token[6..8].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
