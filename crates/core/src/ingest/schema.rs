use csv::StringRecord;
use thiserror::Error;

pub const COL_ID: &str = "id_plan";
pub const COL_TITLE: &str = "ds_plan";
pub const COL_VENUE: &str = "ds_venue";
pub const COL_LINK: &str = "link_to_plan";
pub const COL_RANK: &str = "rank";
pub const COL_CITY: &str = "id_city";
pub const COL_CATEGORY: &str = "category";
pub const COL_SESSION_PRICES: &str = "ds_session_prices";
pub const COL_SESSION_PRICES_LEGACY: &str = "ds_session";
pub const COL_EVENT_DATES: &str = "event_dates";

const REQUIRED: [&str; 5] = [COL_ID, COL_TITLE, COL_LINK, COL_CITY, COL_CATEGORY];
const IMAGE_HEADERS: [&str; 5] = ["image_url", "image", "img_url", "photo_url", "picture"];
const IMAGE_KEYWORDS: [&str; 4] = ["image", "img", "photo", "cloudinary"];
const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".webp", ".gif", ".avif"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("feed has no header row")]
    Empty,
    #[error("feed header is not valid CSV: {0}")]
    Csv(String),
    #[error("feed is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
}

/// `"Link to Plan "` -> `"link_to_plan"`.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().trim_start_matches('\u{feff}').chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Column positions resolved once from the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSchema {
    id: usize,
    title: usize,
    link: usize,
    city: usize,
    category: usize,
    venue: Option<usize>,
    rank: Option<usize>,
    session_prices: Option<usize>,
    event_dates: Option<usize>,
    image: Option<usize>,
    /// Unnamed columns that may carry an image URL, in header order.
    image_candidates: Vec<usize>,
}

impl FeedSchema {
    pub fn from_headers(headers: &StringRecord) -> Result<Self, SchemaError> {
        let names: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |name: &str| names.iter().position(|n| n == name);

        let missing: Vec<&'static str> = REQUIRED
            .into_iter()
            .filter(|&name| find(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }

        let venue = find(COL_VENUE);
        let rank = find(COL_RANK);
        let session_prices = find(COL_SESSION_PRICES).or_else(|| find(COL_SESSION_PRICES_LEGACY));
        let event_dates = find(COL_EVENT_DATES);
        let image = IMAGE_HEADERS.into_iter().find_map(|name| find(name));

        let mapped: Vec<usize> = [
            find(COL_ID),
            find(COL_TITLE),
            find(COL_LINK),
            find(COL_CITY),
            find(COL_CATEGORY),
            venue,
            rank,
            session_prices,
            event_dates,
            image,
        ]
        .into_iter()
        .flatten()
        .collect();
        let image_candidates = (0..names.len()).filter(|i| !mapped.contains(i)).collect();

        Ok(Self {
            id: find(COL_ID).unwrap_or_default(),
            title: find(COL_TITLE).unwrap_or_default(),
            link: find(COL_LINK).unwrap_or_default(),
            city: find(COL_CITY).unwrap_or_default(),
            category: find(COL_CATEGORY).unwrap_or_default(),
            venue,
            rank,
            session_prices,
            event_dates,
            image,
            image_candidates,
        })
    }

    pub fn row<'a>(&self, record: &'a StringRecord) -> PlanRow<'a> {
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();
        let optional = |idx: Option<usize>| idx.map(cell).unwrap_or("");

        let image_url = self
            .image
            .map(cell)
            .filter(|v| v.starts_with("http"))
            .or_else(|| {
                self.image_candidates
                    .iter()
                    .map(|&idx| cell(idx))
                    .find(|v| looks_like_image_url(v))
            });

        PlanRow {
            id: cell(self.id),
            title: cell(self.title),
            venue: optional(self.venue),
            link: cell(self.link),
            rank: optional(self.rank),
            city: cell(self.city),
            category: cell(self.category),
            session_prices: optional(self.session_prices),
            event_dates: optional(self.event_dates),
            image_url,
        }
    }
}

/// One feed row with every known column located; values are trimmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanRow<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub venue: &'a str,
    pub link: &'a str,
    pub rank: &'a str,
    pub city: &'a str,
    pub category: &'a str,
    pub session_prices: &'a str,
    pub event_dates: &'a str,
    pub image_url: Option<&'a str>,
}

fn looks_like_image_url(value: &str) -> bool {
    if !value.starts_with("http") {
        return false;
    }
    let lower = value.to_ascii_lowercase();
    IMAGE_KEYWORDS.iter().any(|k| lower.contains(k))
        || IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext))
}

#[derive(Debug, Clone)]
pub struct FeedTable {
    pub schema: FeedSchema,
    pub records: Vec<StringRecord>,
    /// Records the CSV reader could not decode.
    pub malformed_records: usize,
}

impl FeedTable {
    pub fn rows(&self) -> impl Iterator<Item = PlanRow<'_>> {
        self.records.iter().map(|r| self.schema.row(r))
    }
}

pub fn read_plan_feed(text: &str) -> Result<FeedTable, SchemaError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SchemaError::Csv(e.to_string()))?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SchemaError::Empty);
    }
    let schema = FeedSchema::from_headers(&headers)?;

    let mut records = Vec::new();
    let mut malformed_records = 0;
    for record in reader.records() {
        match record {
            Ok(r) => records.push(r),
            Err(err) => {
                malformed_records += 1;
                tracing::debug!(error = %err, "skipping undecodable feed record");
            }
        }
    }

    Ok(FeedTable {
        schema,
        records,
        malformed_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ID Plan,DS Plan,DS Venue,Link to Plan,Rank,ID City,Category,DS Session Prices,Event Dates,Extra";

    #[test]
    fn normalizes_headers_to_snake_case() {
        assert_eq!(normalize_header(" Link to Plan "), "link_to_plan");
        assert_eq!(normalize_header("CD_LOCALE"), "cd_locale");
        assert_eq!(normalize_header("\u{feff}id-plan"), "id_plan");
        assert_eq!(normalize_header("  "), "");
    }

    #[test]
    fn reads_rows_by_column_name() {
        let csv = format!(
            "{HEADER}\n\"404,940\",Candlelight Concert,Church,https://feverup.com/m/404940,3,5,food,\"30,25\",20260214,https://cdn.example.com/a.jpg\n"
        );
        let table = read_plan_feed(&csv).unwrap();
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 1);
        let row = rows[0];
        assert_eq!(row.id, "404,940");
        assert_eq!(row.title, "Candlelight Concert");
        assert_eq!(row.session_prices, "30,25");
        assert_eq!(row.image_url, Some("https://cdn.example.com/a.jpg"));
    }

    #[test]
    fn legacy_session_column_is_accepted() {
        let csv = "id_plan,ds_plan,link_to_plan,id_city,category,ds_session\n1,A,https://x,5,food,12\n";
        let table = read_plan_feed(csv).unwrap();
        assert_eq!(table.rows().next().unwrap().session_prices, "12");
    }

    #[test]
    fn image_candidates_need_image_markers() {
        let csv = "id_plan,ds_plan,link_to_plan,id_city,category,a,b\n1,A,https://x,5,food,https://example.com/page,https://example.com/photo/9\n";
        let table = read_plan_feed(csv).unwrap();
        assert_eq!(
            table.rows().next().unwrap().image_url,
            Some("https://example.com/photo/9")
        );
    }

    #[test]
    fn missing_columns_are_enumerated() {
        let err = read_plan_feed("id_plan,ds_plan,rank\n1,A,1\n").unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumns(vec![COL_LINK, COL_CITY, COL_CATEGORY])
        );
    }

    #[test]
    fn short_records_yield_empty_cells() {
        let csv = "id_plan,ds_plan,link_to_plan,id_city,category,rank\n1,A\n";
        let table = read_plan_feed(csv).unwrap();
        let row = table.rows().next().unwrap();
        assert_eq!(row.link, "");
        assert_eq!(row.rank, "");
    }
}
