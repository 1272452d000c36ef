use crate::domain::plan::Category;
use crate::ingest::schema::{normalize_header, SchemaError};
use std::collections::HashMap;

pub const FALLBACK_LOCALE: &str = "en";

/// Category tag translations keyed by `(tag, locale)`, both lowercased.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    entries: HashMap<(String, String), String>,
}

impl TranslationTable {
    pub fn parse_csv(text: &str) -> Result<Self, SchemaError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| SchemaError::Csv(e.to_string()))?
            .clone();
        let names: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));

        let tag = find(&["tag", "category"][..]);
        let locale = find(&["cd_locale", "language"][..]);
        let translation = find(&["translation"][..]);

        let (Some(tag), Some(locale), Some(translation)) = (tag, locale, translation) else {
            let mut missing = Vec::new();
            if tag.is_none() {
                missing.push("tag");
            }
            if locale.is_none() {
                missing.push("cd_locale");
            }
            if translation.is_none() {
                missing.push("translation");
            }
            return Err(SchemaError::MissingColumns(missing));
        };

        let mut table = Self::default();
        for record in reader.records().flatten() {
            let cell = |idx: usize| record.get(idx).unwrap_or("").trim();
            table.insert(cell(tag), cell(locale), cell(translation));
        }
        Ok(table)
    }

    pub fn insert(&mut self, tag: &str, locale: &str, translation: &str) {
        let tag = tag.trim().to_lowercase();
        let locale = normalize_locale(locale);
        let translation = translation.trim();
        if tag.is_empty() || locale.is_empty() || translation.is_empty() {
            return;
        }
        self.entries.insert((tag, locale), translation.to_string());
    }

    fn lookup(&self, tag: &str, locale: &str) -> Option<&str> {
        self.entries
            .get(&(tag.to_string(), locale.to_string()))
            .map(String::as_str)
    }

    /// Resolves every category once: requested locale, its language, English,
    /// then the title-cased tag.
    pub fn labels_for(&self, locale: &str) -> CategoryLabels {
        let keys = lookup_order(locale);
        let labels = Category::ALL
            .into_iter()
            .map(|category| {
                let label = keys
                    .iter()
                    .find_map(|key| self.lookup(category.as_str(), key))
                    .map(str::to_string)
                    .unwrap_or_else(|| title_case_tag(category.as_str()));
                (category, label)
            })
            .collect();
        CategoryLabels { labels }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryLabels {
    labels: HashMap<Category, String>,
}

impl CategoryLabels {
    pub fn get(&self, category: Category) -> &str {
        self.labels
            .get(&category)
            .map(String::as_str)
            .unwrap_or(category.as_str())
    }
}

fn normalize_locale(locale: &str) -> String {
    locale.trim().to_lowercase().replace('_', "-")
}

fn lookup_order(locale: &str) -> Vec<String> {
    let mut keys = Vec::with_capacity(3);
    let locale = normalize_locale(locale);
    if !locale.is_empty() {
        keys.push(locale.clone());
        if let Some((lang, _)) = locale.split_once('-') {
            keys.push(lang.to_string());
        }
    }
    if !keys.iter().any(|k| k == FALLBACK_LOCALE) {
        keys.push(FALLBACK_LOCALE.to_string());
    }
    keys
}

/// `"wellness-and-relaxation"` -> `"Wellness And Relaxation"`.
pub fn title_case_tag(tag: &str) -> String {
    tag.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_current_and_legacy_headers() {
        let current = "Tag,CD_LOCALE,translation\nfood,es-ES,Gastronomía\n";
        let table = TranslationTable::parse_csv(current).unwrap();
        assert_eq!(table.labels_for("es-ES").get(Category::Food), "Gastronomía");

        let legacy = "Category,Language,Translation\nfood,fr,Gastronomie\n";
        let table = TranslationTable::parse_csv(legacy).unwrap();
        assert_eq!(table.labels_for("fr-FR").get(Category::Food), "Gastronomie");
    }

    #[test]
    fn missing_columns_are_reported() {
        let err = TranslationTable::parse_csv("Tag,Value\nfood,x\n").unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumns(vec!["cd_locale", "translation"])
        );
    }

    #[test]
    fn labels_fall_back_to_english_then_title_case() {
        let mut table = TranslationTable::default();
        table.insert("food", "en", "Restaurants");
        table.insert("food", "es", "Comida");
        table.insert("wellness-and-relaxation", "es-es", "Bienestar");

        let es = table.labels_for("es_ES");
        assert_eq!(es.get(Category::WellnessAndRelaxation), "Bienestar");
        assert_eq!(es.get(Category::Food), "Comida");

        let de = table.labels_for("de");
        assert_eq!(de.get(Category::Food), "Restaurants");
        assert_eq!(
            de.get(Category::ConcertsMusicalsTheater),
            "Concerts Musicals Theater"
        );
    }

    #[test]
    fn title_cases_tags() {
        assert_eq!(title_case_tag("valentines-related-events"), "Valentines Related Events");
        assert_eq!(title_case_tag("food"), "Food");
    }
}
