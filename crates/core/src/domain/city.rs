use serde::Serialize;
use std::collections::BTreeMap;

/// Code used in `utm_campaign` for cities missing from [`CITIES`].
pub const GENERIC_CITY_CODE: &str = "gen";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct City {
    pub slug: &'static str,
    pub name: &'static str,
    pub code: &'static str,
    /// `id_city` used by the plans feed, when known ahead of configuration.
    pub feed_id: Option<&'static str>,
}

const fn city(slug: &'static str, name: &'static str, code: &'static str) -> City {
    City {
        slug,
        name,
        code,
        feed_id: None,
    }
}

// Keep in sync with the landing roster; unmapped cities attribute as `gen`.
pub const CITIES: &[City] = &[
    City {
        feed_id: Some("5"),
        ..city("madrid", "Madrid", "mad")
    },
    city("barcelona", "Barcelona", "bcn"),
    city("valencia", "Valencia", "val"),
    city("london", "London", "lon"),
    city("paris", "Paris", "par"),
    city("lyon", "Lyon", "lyo"),
    city("new-york", "New York", "nyc"),
    city("los-angeles", "Los Angeles", "lax"),
    city("chicago", "Chicago", "chi"),
    city("miami", "Miami", "mia"),
    city("san-francisco", "San Francisco", "sfo"),
    city("washington-dc", "Washington DC", "was"),
    city("san-diego", "San Diego", "san"),
    city("atlanta", "Atlanta", "atl"),
    city("austin", "Austin", "aus"),
    city("lisbon", "Lisbon", "lis"),
    city("sao-paulo", "São Paulo", "sao"),
    city("rio-de-janeiro", "Rio de Janeiro", "rio"),
    city("mexico-city", "Mexico City", "mex"),
    city("buenos-aires", "Buenos Aires", "bue"),
    city("montreal", "Montreal", "mtl"),
    city("berlin", "Berlin", "ber"),
    city("hamburg", "Hamburg", "ham"),
    city("vienna", "Vienna", "vie"),
    city("munchen", "München", "muc"),
    city("dublin", "Dublin", "dub"),
    city("sydney", "Sydney", "syd"),
    city("melbourne", "Melbourne", "mel"),
    city("brisbane", "Brisbane", "bri"),
    city("toronto", "Toronto", "tor"),
    city("roma", "Roma", "rom"),
    city("milano", "Milano", "mil"),
];

pub fn find_city(slug: &str) -> Option<&'static City> {
    let slug = slug.trim();
    CITIES.iter().find(|c| c.slug.eq_ignore_ascii_case(slug))
}

/// Three-letter attribution code; never fails.
pub fn city_code(slug: &str) -> &'static str {
    find_city(slug).map(|c| c.code).unwrap_or(GENERIC_CITY_CODE)
}

/// Resolves the feed's `id_city` for a slug: configured override, then the
/// built-in id, then the slug itself.
#[derive(Debug, Clone, Default)]
pub struct CityRoster {
    overrides: BTreeMap<String, String>,
}

impl CityRoster {
    pub fn new(overrides: BTreeMap<String, String>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(slug, id)| (slug.to_ascii_lowercase(), id))
            .collect();
        Self { overrides }
    }

    pub fn feed_id(&self, slug: &str) -> String {
        let key = slug.trim().to_ascii_lowercase();
        if let Some(id) = self.overrides.get(&key) {
            return id.clone();
        }
        find_city(&key)
            .and_then(|c| c.feed_id)
            .map(str::to_string)
            .unwrap_or(key)
    }

    pub fn slugs(&self) -> impl Iterator<Item = &'static str> {
        CITIES.iter().map(|c| c.slug)
    }
}
