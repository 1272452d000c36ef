use crate::config::{Settings, DEFAULT_PLATFORM_BASE_URL};
use crate::domain::city::city_code;
use crate::ingest::normalize::clean_plan_id;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

pub const UTM_SOURCE: &str = "utm_source";
pub const UTM_MEDIUM: &str = "utm_medium";
pub const UTM_CONTENT: &str = "utm_content";
pub const UTM_CAMPAIGN: &str = "utm_campaign";
const UTM_PREFIX: &str = "utm_";

pub const DEFAULT_UTM_SOURCE: &str = "google";
pub const DEFAULT_UTM_MEDIUM: &str = "organiclanding";
pub const DEFAULT_UTM_CONTENT: &str = "mothersday";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtmConfig {
    pub source: String,
    pub medium: String,
    pub content: String,
    /// Origin for resolving relative plan links.
    pub platform_base_url: String,
}

impl Default for UtmConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_UTM_SOURCE.to_string(),
            medium: DEFAULT_UTM_MEDIUM.to_string(),
            content: DEFAULT_UTM_CONTENT.to_string(),
            platform_base_url: DEFAULT_PLATFORM_BASE_URL.to_string(),
        }
    }
}

impl UtmConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            source: settings.utm_source.clone().unwrap_or(defaults.source),
            medium: settings.utm_medium.clone().unwrap_or(defaults.medium),
            content: settings.utm_content.clone().unwrap_or(defaults.content),
            platform_base_url: settings.platform_base_url.clone(),
        }
    }
}

/// Outcome of building an outbound link. Every variant carries a usable URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtmLink {
    /// Carries a `{plan}_{city}` campaign.
    Attributed(String),
    /// No plan id could be found; only session params were merged.
    Unattributed(String),
    /// The link was empty and is returned as given.
    Unchanged(String),
}

impl UtmLink {
    pub fn as_str(&self) -> &str {
        match self {
            UtmLink::Attributed(s) | UtmLink::Unattributed(s) | UtmLink::Unchanged(s) => s,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            UtmLink::Attributed(s) | UtmLink::Unattributed(s) | UtmLink::Unchanged(s) => s,
        }
    }

    pub fn is_attributed(&self) -> bool {
        matches!(self, UtmLink::Attributed(_))
    }
}

fn plan_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/m/(\d+)").expect("static regex"))
}

/// Plan id from a `/m/{digits}` path segment.
pub fn extract_plan_id_from_link(link: &str) -> Option<String> {
    plan_path_regex()
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn campaign_code(plan_id: &str, city_slug: &str) -> String {
    format!("{plan_id}_{}", city_code(city_slug))
}

/// Builds the outbound booking link for a plan.
///
/// `utm_campaign` is always derived from the plan and city. Defaults for the
/// other UTM keys yield to `incoming` session values, non-UTM session keys are
/// carried over, and any key already on `plan_link` is left untouched.
pub fn build_plan_utm_link(
    plan_link: &str,
    plan_id: Option<&str>,
    city_slug: &str,
    incoming: &[(String, String)],
    config: &UtmConfig,
) -> UtmLink {
    if plan_link.trim().is_empty() {
        return UtmLink::Unchanged(plan_link.to_string());
    }

    let raw_id = plan_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| extract_plan_id_from_link(plan_link))
        .unwrap_or_default();
    let final_id = clean_plan_id(&raw_id);

    if final_id.is_empty() {
        let params: Vec<(&str, &str)> = incoming_pairs(incoming)
            .filter(|(k, _)| *k != UTM_CAMPAIGN)
            .collect();
        tracing::debug!(plan_link, "plan id not found; link left unattributed");
        return UtmLink::Unattributed(append_missing_params(plan_link, &params, config));
    }

    let campaign = campaign_code(&final_id, city_slug);
    let override_or = |key: &str, fallback: &str| -> String {
        incoming_pairs(incoming)
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| fallback.to_string())
    };
    let source = override_or(UTM_SOURCE, config.source.as_str());
    let medium = override_or(UTM_MEDIUM, config.medium.as_str());
    let content = override_or(UTM_CONTENT, config.content.as_str());

    let mut params: Vec<(&str, &str)> = vec![
        (UTM_CAMPAIGN, campaign.as_str()),
        (UTM_SOURCE, source.as_str()),
        (UTM_MEDIUM, medium.as_str()),
        (UTM_CONTENT, content.as_str()),
    ];
    params.extend(incoming_pairs(incoming).filter(|(k, _)| !k.starts_with(UTM_PREFIX)));

    UtmLink::Attributed(append_missing_params(plan_link, &params, config))
}

pub fn build_plan_utm_url(
    plan_link: &str,
    plan_id: Option<&str>,
    city_slug: &str,
    incoming: &[(String, String)],
    config: &UtmConfig,
) -> String {
    build_plan_utm_link(plan_link, plan_id, city_slug, incoming, config).into_url()
}

fn incoming_pairs(incoming: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    incoming
        .iter()
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
}

fn resolve_url(link: &str, base: &str) -> Option<Url> {
    match Url::parse(link) {
        Ok(url) => Some(url),
        Err(_) => Url::parse(base).ok()?.join(link).ok(),
    }
}

/// Appends each key not already present, first occurrence wins.
fn append_missing_params(link: &str, params: &[(&str, &str)], config: &UtmConfig) -> String {
    let Some(mut url) = resolve_url(link, &config.platform_base_url) else {
        return append_params_to_string(link, params);
    };

    let mut present: HashSet<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    let missing: Vec<(&str, &str)> = params
        .iter()
        .copied()
        .filter(|(k, _)| present.insert((*k).to_string()))
        .collect();

    if !missing.is_empty() {
        let mut query = url.query_pairs_mut();
        for (k, v) in missing {
            query.append_pair(k, v);
        }
    }
    url.into()
}

/// Last-resort path for links `url` cannot parse.
fn append_params_to_string(link: &str, params: &[(&str, &str)]) -> String {
    let (base, fragment) = match link.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (link, None),
    };

    let mut present: HashSet<String> = base
        .split_once('?')
        .map(|(_, query)| {
            query
                .split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| pair.split_once('=').map_or(pair, |(k, _)| k).to_string())
                .collect()
        })
        .unwrap_or_default();

    let encoded: Vec<String> = params
        .iter()
        .filter(|(k, _)| present.insert((*k).to_string()))
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();

    if encoded.is_empty() {
        return link.to_string();
    }

    let separator = match base.find('?') {
        None => "?",
        Some(_) if base.ends_with('?') || base.ends_with('&') => "",
        Some(_) => "&",
    };
    let mut out = format!("{base}{separator}{}", encoded.join("&"));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
