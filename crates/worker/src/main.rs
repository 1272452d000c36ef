use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heartpicks_core::domain::city::{find_city, CityRoster};
use heartpicks_core::ingest::feed::HttpFeedClient;
use heartpicks_core::pipeline::{city_target, load_city_plans, PlanSources};
use heartpicks_core::utm::UtmConfig;

mod snapshot;

#[derive(Debug, Parser)]
#[command(name = "heartpicks_worker")]
struct Args {
    /// City slug to build; repeat for several. Defaults to the full roster.
    #[arg(long = "city")]
    cities: Vec<String>,

    /// Locale for category names. Defaults to DEFAULT_LOCALE.
    #[arg(long)]
    locale: Option<String>,

    /// Reference date (YYYY-MM-DD) for the last-minute window. Defaults to today (UTC).
    #[arg(long)]
    today: Option<String>,

    /// Directory receiving one `<city>.json` per city.
    #[arg(long, default_value = "dist/data")]
    out_dir: PathBuf,

    /// Fetch and build everything, but write nothing.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = heartpicks_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let today = resolve_today(args.today.as_deref())?;
    let locale = args
        .locale
        .clone()
        .unwrap_or_else(|| settings.default_locale.clone());

    let sources = PlanSources::from_settings(&settings)?;
    let client = HttpFeedClient::from_settings(&settings)?;
    let roster = CityRoster::new(settings.city_feed_ids.clone());
    let utm = UtmConfig::from_settings(&settings);

    let cities: Vec<String> = if args.cities.is_empty() {
        roster.slugs().map(str::to_string).collect()
    } else {
        args.cities
            .iter()
            .map(|c| parse_city_slug(c))
            .collect::<anyhow::Result<_>>()?
    };

    let mut degraded_cities = 0usize;
    for city in &cities {
        let target = city_target(&roster, city);
        let outcome = load_city_plans(&client, &sources, &target, &locale).await;
        let snapshot =
            snapshot::CitySnapshot::build(city, &locale, outcome, &utm, today, chrono::Utc::now());

        if let Some(reason) = snapshot.degraded.as_deref() {
            degraded_cities += 1;
            tracing::warn!(%city, reason, "city built from degraded feed; landing will show fallback");
        }

        tracing::info!(
            %city,
            %today,
            all = snapshot.plans.all.len(),
            top3 = snapshot.plans.top3.len(),
            categories = snapshot.plans.categories.len(),
            candlelight = snapshot.plans.candlelight.len(),
            dry_run = args.dry_run,
            "city plan set built"
        );

        if args.dry_run {
            continue;
        }

        match snapshot.write_to(&args.out_dir) {
            Ok(path) => tracing::info!(%city, path = %path.display(), "wrote city snapshot"),
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                return Err(err);
            }
        }
    }

    tracing::info!(cities = cities.len(), degraded_cities, "build finished");
    Ok(())
}

fn init_sentry(settings: &heartpicks_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

/// Slugs become output file names, so only `[a-z0-9-]` is accepted.
fn parse_city_slug(raw: &str) -> anyhow::Result<String> {
    let slug = raw.trim().to_ascii_lowercase();
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        anyhow::bail!("invalid --city {raw:?}; expected a slug like \"madrid\"");
    }
    if find_city(&slug).is_none() {
        tracing::warn!(city = %slug, "city not in roster; links will use the generic code");
    }
    Ok(slug)
}

fn resolve_today(today_arg: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    if let Some(s) = today_arg {
        return chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --today {s:?}"));
    }
    Ok(chrono::Utc::now().date_naive())
}
