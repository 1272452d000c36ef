use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heartpicks_core::domain::city::{city_code, City, CityRoster, CITIES};
use heartpicks_core::filters::{filter_plans_by_page_type, PageType};
use heartpicks_core::ingest::feed::{FeedClient, HttpFeedClient};
use heartpicks_core::pipeline::{city_target, load_city_plans, PipelineOutcome, PlanSources};
use heartpicks_core::render::{LinkRenderer, PlanSetView, PlanView};
use heartpicks_core::utm::{build_plan_utm_link, UtmConfig};

mod render;

use render::split_locale;

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

    let sources = match PlanSources::from_settings(&settings) {
        Ok(sources) => Some(sources),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "plans feed not configured; starting API in degraded mode");
            None
        }
    };

    let feeds: Arc<dyn FeedClient> = Arc::new(HttpFeedClient::from_settings(&settings)?);

    let state = AppState {
        feeds,
        sources,
        roster: CityRoster::new(settings.city_feed_ids.clone()),
        utm: UtmConfig::from_settings(&settings),
        default_locale: settings.default_locale.clone(),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/cities", get(list_cities))
        .route("/cities/:city/plans", get(get_city_plans))
        .route("/cities/:city/pages/:page_type", get(get_city_page))
        .route("/go/:city/:plan_id", get(go_to_plan))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    feeds: Arc<dyn FeedClient>,
    sources: Option<PlanSources>,
    roster: CityRoster,
    utm: UtmConfig,
    default_locale: String,
}

impl AppState {
    /// Every request re-reads the feeds; nothing is cached between renders.
    async fn load(&self, city: &str, locale: &str) -> Result<PipelineOutcome, StatusCode> {
        let Some(sources) = &self.sources else {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        };
        let target = city_target(&self.roster, city);
        Ok(load_city_plans(self.feeds.as_ref(), sources, &target, locale).await)
    }
}

async fn list_cities() -> Json<&'static [City]> {
    Json(CITIES)
}

#[derive(Debug, Serialize)]
struct ApiPlanSet {
    city: String,
    city_code: &'static str,
    locale: String,
    /// Set when the feed could not be read; plans are then empty.
    degraded: Option<String>,
    #[serde(flatten)]
    plans: PlanSetView,
}

async fn get_city_plans(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<ApiPlanSet>, StatusCode> {
    let (locale, incoming) = split_locale(params, &state.default_locale);
    let outcome = state.load(&city, &locale).await?;

    let renderer = LinkRenderer {
        city_slug: &city,
        incoming: &incoming,
        utm: &state.utm,
    };
    let plans = renderer.plan_set(outcome.plans());

    Ok(Json(ApiPlanSet {
        city_code: city_code(&city),
        locale,
        degraded: outcome.degraded_reason().map(|r| r.to_string()),
        plans,
        city,
    }))
}

#[derive(Debug, Serialize)]
struct ApiPage {
    city: String,
    page_type: PageType,
    degraded: Option<String>,
    plans: Vec<PlanView>,
}

async fn get_city_page(
    State(state): State<AppState>,
    Path((city, page_type)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<ApiPage>, StatusCode> {
    let page_type: PageType = page_type.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    let (locale, incoming) = split_locale(params, &state.default_locale);
    let outcome = state.load(&city, &locale).await?;

    let renderer = LinkRenderer {
        city_slug: &city,
        incoming: &incoming,
        utm: &state.utm,
    };
    let plans = renderer.plans(filter_plans_by_page_type(&outcome.plans().all, page_type));

    Ok(Json(ApiPage {
        page_type,
        degraded: outcome.degraded_reason().map(|r| r.to_string()),
        plans,
        city,
    }))
}

async fn go_to_plan(
    State(state): State<AppState>,
    Path((city, plan_id)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Redirect, StatusCode> {
    let (locale, incoming) = split_locale(params, &state.default_locale);
    let outcome = state.load(&city, &locale).await?;
    if let Some(reason) = outcome.degraded_reason() {
        tracing::warn!(%city, %plan_id, %reason, "redirect requested while feed degraded");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let plan_id = heartpicks_core::ingest::normalize::clean_plan_id(&plan_id);
    let plan = outcome
        .plans()
        .find(&plan_id)
        .ok_or(StatusCode::NOT_FOUND)?;

    let link = build_plan_utm_link(&plan.link, Some(&plan.id), &city, &incoming, &state.utm);
    tracing::info!(%city, plan_id = %plan.id, attributed = link.is_attributed(), "outbound redirect");
    Ok(Redirect::temporary(link.as_str()))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
