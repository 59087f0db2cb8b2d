use std::fmt::Display;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tracing::{info, warn};

use crate::config::Settings;
use crate::map::render;
use crate::pipeline;
use crate::scraper;
use crate::source::agenda::AgendaSource;
use crate::source::geocode::AnyGeocoder;
use crate::store;

const DESCRIPTIONS_ROUTE: &str = "/descriptions";

type HandlerError = (StatusCode, String);

/// Serve the agenda map. Every `GET /` scrapes, geocodes and renders afresh.
pub async fn serve(mut settings: Settings) -> Result<()> {
    if settings.map.description_base_url.is_none() {
        settings.map.description_base_url = Some(DESCRIPTIONS_ROUTE.to_string());
    }
    let bind = settings.server.bind.clone();
    let app = router(Arc::new(settings));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(settings: Arc<Settings>) -> Router {
    Router::new()
        .route("/", get(index))
        .route(&format!("{}/{{file}}", DESCRIPTIONS_ROUTE), get(description))
        .with_state(settings)
}

async fn index(State(settings): State<Arc<Settings>>) -> Result<Html<String>, HandlerError> {
    let source = AgendaSource::new(&settings.agenda).map_err(internal)?;
    let geocoder = AnyGeocoder::from_settings(&settings.geocoder).map_err(internal)?;

    let (records, stats) = scraper::scrape_agendas(&source).await;
    let out = pipeline::render_records(&records, &geocoder, &settings)
        .await
        .map_err(internal)?;
    info!(
        "Generated map: {} agendas ({} failed), {} markers",
        stats.ok,
        stats.errors,
        out.plan.markers.len()
    );

    if let Err(e) = render::write_map(&settings.map.output, &out.html) {
        warn!("Could not keep a copy of the map: {:#}", e);
    }
    Ok(Html(out.html))
}

async fn description(
    State(settings): State<Arc<Settings>>,
    Path(file): Path<String>,
) -> Result<String, StatusCode> {
    store::load_body(&settings.map.description_dir, &file).ok_or(StatusCode::NOT_FOUND)
}

fn internal(e: impl Display) -> HandlerError {
    warn!("Request failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_in(dir: &std::path::Path) -> Arc<Settings> {
        let mut s = Settings::default();
        s.map.description_dir = dir.to_path_buf();
        Arc::new(s)
    }

    #[tokio::test]
    async fn serves_saved_descriptions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc123.txt"), "Address: 123 W Main St.").unwrap();

        let body = description(State(settings_in(dir.path())), Path("abc123.txt".to_string()))
            .await
            .unwrap();
        assert_eq!(body, "Address: 123 W Main St.");
    }

    #[tokio::test]
    async fn unknown_description_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let status = description(State(settings_in(dir.path())), Path("../Cargo.toml".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn router_builds() {
        let dir = tempfile::tempdir().unwrap();
        let _ = router(settings_in(dir.path()));
    }
}
