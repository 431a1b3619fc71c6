use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use crate::aggregate::{
    build_evolution, build_lap_report, current_standings, merge_events, qualifying_results, session_results,
    PitStopResources,
};
use crate::calendar::{resolve_season, CalendarService};
use crate::error::AppError;
use crate::types::{
    EntrantKind, LapReport, PitStopAggregate, QualifyingReport, Race, ResultSession, SeasonEvolution, SessionResults,
    StandingsTable,
};
use crate::upstream::UpstreamClient;

#[derive(Clone)]
pub struct ApiState {
    /// Season, standings and lap provider.
    pub primary: Arc<dyn UpstreamClient>,
    /// Pit-stop provider.
    pub secondary: Arc<dyn UpstreamClient>,
    pub calendar: Arc<CalendarService>,
    pub pitstops: PitStopResources,
    pub fetch_concurrency: usize,
    pub pitstop_concurrency: usize,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/seasons/:season/calendar", get(get_calendar))
        .route("/seasons/:season/calendar/next", get(get_next_race))
        .route("/seasons/:season/calendar/previous", get(get_previous_races))
        .route("/seasons/:season/calendar/sprints", get(get_sprint_rounds))
        .route("/seasons/:season/standings/:kind", get(get_standings))
        .route("/seasons/:season/evolution/:kind", get(get_evolution))
        .route("/seasons/:season/rounds/:round/laps", get(get_laps))
        .route("/seasons/:season/rounds/:round/qualifying", get(get_qualifying))
        .route("/seasons/:season/rounds/:round/results", get(get_race_results))
        .route("/seasons/:season/rounds/:round/sprint", get(get_sprint_results))
        .route("/seasons/:season/pitstops", get(get_pitstops))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintRoundsResponse {
    pub season: u32,
    pub sprint_rounds: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn get_calendar(
    State(state): State<ApiState>,
    Path(season): Path<String>,
) -> Result<Json<Vec<Race>>, AppError> {
    let season = resolve_season(&season, Utc::now())?;
    Ok(Json(state.calendar.race_calendar(season).await))
}

async fn get_next_race(
    State(state): State<ApiState>,
    Path(season): Path<String>,
) -> Result<Json<Option<Race>>, AppError> {
    let now = Utc::now();
    let season = resolve_season(&season, now)?;
    Ok(Json(state.calendar.next_race(season, now).await))
}

async fn get_previous_races(
    State(state): State<ApiState>,
    Path(season): Path<String>,
) -> Result<Json<Vec<Race>>, AppError> {
    let now = Utc::now();
    let season = resolve_season(&season, now)?;
    Ok(Json(state.calendar.previous_races(season, now.date_naive()).await))
}

async fn get_sprint_rounds(
    State(state): State<ApiState>,
    Path(season): Path<String>,
) -> Result<Json<SprintRoundsResponse>, AppError> {
    let season = resolve_season(&season, Utc::now())?;
    let sprint_rounds = state.calendar.sprint_rounds(season).await;
    Ok(Json(SprintRoundsResponse { season, sprint_rounds }))
}

async fn get_standings(
    State(state): State<ApiState>,
    Path((season, kind)): Path<(String, String)>,
) -> Result<Json<StandingsTable>, AppError> {
    let kind: EntrantKind = kind.parse()?;
    let season = resolve_season(&season, Utc::now())?.to_string();
    Ok(Json(current_standings(state.primary.as_ref(), &season, kind).await?))
}

async fn get_evolution(
    State(state): State<ApiState>,
    Path((season, kind)): Path<(String, String)>,
) -> Result<Json<SeasonEvolution>, AppError> {
    let kind: EntrantKind = kind.parse()?;
    let season = resolve_season(&season, Utc::now())?.to_string();
    Ok(Json(build_evolution(state.primary.as_ref(), &season, kind).await?))
}

async fn get_laps(
    State(state): State<ApiState>,
    Path((season, round)): Path<(String, u32)>,
) -> Result<Json<LapReport>, AppError> {
    let (season, round) = round_params(&season, round)?;
    let report = build_lap_report(state.primary.as_ref(), &season, round, state.fetch_concurrency).await?;
    Ok(Json(report))
}

async fn get_qualifying(
    State(state): State<ApiState>,
    Path((season, round)): Path<(String, u32)>,
) -> Result<Json<QualifyingReport>, AppError> {
    let (season, round) = round_params(&season, round)?;
    Ok(Json(qualifying_results(state.primary.as_ref(), &season, round).await?))
}

async fn get_race_results(
    State(state): State<ApiState>,
    Path((season, round)): Path<(String, u32)>,
) -> Result<Json<SessionResults>, AppError> {
    let (season, round) = round_params(&season, round)?;
    let results = session_results(state.primary.as_ref(), &season, round, ResultSession::Race).await?;
    Ok(Json(results))
}

async fn get_sprint_results(
    State(state): State<ApiState>,
    Path((season, round)): Path<(String, u32)>,
) -> Result<Json<SessionResults>, AppError> {
    let (season, round) = round_params(&season, round)?;
    let results = session_results(state.primary.as_ref(), &season, round, ResultSession::Sprint).await?;
    Ok(Json(results))
}

/// Resolved season and a round numbered from 1.
fn round_params(season: &str, round: u32) -> Result<(String, u32), AppError> {
    if round == 0 {
        return Err(AppError::InvalidInput("round must be at least 1".to_string()));
    }
    Ok((resolve_season(season, Utc::now())?.to_string(), round))
}

/// Empty when the pit-stop provider is unconfigured or unavailable.
async fn get_pitstops(
    State(state): State<ApiState>,
    Path(season): Path<String>,
) -> Result<Json<Vec<PitStopAggregate>>, AppError> {
    let season = resolve_season(&season, Utc::now())?.to_string();
    let board = merge_events(
        state.secondary.as_ref(),
        &state.pitstops,
        &season,
        state.pitstop_concurrency,
    )
    .await;
    Ok(Json(board))
}
