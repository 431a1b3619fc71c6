use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_DELAY_STEP_MS};
use crate::error::Result;
use crate::fetcher::run_staggered;
use crate::types::{PitStopAggregate, PitStopEventRecord};
use crate::upstream::schema::{EventChartDto, EventWindowDto};
use crate::upstream::UpstreamClient;

/// Resource ids on the secondary provider.
#[derive(Debug, Clone, Default)]
pub struct PitStopResources {
    /// Seed resource whose response carries `{sort, eventId}`.
    pub seed_id: String,
    /// Per-event chart resource, queried with `?event=<id>`.
    pub chart_id: String,
}

impl PitStopResources {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            seed_id: cfg.dhl_avg_pitstop_id.clone(),
            chart_id: cfg.dhl_pitstop_event_id.clone(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.seed_id.is_empty() && !self.chart_id.is_empty()
    }
}

/// Season-to-date pit-stop scoreboard, highest cumulative points first.
///
/// Failures are logged and reported as an empty board; callers treat that
/// as "not available".
pub async fn merge_events<C>(
    client: &C,
    resources: &PitStopResources,
    season: &str,
    concurrency: usize,
) -> Vec<PitStopAggregate>
where
    C: UpstreamClient + ?Sized,
{
    if !resources.is_configured() {
        debug!("pit-stop resources not configured");
        return Vec::new();
    }

    match try_merge_events(client, resources, season, concurrency).await {
        Ok(board) => {
            info!(season = %season, entrants = board.len(), "pit-stop board built");
            board
        }
        Err(e) => {
            warn!(season = %season, "pit-stop merge failed: {e}");
            Vec::new()
        }
    }
}

async fn try_merge_events<C>(
    client: &C,
    resources: &PitStopResources,
    season: &str,
    concurrency: usize,
) -> Result<Vec<PitStopAggregate>>
where
    C: UpstreamClient + ?Sized,
{
    let seed_path = format!("{}?season={season}", resources.seed_id);
    let seed: EventWindowDto = client.fetch(&seed_path, "", 1, 0).await?.decode(&seed_path)?.data;
    let events = event_window(seed.sort, seed.event_id);
    debug!(season = %season, events = ?events, "pit-stop event window");

    let charts = run_staggered(
        events,
        concurrency,
        Duration::from_millis(DEFAULT_DELAY_STEP_MS),
        move |event_id| async move {
            let path = format!("{}?event={event_id}", resources.chart_id);
            let chart: EventChartDto = client.fetch(&path, "", 1, 0).await?.decode(&path)?.data;
            Ok(chart.chart)
        },
    )
    .await?;

    Ok(fold_records(
        charts.into_iter().flatten().map(PitStopEventRecord::from),
    ))
}

/// The last `sort` events up to and including `event_id`.
pub fn event_window(sort: u32, event_id: u32) -> Vec<u32> {
    if sort == 0 {
        return Vec::new();
    }
    let first = event_id.saturating_add(1).saturating_sub(sort).max(1);
    (first..=event_id).collect()
}

#[derive(Debug)]
struct Accumulator {
    record: PitStopEventRecord,
    points: f64,
    duration_total: f64,
    timed_stops: u32,
}

/// Fold per-event records into one row per entrant. Points add up across
/// all records; the average duration only counts regular, timed stops.
pub fn fold_records(records: impl IntoIterator<Item = PitStopEventRecord>) -> Vec<PitStopAggregate> {
    let mut by_entrant: IndexMap<String, Accumulator> = IndexMap::new();

    for rec in records {
        let timed = match rec.duration_seconds {
            Some(d) if !rec.irregular => Some(d),
            _ => None,
        };
        let points = rec.points;
        let acc = by_entrant
            .entry(rec.entrant_nr.clone())
            .or_insert_with(|| Accumulator {
                record: rec,
                points: 0.0,
                duration_total: 0.0,
                timed_stops: 0,
            });
        acc.points += points;
        if let Some(d) = timed {
            acc.duration_total += d;
            acc.timed_stops += 1;
        }
    }

    let mut board: Vec<PitStopAggregate> = by_entrant
        .into_values()
        .map(|acc| PitStopAggregate {
            avg_duration_seconds: if acc.timed_stops == 0 {
                0.0
            } else {
                acc.duration_total / acc.timed_stops as f64
            },
            entrant_nr: acc.record.entrant_nr,
            first_name: acc.record.first_name,
            last_name: acc.record.last_name,
            team: acc.record.team,
            points: acc.points,
        })
        .collect();

    board.sort_by(|a, b| b.points.total_cmp(&a.points));
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::upstream::mock::{page, MockUpstream};
    use serde_json::json;

    fn rec(nr: &str, points: f64, duration: Option<f64>, irregular: bool) -> PitStopEventRecord {
        PitStopEventRecord {
            entrant_nr: nr.into(),
            first_name: "First".into(),
            last_name: format!("Driver{nr}"),
            team: "Team".into(),
            points,
            duration_seconds: duration,
            irregular,
        }
    }

    fn resources() -> PitStopResources {
        PitStopResources { seed_id: "avg".into(), chart_id: "event".into() }
    }

    #[test]
    fn irregular_stops_are_excluded_from_average() {
        let board = fold_records(vec![rec("16", 5.0, Some(100.0), true), rec("16", 3.0, Some(20.0), false)]);
        assert_eq!(board.len(), 1);
        assert!((board[0].avg_duration_seconds - 20.0).abs() < 1e-9);
        assert!((board[0].points - 8.0).abs() < 1e-9);
    }

    #[test]
    fn no_timed_stop_averages_to_zero() {
        let board = fold_records(vec![rec("4", 1.0, None, false), rec("4", 0.0, Some(30.0), true)]);
        assert_eq!(board[0].avg_duration_seconds, 0.0);
    }

    #[test]
    fn board_is_ordered_by_points() {
        let board = fold_records(vec![rec("1", 2.0, None, false), rec("44", 10.0, None, false), rec("1", 1.0, None, false)]);
        let order: Vec<&str> = board.iter().map(|a| a.entrant_nr.as_str()).collect();
        assert_eq!(order, vec!["44", "1"]);
    }

    #[test]
    fn window_covers_last_sort_events() {
        assert_eq!(event_window(3, 12), vec![10, 11, 12]);
        assert_eq!(event_window(1, 7), vec![7]);
        assert_eq!(event_window(5, 2), vec![1, 2]);
        assert!(event_window(0, 9).is_empty());
    }

    #[tokio::test]
    async fn merges_every_event_in_window() {
        let client = MockUpstream::new(|path, limit, offset| {
            let data = match path {
                "avg?season=2024" => json!({ "sort": 3, "eventId": 12, "chart": [] }),
                "event?event=10" => json!({ "chart": [
                    { "driverNr": "16", "firstName": "Charles", "lastName": "Leclerc", "team": "Ferrari", "points": 10, "duration": 2.2, "irregular": false }
                ]}),
                "event?event=11" => json!({ "chart": [
                    { "driverNr": "16", "firstName": "Charles", "lastName": "Leclerc", "team": "Ferrari", "points": 5, "duration": 30.0, "irregular": true },
                    { "driverNr": 1, "firstName": "Max", "lastName": "Verstappen", "team": "Red Bull", "points": 8, "duration": "2.0", "irregular": false }
                ]}),
                "event?event=12" => json!({ "chart": [
                    { "driverNr": "16", "firstName": "Charles", "lastName": "Leclerc", "team": "Ferrari", "points": 2, "duration": 2.4, "irregular": false }
                ]}),
                other => return Err(AppError::Upstream { status: 404, message: other.to_string() }),
            };
            Ok(page(data, 1, limit, offset))
        });

        let board = merge_events(&client, &resources(), "2024", 4).await;
        assert_eq!(client.call_count(), 4);
        assert_eq!(board.len(), 2);

        let lec = &board[0];
        assert_eq!(lec.entrant_nr, "16");
        assert!((lec.points - 17.0).abs() < 1e-9);
        assert!((lec.avg_duration_seconds - 2.3).abs() < 1e-9);

        assert_eq!(board[1].entrant_nr, "1");
        assert!((board[1].avg_duration_seconds - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failure_yields_empty_board() {
        let client = MockUpstream::new(|path, limit, offset| match path {
            "avg?season=2024" => Ok(page(json!({ "sort": 2, "eventId": 5 }), 1, limit, offset)),
            _ => Err(AppError::Upstream { status: 500, message: "Internal Server Error".into() }),
        });

        let board = merge_events(&client, &resources(), "2024", 4).await;
        assert!(board.is_empty());
    }

    #[tokio::test]
    async fn unconfigured_resources_skip_the_provider() {
        let client = MockUpstream::new(|_, limit, offset| Ok(page(json!({}), 0, limit, offset)));
        let board = merge_events(&client, &PitStopResources::default(), "2024", 4).await;
        assert!(board.is_empty());
        assert_eq!(client.call_count(), 0);
    }
}
