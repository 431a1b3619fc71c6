use tracing::{info, warn};

use super::laps::parse_lap_time;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::error::{AppError, Result};
use crate::types::{QualifyingReport, QualifyingRow, ResultRow, ResultSession, SessionResults, TimeRange};
use crate::upstream::schema::{parse_f64, RaceDto, RaceTableDto};
use crate::upstream::UpstreamClient;

/// Qualifying classification of a round with Q1/Q2/Q3 in seconds and the
/// range spanned by every time actually set.
///
/// A round that has not been run yet has no race entry and yields an empty
/// report.
pub async fn qualifying_results<C>(client: &C, season: &str, round: u32) -> Result<QualifyingReport>
where
    C: UpstreamClient + ?Sized,
{
    let path = format!("{season}/{round}/qualifying");
    let rows = match fetch_round(client, &path).await? {
        Some(race) => {
            let results = race
                .qualifying_results
                .ok_or_else(|| AppError::Malformed(format!("{path}: race has no QualifyingResults")))?;

            results
                .into_iter()
                .map(|q| -> Result<QualifyingRow> {
                    Ok(QualifyingRow {
                        position: q.position.as_deref().and_then(|p| p.trim().parse().ok()),
                        q1: session_time(q.q1.as_deref())?,
                        q2: session_time(q.q2.as_deref())?,
                        q3: session_time(q.q3.as_deref())?,
                        driver_id: q.driver.driver_id,
                        family_name: q.driver.family_name,
                        driver_code: q.driver.code,
                        constructor_id: q.constructor.constructor_id,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        }
        None => Vec::new(),
    };

    let range = time_range(&rows);
    info!(season = %season, round, drivers = rows.len(), min = range.min, max = range.max, "qualifying built");

    Ok(QualifyingReport { season: season.to_string(), round, rows, range })
}

/// Classification of a round's race or sprint.
pub async fn session_results<C>(
    client: &C,
    season: &str,
    round: u32,
    session: ResultSession,
) -> Result<SessionResults>
where
    C: UpstreamClient + ?Sized,
{
    let path = format!("{season}/{round}/{}", session.resource());
    let rows = match fetch_round(client, &path).await? {
        Some(race) => {
            let results = match session {
                ResultSession::Race => race.results,
                ResultSession::Sprint => race.sprint_results,
            }
            .ok_or_else(|| AppError::Malformed(format!("{path}: race has no {session} results")))?;

            results
                .into_iter()
                .map(|r| -> Result<ResultRow> {
                    Ok(ResultRow {
                        position: r.position.as_deref().and_then(|p| p.trim().parse().ok()),
                        position_text: r.position_text.unwrap_or_default(),
                        points: parse_f64(&r.points, "result points")?,
                        grid: r.grid.as_deref().and_then(|g| g.trim().parse().ok()),
                        laps: r.laps.as_deref().and_then(|l| l.trim().parse().ok()),
                        status: r.status,
                        time: r.time.map(|t| t.time),
                        driver_id: r.driver.driver_id,
                        family_name: r.driver.family_name,
                        driver_code: r.driver.code,
                        constructor_id: r.constructor.constructor_id,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        }
        None => Vec::new(),
    };

    info!(season = %season, round, session = %session, rows = rows.len(), "session results built");
    Ok(SessionResults { season: season.to_string(), round, session, rows })
}

/// Smallest and largest recorded session time; sessions without a time
/// take no part.
pub fn time_range(rows: &[QualifyingRow]) -> TimeRange {
    let times = rows.iter().flat_map(|r| [r.q1, r.q2, r.q3]).flatten();
    times
        .fold(None, |acc: Option<TimeRange>, t| {
            Some(match acc {
                Some(r) => TimeRange { min: r.min.min(t), max: r.max.max(t) },
                None => TimeRange { min: t, max: t },
            })
        })
        .unwrap_or(TimeRange { min: 0.0, max: 0.0 })
}

/// Missing or blank means no time was set.
fn session_time(raw: Option<&str>) -> Result<Option<f64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) => parse_lap_time(t).map(Some),
    }
}

/// A full field fits in one page; the first race entry, if any.
async fn fetch_round<C>(client: &C, path: &str) -> Result<Option<RaceDto>>
where
    C: UpstreamClient + ?Sized,
{
    let page = client.fetch(path, "Race", DEFAULT_PAGE_SIZE, 0).await?;
    if page.total > page.limit {
        warn!(path = %path, total = page.total, limit = page.limit, "results truncated by page size");
    }
    let table: RaceTableDto = page.decode(path)?.data;
    Ok(table.races.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::mock::{page, MockUpstream};
    use serde_json::{json, Value};

    fn qualifying_body(rows: Value) -> Value {
        json!({
            "season": "2024",
            "Races": [{
                "season": "2024", "round": "5", "raceName": "Chinese Grand Prix",
                "date": "2024-04-21",
                "QualifyingResults": rows
            }]
        })
    }

    fn qualifier(id: &str, position: u32, q1: Option<&str>, q2: Option<&str>, q3: Option<&str>) -> Value {
        let mut row = json!({
            "position": position.to_string(),
            "Driver": { "driverId": id, "code": id.to_uppercase(), "givenName": "Test", "familyName": id },
            "Constructor": { "constructorId": format!("team_{id}"), "name": "Team" }
        });
        for (key, time) in [("Q1", q1), ("Q2", q2), ("Q3", q3)] {
            if let Some(t) = time {
                row[key] = json!(t);
            }
        }
        row
    }

    fn row(q1: Option<f64>, q2: Option<f64>, q3: Option<f64>) -> QualifyingRow {
        QualifyingRow {
            position: None,
            driver_id: "d".into(),
            family_name: "D".into(),
            driver_code: None,
            constructor_id: "t".into(),
            q1,
            q2,
            q3,
        }
    }

    #[test]
    fn range_skips_sessions_without_time() {
        let rows = vec![row(Some(91.2), Some(90.4), Some(89.9)), row(Some(92.5), None, None)];
        assert_eq!(time_range(&rows), TimeRange { min: 89.9, max: 92.5 });
    }

    #[test]
    fn range_without_times_is_zero() {
        assert_eq!(time_range(&[row(None, None, None)]), TimeRange { min: 0.0, max: 0.0 });
        assert_eq!(time_range(&[]), TimeRange { min: 0.0, max: 0.0 });
    }

    #[tokio::test]
    async fn qualifying_converts_times_and_bounds_the_range() {
        let client = MockUpstream::new(|path, limit, offset| {
            assert_eq!(path, "2024/5/qualifying");
            Ok(page(
                qualifying_body(json!([
                    qualifier("verstappen", 1, Some("1:34.742"), Some("1:34.020"), Some("1:33.660")),
                    qualifier("perez", 2, Some("1:34.987"), Some("1:34.452"), Some("")),
                    qualifier("sargeant", 20, Some("1:36.110"), None, None),
                ])),
                3,
                limit,
                offset,
            ))
        });

        let report = qualifying_results(&client, "2024", 5).await.unwrap();
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[0].q3, Some(93.66));
        assert_eq!(report.rows[1].q3, None);
        assert_eq!(report.rows[2].q2, None);
        assert_eq!(report.rows[2].position, Some(20));
        assert_eq!(report.rows[0].driver_code.as_deref(), Some("VERSTAPPEN"));
        assert_eq!(report.range, TimeRange { min: 93.66, max: 96.11 });
    }

    #[tokio::test]
    async fn round_not_yet_run_is_empty() {
        let client = MockUpstream::new(|_, limit, offset| {
            Ok(page(json!({ "season": "2024", "Races": [] }), 0, limit, offset))
        });

        let report = qualifying_results(&client, "2024", 24).await.unwrap();
        assert!(report.rows.is_empty());
        assert_eq!(report.range, TimeRange { min: 0.0, max: 0.0 });
    }

    #[tokio::test]
    async fn garbled_session_time_is_malformed() {
        let client = MockUpstream::new(|_, limit, offset| {
            Ok(page(
                qualifying_body(json!([qualifier("hamilton", 1, Some("fast"), None, None)])),
                1,
                limit,
                offset,
            ))
        });

        let err = qualifying_results(&client, "2024", 5).await.unwrap_err();
        assert!(matches!(err, AppError::Malformed(_)));
    }

    fn classified(id: &str, position: &str, points: &str, time: Option<&str>, status: &str) -> Value {
        let mut row = json!({
            "position": position, "positionText": position, "points": points,
            "grid": "3", "laps": "56", "status": status,
            "Driver": { "driverId": id, "code": id.to_uppercase(), "givenName": "Test", "familyName": id },
            "Constructor": { "constructorId": format!("team_{id}"), "name": "Team" }
        });
        if let Some(t) = time {
            row["Time"] = json!({ "millis": "5700000", "time": t });
        }
        row
    }

    #[tokio::test]
    async fn race_and_sprint_read_their_own_lists() {
        let client = MockUpstream::new(|path, limit, offset| {
            let (key, rows) = match path {
                "2024/5/results" => (
                    "Results",
                    json!([
                        classified("verstappen", "1", "25", Some("1:40:52.554"), "Finished"),
                        classified("bottas", "20", "0", None, "Retired"),
                    ]),
                ),
                "2024/5/sprint" => ("SprintResults", json!([classified("hamilton", "1", "8", Some("32:04.660"), "Finished")])),
                other => panic!("unexpected path {other}"),
            };
            let mut race = json!({ "season": "2024", "round": "5", "raceName": "Chinese Grand Prix", "date": "2024-04-21" });
            race[key] = rows;
            Ok(page(json!({ "season": "2024", "Races": [race] }), 2, limit, offset))
        });

        let race = session_results(&client, "2024", 5, ResultSession::Race).await.unwrap();
        assert_eq!(race.session, ResultSession::Race);
        assert_eq!(race.rows.len(), 2);
        assert_eq!(race.rows[0].points, 25.0);
        assert_eq!(race.rows[0].time.as_deref(), Some("1:40:52.554"));
        assert_eq!(race.rows[1].time, None);
        assert_eq!(race.rows[1].status, "Retired");
        assert_eq!(race.rows[1].grid, Some(3));

        let sprint = session_results(&client, "2024", 5, ResultSession::Sprint).await.unwrap();
        assert_eq!(sprint.rows.len(), 1);
        assert_eq!(sprint.rows[0].driver_id, "hamilton");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn race_without_its_list_is_malformed() {
        let client = MockUpstream::new(|_, limit, offset| {
            Ok(page(
                json!({ "season": "2024", "Races": [{ "season": "2024", "round": "5", "date": "2024-04-21" }] }),
                1,
                limit,
                offset,
            ))
        });

        let err = session_results(&client, "2024", 5, ResultSession::Sprint).await.unwrap_err();
        assert!(matches!(err, AppError::Malformed(_)));
    }
}
