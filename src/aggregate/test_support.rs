use serde_json::{json, Value};

use crate::error::AppError;
use crate::upstream::mock::{page, MockUpstream};

/// Mock answering whole-resource paths; unknown paths fail with 404.
pub fn standings_mock(route: impl Fn(&str) -> Option<Value> + Send + Sync + 'static) -> MockUpstream {
    MockUpstream::new(move |path, limit, offset| match route(path) {
        Some(data) => Ok(page(data, 1, limit, offset)),
        None => Err(AppError::Upstream { status: 404, message: format!("no fixture for {path}") }),
    })
}

/// `StandingsTable` body for drivers; `None` positions are written as the
/// unclassified sentinel.
pub fn driver_standings_body(season: &str, round: u32, rows: &[(&str, Option<u32>, f64)]) -> Value {
    let standings: Vec<Value> = rows
        .iter()
        .map(|(id, position, points)| {
            let mut row = json!({
                "positionText": position.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
                "points": points.to_string(),
                "wins": "0",
                "Driver": {
                    "driverId": id,
                    "code": id.to_uppercase(),
                    "givenName": "Test",
                    "familyName": id,
                },
                "Constructors": [{ "constructorId": format!("team_{id}"), "name": "Team" }],
            });
            if let Some(p) = position {
                row["position"] = json!(p.to_string());
            }
            row
        })
        .collect();

    json!({
        "season": season,
        "StandingsLists": [{
            "season": season,
            "round": round.to_string(),
            "DriverStandings": standings,
        }]
    })
}
