//! Typed wire shapes for each upstream resource, plus conversion into the
//! in-process model. Upstream payloads are loosely typed (numbers often
//! arrive as strings), so the lenient helpers below accept either form.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::error::{AppError, Result};
use crate::types::{EntrantIdentity, PitStopEventRecord, Race, StandingEntry, StandingsSnapshot};

/// Marker the primary provider puts in `positionText` for unclassified entrants.
pub const UNCLASSIFIED_POSITION_TEXT: &str = "-";

// ---------------------------------------------------------------------------
// Primary provider: races, laps
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RaceTableDto {
    #[serde(rename = "Races", default)]
    pub races: Vec<RaceDto>,
}

#[derive(Debug, Deserialize)]
pub struct RaceDto {
    #[serde(deserialize_with = "lenient_string")]
    pub season: String,
    #[serde(deserialize_with = "lenient_string")]
    pub round: String,
    #[serde(rename = "raceName", default)]
    pub race_name: String,
    #[serde(rename = "Circuit")]
    pub circuit: Option<CircuitDto>,
    #[serde(default)]
    pub date: String,
    pub time: Option<String>,
    #[serde(rename = "Sprint")]
    pub sprint: Option<serde_json::Value>,
    #[serde(rename = "Laps")]
    pub laps: Option<Vec<LapDto>>,
    #[serde(rename = "QualifyingResults")]
    pub qualifying_results: Option<Vec<QualifyingResultDto>>,
    #[serde(rename = "Results")]
    pub results: Option<Vec<ResultDto>>,
    #[serde(rename = "SprintResults")]
    pub sprint_results: Option<Vec<ResultDto>>,
}

#[derive(Debug, Deserialize)]
pub struct CircuitDto {
    #[serde(rename = "circuitId")]
    pub circuit_id: String,
    #[serde(rename = "circuitName", default)]
    pub circuit_name: String,
    #[serde(rename = "Location")]
    pub location: Option<LocationDto>,
}

#[derive(Debug, Deserialize)]
pub struct LocationDto {
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct LapDto {
    #[serde(deserialize_with = "lenient_string")]
    pub number: String,
    #[serde(rename = "Timings")]
    pub timings: Option<Vec<TimingDto>>,
}

#[derive(Debug, Deserialize)]
pub struct TimingDto {
    #[serde(rename = "driverId")]
    pub driver_id: String,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub position: Option<String>,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct QualifyingResultDto {
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub position: Option<String>,
    #[serde(rename = "Driver")]
    pub driver: DriverDto,
    #[serde(rename = "Constructor")]
    pub constructor: ConstructorDto,
    #[serde(rename = "Q1")]
    pub q1: Option<String>,
    #[serde(rename = "Q2")]
    pub q2: Option<String>,
    #[serde(rename = "Q3")]
    pub q3: Option<String>,
}

/// One classified row of a race or sprint.
#[derive(Debug, Deserialize)]
pub struct ResultDto {
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub position: Option<String>,
    #[serde(rename = "positionText", default, deserialize_with = "opt_lenient_string")]
    pub position_text: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub points: String,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub grid: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub laps: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "Driver")]
    pub driver: DriverDto,
    #[serde(rename = "Constructor")]
    pub constructor: ConstructorDto,
    #[serde(rename = "Time")]
    pub time: Option<ResultTimeDto>,
}

#[derive(Debug, Deserialize)]
pub struct ResultTimeDto {
    pub time: String,
}

impl RaceDto {
    pub fn into_race(self) -> Result<Race> {
        let season = parse_u32(&self.season, "race season")?;
        let round = parse_u32(&self.round, "race round")?;
        let circuit = self
            .circuit
            .ok_or_else(|| AppError::Malformed(format!("race {season}/{round} has no Circuit")))?;
        let (locality, country) = circuit
            .location
            .map(|l| (l.locality, l.country))
            .unwrap_or_default();

        Ok(Race {
            season,
            round,
            race_name: self.race_name,
            circuit_id: circuit.circuit_id,
            circuit_name: circuit.circuit_name,
            locality,
            country,
            date: self.date,
            time: self.time,
            has_sprint: self.sprint.is_some(),
            meeting_code: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Primary provider: standings
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StandingsTableDto {
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub season: Option<String>,
    #[serde(rename = "StandingsLists", default)]
    pub lists: Vec<StandingsListDto>,
}

#[derive(Debug, Deserialize)]
pub struct StandingsListDto {
    #[serde(deserialize_with = "lenient_string")]
    pub season: String,
    #[serde(deserialize_with = "lenient_string")]
    pub round: String,
    #[serde(rename = "DriverStandings")]
    pub driver_standings: Option<Vec<DriverStandingDto>>,
    #[serde(rename = "ConstructorStandings")]
    pub constructor_standings: Option<Vec<ConstructorStandingDto>>,
}

#[derive(Debug, Deserialize)]
pub struct DriverStandingDto {
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub position: Option<String>,
    #[serde(rename = "positionText", default, deserialize_with = "opt_lenient_string")]
    pub position_text: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub points: String,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub wins: Option<String>,
    #[serde(rename = "Driver")]
    pub driver: DriverDto,
    #[serde(rename = "Constructors", default)]
    pub constructors: Vec<ConstructorDto>,
}

#[derive(Debug, Deserialize)]
pub struct DriverDto {
    #[serde(rename = "driverId")]
    pub driver_id: String,
    pub code: Option<String>,
    #[serde(rename = "givenName", default)]
    pub given_name: String,
    #[serde(rename = "familyName", default)]
    pub family_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ConstructorStandingDto {
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub position: Option<String>,
    #[serde(rename = "positionText", default, deserialize_with = "opt_lenient_string")]
    pub position_text: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub points: String,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub wins: Option<String>,
    #[serde(rename = "Constructor")]
    pub constructor: ConstructorDto,
}

#[derive(Debug, Deserialize)]
pub struct ConstructorDto {
    #[serde(rename = "constructorId")]
    pub constructor_id: String,
    #[serde(default)]
    pub name: String,
}

impl StandingsTableDto {
    /// Normalise the first standings list. An empty `StandingsLists` means
    /// no round has been scored yet and yields an empty round-0 snapshot.
    pub fn into_snapshot(self, requested_season: &str) -> Result<StandingsSnapshot> {
        let Some(list) = self.lists.into_iter().next() else {
            return Ok(StandingsSnapshot {
                season: self.season.unwrap_or_else(|| requested_season.to_string()),
                round: 0,
                entries: Vec::new(),
            });
        };

        let round = parse_u32(&list.round, "standings round")?;
        let mut entries = Vec::new();

        if let Some(drivers) = list.driver_standings {
            for d in drivers {
                entries.push(StandingEntry {
                    position: classified_position(d.position.as_deref(), d.position_text.as_deref()),
                    points: parse_f64(&d.points, "driver points")?,
                    wins: parse_opt_u32(d.wins.as_deref(), "driver wins")?,
                    identity: EntrantIdentity {
                        display_name: format!("{} {}", d.driver.given_name, d.driver.family_name)
                            .trim()
                            .to_string(),
                        family_name: Some(d.driver.family_name),
                        short_code: d.driver.code,
                        constructor_id: d.constructors.last().map(|c| c.constructor_id.clone()),
                        id: d.driver.driver_id,
                    },
                });
            }
        } else if let Some(constructors) = list.constructor_standings {
            for c in constructors {
                entries.push(StandingEntry {
                    position: classified_position(c.position.as_deref(), c.position_text.as_deref()),
                    points: parse_f64(&c.points, "constructor points")?,
                    wins: parse_opt_u32(c.wins.as_deref(), "constructor wins")?,
                    identity: EntrantIdentity {
                        display_name: c.constructor.name,
                        family_name: None,
                        short_code: None,
                        constructor_id: Some(c.constructor.constructor_id.clone()),
                        id: c.constructor.constructor_id,
                    },
                });
            }
        } else {
            return Err(AppError::Malformed(format!(
                "standings list for round {round} has neither DriverStandings nor ConstructorStandings"
            )));
        }

        Ok(StandingsSnapshot { season: list.season, round, entries })
    }
}

/// Position for a classified entrant, None for the unclassified sentinel.
pub fn classified_position(position: Option<&str>, position_text: Option<&str>) -> Option<u32> {
    if position_text.map(str::trim) == Some(UNCLASSIFIED_POSITION_TEXT) {
        return None;
    }
    position.and_then(|p| p.trim().parse::<u32>().ok()).filter(|p| *p > 0)
}

// ---------------------------------------------------------------------------
// Telemetry provider
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MeetingDto {
    pub meeting_key: i64,
    pub meeting_code: Option<String>,
    #[serde(default)]
    pub meeting_name: String,
    pub circuit_short_name: Option<String>,
    #[serde(default)]
    pub date_start: String,
}

// ---------------------------------------------------------------------------
// Secondary provider
// ---------------------------------------------------------------------------

/// Seed response that locates the current event in the season.
#[derive(Debug, Deserialize)]
pub struct EventWindowDto {
    #[serde(deserialize_with = "lenient_u32")]
    pub sort: u32,
    #[serde(rename = "eventId", deserialize_with = "lenient_u32")]
    pub event_id: u32,
}

#[derive(Debug, Deserialize)]
pub struct EventChartDto {
    #[serde(default)]
    pub chart: Vec<PitStopDto>,
}

#[derive(Debug, Deserialize)]
pub struct PitStopDto {
    #[serde(rename = "driverNr", alias = "entrantNr", deserialize_with = "lenient_string")]
    pub entrant_nr: String,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    #[serde(default)]
    pub team: String,
    #[serde(default, deserialize_with = "opt_lenient_f64")]
    pub points: Option<f64>,
    #[serde(default, deserialize_with = "opt_lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub irregular: bool,
}

impl From<PitStopDto> for PitStopEventRecord {
    fn from(dto: PitStopDto) -> Self {
        Self {
            entrant_nr: dto.entrant_nr,
            first_name: dto.first_name,
            last_name: dto.last_name,
            team: dto.team,
            points: dto.points.unwrap_or(0.0),
            duration_seconds: dto.duration,
            irregular: dto.irregular,
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar parsing
// ---------------------------------------------------------------------------

pub fn parse_u32(s: &str, what: &str) -> Result<u32> {
    s.trim()
        .parse::<u32>()
        .map_err(|e| AppError::malformed(&format!("{what} '{s}'"), e))
}

pub fn parse_f64(s: &str, what: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|e| AppError::malformed(&format!("{what} '{s}'"), e))
}

fn parse_opt_u32(s: Option<&str>, what: &str) -> Result<u32> {
    s.map(|s| parse_u32(s, what)).transpose().map(Option::unwrap_or_default)
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected string or number, got {other}"))),
    }
}

fn opt_lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(D::Error::custom(format!("expected string or number, got {other}"))),
    }
}

fn opt_lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => Ok(n.as_f64()),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid number '{s}': {e}"))),
        other => Err(D::Error::custom(format!("expected number, got {other}"))),
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    let s = lenient_string(d)?;
    s.trim()
        .parse::<u32>()
        .map_err(|e| D::Error::custom(format!("invalid integer '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unclassified_sentinel_has_no_position() {
        assert_eq!(classified_position(Some("3"), Some("3")), Some(3));
        assert_eq!(classified_position(None, Some("-")), None);
        assert_eq!(classified_position(Some("21"), Some("-")), None);
        assert_eq!(classified_position(None, None), None);
    }

    #[test]
    fn driver_standings_normalise_to_snapshot() {
        let table: StandingsTableDto = serde_json::from_value(json!({
            "season": "2024",
            "StandingsLists": [{
                "season": "2024", "round": "5",
                "DriverStandings": [
                    {
                        "position": "1", "positionText": "1", "points": "110", "wins": "4",
                        "Driver": { "driverId": "max_verstappen", "code": "VER", "givenName": "Max", "familyName": "Verstappen" },
                        "Constructors": [{ "constructorId": "red_bull", "name": "Red Bull" }]
                    },
                    {
                        "positionText": "-", "points": "0", "wins": "0",
                        "Driver": { "driverId": "bearman", "givenName": "Oliver", "familyName": "Bearman" },
                        "Constructors": []
                    }
                ]
            }]
        }))
        .unwrap();

        let snap = table.into_snapshot("2024").unwrap();
        assert_eq!(snap.round, 5);
        assert_eq!(snap.entries.len(), 2);
        assert_eq!(snap.entries[0].position, Some(1));
        assert_eq!(snap.entries[0].identity.display_name, "Max Verstappen");
        assert_eq!(snap.entries[0].identity.short_code.as_deref(), Some("VER"));
        assert_eq!(snap.entries[0].identity.constructor_id.as_deref(), Some("red_bull"));
        assert_eq!(snap.entries[1].position, None);
        assert!(snap.entries[1].identity.constructor_id.is_none());
    }

    #[test]
    fn empty_standings_lists_is_round_zero() {
        let table: StandingsTableDto =
            serde_json::from_value(json!({ "season": "2025", "StandingsLists": [] })).unwrap();
        let snap = table.into_snapshot("current").unwrap();
        assert_eq!(snap.season, "2025");
        assert_eq!(snap.round, 0);
        assert!(snap.entries.is_empty());
    }

    #[test]
    fn pit_stop_accepts_numeric_or_string_fields() {
        let dto: PitStopDto = serde_json::from_value(json!({
            "driverNr": 44, "firstName": "Lewis", "lastName": "Hamilton", "team": "Ferrari",
            "points": "12", "duration": 2.31, "irregular": false
        }))
        .unwrap();
        let rec = PitStopEventRecord::from(dto);
        assert_eq!(rec.entrant_nr, "44");
        assert!((rec.points - 12.0).abs() < 1e-9);
        assert_eq!(rec.duration_seconds, Some(2.31));
    }

    #[test]
    fn race_without_circuit_is_malformed() {
        let dto: RaceDto = serde_json::from_value(json!({
            "season": "2024", "round": "1", "raceName": "Bahrain Grand Prix", "date": "2024-03-02"
        }))
        .unwrap();
        assert!(matches!(dto.into_race(), Err(AppError::Malformed(_))));
    }
}
