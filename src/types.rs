use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Upstream envelope
// ---------------------------------------------------------------------------

/// One bounded slice of an upstream result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub data: T,
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
}

impl PageEnvelope<serde_json::Value> {
    /// Decode the loose payload into a typed resource, failing with
    /// `Malformed` when the shape does not match.
    pub fn decode<T: serde::de::DeserializeOwned>(
        self,
        resource: &str,
    ) -> crate::error::Result<PageEnvelope<T>> {
        let data = serde_json::from_value(self.data)
            .map_err(|e| crate::error::AppError::malformed(resource, e))?;
        Ok(PageEnvelope {
            data,
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

// ---------------------------------------------------------------------------
// Entrants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrantKind {
    Drivers,
    Constructors,
}

impl EntrantKind {
    /// Resource segment used by the primary provider.
    pub fn standings_resource(self) -> &'static str {
        match self {
            EntrantKind::Drivers => "driverStandings",
            EntrantKind::Constructors => "constructorStandings",
        }
    }
}

impl std::fmt::Display for EntrantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntrantKind::Drivers => "drivers",
            EntrantKind::Constructors => "constructors",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for EntrantKind {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "drivers" => Ok(EntrantKind::Drivers),
            "constructors" => Ok(EntrantKind::Constructors),
            other => Err(crate::error::AppError::InvalidInput(format!(
                "unknown entrant kind '{other}' (expected drivers or constructors)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrantIdentity {
    pub id: String,
    pub display_name: String,
    /// Family name for drivers; None for constructors.
    pub family_name: Option<String>,
    pub short_code: Option<String>,
    pub constructor_id: Option<String>,
}

impl EntrantIdentity {
    /// Identity for an id nothing is known about.
    pub fn bare(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
            family_name: None,
            short_code: None,
            constructor_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

/// One standings row after normalisation. `position` is None when the
/// provider marks the entrant as unclassified.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingEntry {
    pub identity: EntrantIdentity,
    pub position: Option<u32>,
    pub points: f64,
    pub wins: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandingsSnapshot {
    pub season: String,
    /// Last round included in the snapshot (0 before the season starts).
    pub round: u32,
    pub entries: Vec<StandingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingRow {
    pub position: u32,
    pub points: f64,
    pub wins: u32,
    pub identity: EntrantIdentity,
    /// Previous position minus current; positive means places gained.
    pub position_change: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsTable {
    pub season: String,
    pub round: u32,
    pub kind: EntrantKind,
    pub rows: Vec<StandingRow>,
}

// ---------------------------------------------------------------------------
// Evolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round: u32,
    pub position: u32,
    pub points: f64,
    /// Previous round's position minus this one; 0 on first appearance.
    pub position_change: i32,
    /// Points minus previous round's points; equals `points` on first appearance.
    pub points_gained: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionSeries {
    pub entrant_id: String,
    pub identity: EntrantIdentity,
    pub rounds: Vec<RoundRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonEvolution {
    pub season: String,
    pub kind: EntrantKind,
    pub total_rounds: u32,
    pub series: Vec<EvolutionSeries>,
}

// ---------------------------------------------------------------------------
// Laps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LapTiming {
    pub driver_id: String,
    pub lap_number: u32,
    /// Running position at the end of the lap, when reported.
    pub position: Option<u32>,
    /// Seconds, rounded to 3 decimals.
    pub time_seconds: f64,
    pub constructor_id: String,
    pub family_name: String,
    pub driver_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LapReport {
    pub season: String,
    pub round: u32,
    /// Best lap per driver, in first-seen driver order.
    pub drivers: Vec<LapTiming>,
    /// Every timing, ordered by lap number.
    pub all_laps: Vec<LapTiming>,
    /// Fastest timings overall, ascending by time.
    pub fastest20: Vec<LapTiming>,
}

// ---------------------------------------------------------------------------
// Session results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifyingRow {
    pub position: Option<u32>,
    pub driver_id: String,
    pub family_name: String,
    pub driver_code: Option<String>,
    pub constructor_id: String,
    /// Seconds per session; None when the driver did not set a time.
    pub q1: Option<f64>,
    pub q2: Option<f64>,
    pub q3: Option<f64>,
}

/// Bounds over every recorded qualifying time, `{0, 0}` when there are none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifyingReport {
    pub season: String,
    pub round: u32,
    pub rows: Vec<QualifyingRow>,
    pub range: TimeRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSession {
    Race,
    Sprint,
}

impl ResultSession {
    /// Resource segment used by the primary provider.
    pub fn resource(self) -> &'static str {
        match self {
            ResultSession::Race => "results",
            ResultSession::Sprint => "sprint",
        }
    }
}

impl std::fmt::Display for ResultSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResultSession::Race => "race",
            ResultSession::Sprint => "sprint",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub position: Option<u32>,
    /// Provider's label: a number, or `R`/`D`/`W` etc. for non-finishers.
    pub position_text: String,
    pub driver_id: String,
    pub family_name: String,
    pub driver_code: Option<String>,
    pub constructor_id: String,
    pub grid: Option<u32>,
    pub laps: Option<u32>,
    pub status: String,
    pub points: f64,
    /// Race time or gap to the winner, for classified finishers.
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResults {
    pub season: String,
    pub round: u32,
    pub session: ResultSession,
    pub rows: Vec<ResultRow>,
}

// ---------------------------------------------------------------------------
// Pit stops (secondary provider)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitStopEventRecord {
    pub entrant_nr: String,
    pub first_name: String,
    pub last_name: String,
    pub team: String,
    pub points: f64,
    pub duration_seconds: Option<f64>,
    /// Irregular stops (penalties, drive-throughs) are excluded from averages.
    pub irregular: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PitStopAggregate {
    pub entrant_nr: String,
    pub first_name: String,
    pub last_name: String,
    pub team: String,
    pub points: f64,
    pub avg_duration_seconds: f64,
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub season: u32,
    pub round: u32,
    pub race_name: String,
    pub circuit_id: String,
    pub circuit_name: String,
    pub locality: String,
    pub country: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SSZ`, when scheduled
    pub time: Option<String>,
    pub has_sprint: bool,
    /// Telemetry provider's code for the same weekend, when it could be matched.
    pub meeting_code: Option<String>,
}

/// Race weekend as listed by the telemetry provider, with its derived round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub meeting_key: i64,
    pub meeting_code: Option<String>,
    pub meeting_name: String,
    pub circuit_name: Option<String>,
    pub date_start: String,
    pub round: u32,
}
