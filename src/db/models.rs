use crate::types::Race;

/// Row type for the `races` table (see migrations/).
#[derive(Debug, sqlx::FromRow)]
pub struct RaceRow {
    pub season: i64,
    pub round: i64,
    pub race_name: String,
    pub circuit_id: String,
    pub circuit_name: String,
    pub locality: String,
    pub country: String,
    pub date: String,
    pub time: Option<String>,
    pub has_sprint: bool,
    pub meeting_code: Option<String>,
}

impl From<RaceRow> for Race {
    fn from(row: RaceRow) -> Self {
        Race {
            season: row.season as u32,
            round: row.round as u32,
            race_name: row.race_name,
            circuit_id: row.circuit_id,
            circuit_name: row.circuit_name,
            locality: row.locality,
            country: row.country,
            date: row.date,
            time: row.time,
            has_sprint: row.has_sprint,
            meeting_code: row.meeting_code,
        }
    }
}
