use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::db::models::RaceRow;
use crate::error::Result;
use crate::types::Race;

/// Persistent race calendar. Writes are idempotent upserts keyed by
/// `(season, round)`; concurrent writers simply last-write-win.
#[async_trait]
pub trait RaceStore: Send + Sync {
    async fn races_for_season(&self, season: u32) -> Result<Vec<Race>>;

    async fn upsert_race(&self, race: &Race) -> Result<()>;
}

pub struct SqliteRaceStore {
    pool: sqlx::SqlitePool,
}

impl SqliteRaceStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RaceStore for SqliteRaceStore {
    async fn races_for_season(&self, season: u32) -> Result<Vec<Race>> {
        let rows = sqlx::query_as::<_, RaceRow>(
            r#"
            SELECT season, round, race_name, circuit_id, circuit_name, locality, country,
                   date, time, has_sprint, meeting_code
            FROM races
            WHERE season = ?
            ORDER BY round ASC
            "#,
        )
        .bind(season as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Race::from).collect())
    }

    async fn upsert_race(&self, race: &Race) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO races (
                season, round, race_name, circuit_id, circuit_name, locality, country,
                date, time, has_sprint, meeting_code, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(season, round) DO UPDATE SET
                race_name = excluded.race_name,
                circuit_id = excluded.circuit_id,
                circuit_name = excluded.circuit_name,
                locality = excluded.locality,
                country = excluded.country,
                date = excluded.date,
                time = excluded.time,
                has_sprint = excluded.has_sprint,
                meeting_code = excluded.meeting_code,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(race.season as i64)
        .bind(race.round as i64)
        .bind(&race.race_name)
        .bind(&race.circuit_id)
        .bind(&race.circuit_name)
        .bind(&race.locality)
        .bind(&race.country)
        .bind(&race.date)
        .bind(&race.time)
        .bind(race.has_sprint)
        .bind(&race.meeting_code)
        .bind(now_secs())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
