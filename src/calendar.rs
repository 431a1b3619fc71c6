use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_DELAY_STEP_MS, DEFAULT_PAGE_SIZE, NON_RACE_MEETING_KEYWORD, RACE_DURATION_HOURS};
use crate::db::RaceStore;
use crate::error::{AppError, Result};
use crate::fetcher::BatchFetcher;
use crate::types::{Meeting, Race};
use crate::upstream::schema::{MeetingDto, RaceTableDto};
use crate::upstream::UpstreamClient;

/// `"current"` → this UTC year; a plain year passes through.
pub fn resolve_season(season: &str, now: DateTime<Utc>) -> Result<u32> {
    if season.eq_ignore_ascii_case("current") {
        return Ok(now.year() as u32);
    }
    season
        .parse::<u32>()
        .ok()
        .filter(|y| (1950..=2100).contains(y))
        .ok_or_else(|| AppError::InvalidInput(format!("invalid season '{season}'")))
}

/// Race calendar with the persisted store in front of the primary provider.
///
/// A season with any persisted races is served from the store and never
/// reaches upstream. Otherwise the calendar is fetched, each race is tagged
/// with the telemetry provider's meeting code, and races are written back
/// one by one on a best-effort basis.
pub struct CalendarService {
    primary: Arc<dyn UpstreamClient>,
    telemetry: Arc<dyn UpstreamClient>,
    store: Arc<dyn RaceStore>,
    concurrency: usize,
}

impl CalendarService {
    pub fn new(
        primary: Arc<dyn UpstreamClient>,
        telemetry: Arc<dyn UpstreamClient>,
        store: Arc<dyn RaceStore>,
        concurrency: usize,
    ) -> Self {
        Self { primary, telemetry, store, concurrency }
    }

    /// Never fails: upstream trouble is logged and yields an empty calendar.
    pub async fn race_calendar(&self, season: u32) -> Vec<Race> {
        match self.try_race_calendar(season).await {
            Ok(races) => races,
            Err(e) => {
                warn!(season, "race calendar unavailable: {e}");
                Vec::new()
            }
        }
    }

    async fn try_race_calendar(&self, season: u32) -> Result<Vec<Race>> {
        match self.store.races_for_season(season).await {
            Ok(cached) if !cached.is_empty() => {
                debug!(season, races = cached.len(), "race calendar served from store");
                return Ok(cached);
            }
            Ok(_) => {}
            Err(e) => warn!(season, "race store read failed, treating as miss: {e}"),
        }

        let mut races = self.fetch_races(season).await?;
        self.attach_meeting_codes(season, &mut races).await;

        let mut persisted = 0usize;
        for race in &races {
            match self.store.upsert_race(race).await {
                Ok(()) => persisted += 1,
                Err(e) => warn!(season, round = race.round, "race persist failed: {e}"),
            }
        }

        info!(season, races = races.len(), persisted, "race calendar fetched from upstream");
        Ok(races)
    }

    async fn fetch_races(&self, season: u32) -> Result<Vec<Race>> {
        let path = format!("{season}/races");
        let first = self.primary.fetch(&path, "Race", DEFAULT_PAGE_SIZE, 0).await?;

        let fetcher = BatchFetcher::new(
            DEFAULT_PAGE_SIZE,
            self.concurrency,
            Duration::from_millis(DEFAULT_DELAY_STEP_MS),
        );
        let pages = fetcher.fetch_rest(self.primary.as_ref(), &path, "Race", first).await?;

        let mut races = Vec::new();
        for page in pages {
            let table: RaceTableDto = page.decode(&path)?.data;
            for dto in table.races {
                races.push(dto.into_race()?);
            }
        }
        races.sort_by_key(|r| r.round);
        Ok(races)
    }

    /// Failure to list meetings leaves every race without a code.
    async fn attach_meeting_codes(&self, season: u32, races: &mut [Race]) {
        let meetings = match self.list_meetings(season).await {
            Ok(m) => m,
            Err(e) => {
                warn!(season, "meeting list unavailable, skipping enrichment: {e}");
                return;
            }
        };

        let by_round: HashMap<u32, &Meeting> = meetings.iter().map(|m| (m.round, m)).collect();
        for race in races.iter_mut() {
            race.meeting_code = by_round.get(&race.round).and_then(|m| m.meeting_code.clone());
        }
    }

    /// Race weekends for `year`: testing events removed, ordered by start
    /// date, numbered from round 1.
    pub async fn list_meetings(&self, year: u32) -> Result<Vec<Meeting>> {
        let path = format!("meetings?year={year}");
        let page = self.telemetry.fetch(&path, "", 0, 0).await?;
        let mut meetings: Vec<MeetingDto> = page.decode(&path)?.data;

        meetings.retain(|m| !m.meeting_name.to_lowercase().contains(NON_RACE_MEETING_KEYWORD));
        // ISO 8601 timestamps with a common offset order lexicographically.
        meetings.sort_by(|a, b| a.date_start.cmp(&b.date_start));

        Ok(meetings
            .into_iter()
            .enumerate()
            .map(|(i, m)| Meeting {
                meeting_key: m.meeting_key,
                meeting_code: m.meeting_code,
                meeting_name: m.meeting_name,
                circuit_name: m.circuit_short_name,
                date_start: m.date_start,
                round: i as u32 + 1,
            })
            .collect())
    }

    /// First race that has not finished by `now`.
    pub async fn next_race(&self, season: u32, now: DateTime<Utc>) -> Option<Race> {
        let finish_window = chrono::Duration::hours(RACE_DURATION_HOURS);
        self.race_calendar(season)
            .await
            .into_iter()
            .find(|race| race_start(race).is_some_and(|start| start + finish_window >= now))
    }

    /// Races dated before `today`, most recent round first.
    pub async fn previous_races(&self, season: u32, today: NaiveDate) -> Vec<Race> {
        let mut races: Vec<Race> = self
            .race_calendar(season)
            .await
            .into_iter()
            .filter(|race| race_date(race).is_some_and(|d| d < today))
            .collect();
        races.sort_by(|a, b| b.round.cmp(&a.round));
        races
    }

    pub async fn sprint_rounds(&self, season: u32) -> Vec<u32> {
        self.race_calendar(season)
            .await
            .into_iter()
            .filter(|race| race.has_sprint)
            .map(|race| race.round)
            .collect()
    }
}

fn race_date(race: &Race) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&race.date, "%Y-%m-%d").ok()
}

/// Scheduled start in UTC; races without a time start at midnight.
fn race_start(race: &Race) -> Option<DateTime<Utc>> {
    let date = race_date(race)?;
    let time = race
        .time
        .as_deref()
        .and_then(|t| NaiveTime::parse_from_str(t.trim_end_matches('Z'), "%H:%M:%S").ok())
        .unwrap_or(NaiveTime::MIN);
    Some(date.and_time(time).and_utc())
}
