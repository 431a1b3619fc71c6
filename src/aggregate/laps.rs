use std::time::Duration;

use indexmap::IndexMap;
use tracing::info;

use super::standings::fetch_standings;
use crate::config::{FASTEST_LAPS_LIMIT, LAP_DELAY_STEP_MS, LAP_PAGE_SIZE};
use crate::error::{AppError, Result};
use crate::fetcher::BatchFetcher;
use crate::identity::IdentityMap;
use crate::types::{EntrantKind, LapReport, LapTiming, PageEnvelope};
use crate::upstream::schema::{parse_u32, RaceTableDto};
use crate::upstream::UpstreamClient;

/// Fetch every lap timing of a round and derive the per-driver best, the
/// lap-ordered ledger and the global top 20.
///
/// A one-record probe learns the total, then all pages are pulled through
/// the batch fetcher. Any page failure fails the report.
pub async fn build_lap_report<C>(
    client: &C,
    season: &str,
    round: u32,
    concurrency: usize,
) -> Result<LapReport>
where
    C: UpstreamClient + ?Sized,
{
    let standings = fetch_standings(client, season, None, EntrantKind::Drivers).await?;
    let identities = IdentityMap::from_snapshot(&standings);

    let path = format!("{season}/{round}/laps");
    let probe = client.fetch(&path, "Race", 1, 0).await?;

    let fetcher = BatchFetcher::new(
        LAP_PAGE_SIZE,
        concurrency,
        Duration::from_millis(LAP_DELAY_STEP_MS),
    );
    let pages = fetcher.fetch_all(client, &path, "Race", probe.total).await?;

    let mut ledger = Vec::new();
    for page in pages {
        ledger.extend(flatten_page(page, &path, &identities)?);
    }

    let report = LapReport {
        season: season.to_string(),
        round,
        drivers: best_per_driver(&ledger),
        fastest20: fastest(&ledger, FASTEST_LAPS_LIMIT),
        all_laps: by_lap_number(ledger),
    };

    info!(
        season = %season,
        round,
        total = probe.total,
        timings = report.all_laps.len(),
        drivers = report.drivers.len(),
        "lap report built"
    );
    Ok(report)
}

/// Turn one page's lap → timings nesting into flat timings.
fn flatten_page(
    page: PageEnvelope<serde_json::Value>,
    path: &str,
    identities: &IdentityMap,
) -> Result<Vec<LapTiming>> {
    let offset = page.offset;
    let table: RaceTableDto = page.decode(path)?.data;

    // An out-of-range page legitimately has no races.
    let Some(race) = table.races.into_iter().next() else {
        return Ok(Vec::new());
    };
    let laps = race
        .laps
        .ok_or_else(|| AppError::Malformed(format!("{path} offset {offset}: race has no Laps")))?;

    let mut out = Vec::new();
    for lap in laps {
        let lap_number = parse_u32(&lap.number, "lap number")?;
        let timings = lap.timings.ok_or_else(|| {
            AppError::Malformed(format!("{path} lap {lap_number}: missing Timings"))
        })?;

        for t in timings {
            let who = identities.lap_identity(&t.driver_id);
            out.push(LapTiming {
                time_seconds: parse_lap_time(&t.time)?,
                position: t.position.as_deref().and_then(|p| p.trim().parse().ok()),
                driver_id: t.driver_id,
                lap_number,
                constructor_id: who.constructor_id,
                family_name: who.family_name,
                driver_code: who.driver_code,
            });
        }
    }
    Ok(out)
}

/// `"1:23.456"` → `83.456`. A value without `:` is plain seconds.
pub fn parse_lap_time(s: &str) -> Result<f64> {
    let s = s.trim();
    let (minutes, seconds) = match s.split_once(':') {
        Some((m, sec)) => (
            m.parse::<u32>().map_err(|e| AppError::malformed(&format!("lap time '{s}'"), e))?,
            sec,
        ),
        None => (0, s),
    };
    let seconds: f64 = seconds
        .parse()
        .map_err(|e| AppError::malformed(&format!("lap time '{s}'"), e))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(AppError::Malformed(format!("lap time '{s}' out of range")));
    }
    Ok(round3(minutes as f64 * 60.0 + seconds))
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Fastest timing per driver, in first-seen driver order. Ties keep the
/// earlier timing.
pub fn best_per_driver(ledger: &[LapTiming]) -> Vec<LapTiming> {
    let mut best: IndexMap<&str, &LapTiming> = IndexMap::new();
    for t in ledger {
        best.entry(t.driver_id.as_str())
            .and_modify(|cur| {
                if t.time_seconds < cur.time_seconds {
                    *cur = t;
                }
            })
            .or_insert(t);
    }
    best.into_values().cloned().collect()
}

/// The `n` fastest timings, ascending. Equal times keep ledger order.
pub fn fastest(ledger: &[LapTiming], n: usize) -> Vec<LapTiming> {
    let mut sorted = ledger.to_vec();
    sorted.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
    sorted.truncate(n);
    sorted
}

fn by_lap_number(mut ledger: Vec<LapTiming>) -> Vec<LapTiming> {
    ledger.sort_by_key(|t| t.lap_number);
    ledger
}
