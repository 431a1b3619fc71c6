use indexmap::IndexMap;
use tracing::{debug, info};

use super::standings::{assign_positions, fetch_standings};
use crate::error::Result;
use crate::identity::IdentityMap;
use crate::types::{EntrantKind, EvolutionSeries, RoundRecord, SeasonEvolution, StandingEntry};
use crate::upstream::UpstreamClient;

/// Rebuild every entrant's round-by-round position and points for a season.
///
/// The number of rounds comes from the latest standings snapshot. Rounds are
/// then fetched one request at a time in ascending order, so the series are
/// emitted in round order. Any upstream failure fails the whole evolution.
pub async fn build_evolution<C>(client: &C, season: &str, kind: EntrantKind) -> Result<SeasonEvolution>
where
    C: UpstreamClient + ?Sized,
{
    let snapshot = fetch_standings(client, season, None, kind).await?;
    let identities = IdentityMap::from_snapshot(&snapshot);
    let total_rounds = snapshot.round;

    let mut series: IndexMap<String, EvolutionSeries> = IndexMap::new();
    for round in 1..=total_rounds {
        let standings = fetch_standings(client, &snapshot.season, Some(round), kind).await?;
        fold_round(&mut series, &identities, round, &standings.entries);
        debug!(season = %snapshot.season, round, entrants = standings.entries.len(), "evolution round folded");
    }

    info!(
        season = %snapshot.season,
        kind = %kind,
        total_rounds,
        series = series.len(),
        "evolution built"
    );

    Ok(SeasonEvolution {
        season: snapshot.season,
        kind,
        total_rounds,
        series: series.into_values().collect(),
    })
}

/// Append one round's standings to the series, creating a series on an
/// entrant's first appearance. A second row for the same entrant in the
/// same round is ignored.
pub fn fold_round(
    series: &mut IndexMap<String, EvolutionSeries>,
    identities: &IdentityMap,
    round: u32,
    entries: &[StandingEntry],
) {
    let positions = assign_positions(entries);

    for (entry, position) in entries.iter().zip(positions) {
        let s = series
            .entry(entry.identity.id.clone())
            .or_insert_with(|| EvolutionSeries {
                entrant_id: entry.identity.id.clone(),
                identity: identities.resolve_or(&entry.identity),
                rounds: Vec::new(),
            });

        let (position_change, points_gained) = match s.rounds.last() {
            Some(prev) if prev.round >= round => continue,
            Some(prev) => (prev.position as i32 - position as i32, entry.points - prev.points),
            None => (0, entry.points),
        };

        s.rounds.push(RoundRecord {
            round,
            position,
            points: entry.points,
            position_change,
            points_gained,
        });
    }
}
