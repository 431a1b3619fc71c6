use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::config::STANDINGS_PAGE_SIZE;
use crate::error::Result;
use crate::types::{EntrantKind, StandingEntry, StandingRow, StandingsSnapshot, StandingsTable};
use crate::upstream::schema::StandingsTableDto;
use crate::upstream::UpstreamClient;

/// Standings for `season` after `round`, or the latest standings when `round`
/// is None. One request; a season's field always fits in a single page.
pub async fn fetch_standings<C>(
    client: &C,
    season: &str,
    round: Option<u32>,
    kind: EntrantKind,
) -> Result<StandingsSnapshot>
where
    C: UpstreamClient + ?Sized,
{
    let path = match round {
        Some(r) => format!("{season}/{r}/{}", kind.standings_resource()),
        None => format!("{season}/{}", kind.standings_resource()),
    };
    let page = client.fetch(&path, "Standings", STANDINGS_PAGE_SIZE, 0).await?;
    if page.total > page.limit {
        warn!(path = %path, total = page.total, limit = page.limit, "standings truncated by page size");
    }
    let table: StandingsTableDto = page.decode(&path)?.data;
    table.into_snapshot(season)
}

/// Final position for every entry, in entry order.
///
/// Classified entrants keep their number. Each unclassified entrant takes
/// the lowest number not claimed by a classified entrant or by an earlier
/// unclassified entrant of the same round.
pub fn assign_positions(entries: &[StandingEntry]) -> Vec<u32> {
    let claimed: HashSet<u32> = entries.iter().filter_map(|e| e.position).collect();

    let (positions, _, _) = entries.iter().fold(
        (Vec::with_capacity(entries.len()), claimed, 1u32),
        |(mut out, mut taken, mut next), entry| {
            match entry.position {
                Some(p) => out.push(p),
                None => {
                    while taken.contains(&next) {
                        next += 1;
                    }
                    taken.insert(next);
                    out.push(next);
                    next += 1;
                }
            }
            (out, taken, next)
        },
    );
    positions
}

/// Latest standings with each entrant's movement since the previous round.
pub async fn current_standings<C>(client: &C, season: &str, kind: EntrantKind) -> Result<StandingsTable>
where
    C: UpstreamClient + ?Sized,
{
    let snapshot = fetch_standings(client, season, None, kind).await?;

    let previous: HashMap<String, u32> = if snapshot.round > 1 {
        let prev = fetch_standings(client, &snapshot.season, Some(snapshot.round - 1), kind).await?;
        prev.entries
            .iter()
            .zip(assign_positions(&prev.entries))
            .map(|(e, pos)| (e.identity.id.clone(), pos))
            .collect()
    } else {
        HashMap::new()
    };

    let positions = assign_positions(&snapshot.entries);
    let rows: Vec<StandingRow> = snapshot
        .entries
        .into_iter()
        .zip(positions)
        .map(|(entry, position)| StandingRow {
            position_change: previous
                .get(&entry.identity.id)
                .map(|prev| *prev as i32 - position as i32),
            position,
            points: entry.points,
            wins: entry.wins,
            identity: entry.identity,
        })
        .collect();

    info!(
        season = %snapshot.season,
        round = snapshot.round,
        kind = %kind,
        entrants = rows.len(),
        "standings built"
    );

    Ok(StandingsTable { season: snapshot.season, round: snapshot.round, kind, rows })
}
