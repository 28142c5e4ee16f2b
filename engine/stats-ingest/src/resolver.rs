//! Player grouping and trade resolution
//!
//! A player who changed team mid-season shows up once per team, and some
//! providers add a synthetic roll-up row ("2TM", "3TM", "TOT") summing the
//! stints. Resolution collapses each player's rows into one statistics source
//! and one current team.
//!
//! The current team is the team of the non-aggregate row with the highest
//! provider record id. Providers assign ids in increasing order, so this is
//! taken as the most recent assignment. It is a heuristic: no transfer date is
//! available, and if a provider's id order stops tracking chronology the
//! current team will be wrong.

use crate::error::PipelineError;
use crate::models::StatRecord;
use std::collections::HashMap;
use tracing::{debug, warn};

/// One authoritative row per player
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlayer {
    pub player_id: String,
    pub player_name: String,
    /// Current team, derived independently of `record`
    pub team: String,
    /// Statistics source
    pub record: StatRecord,
}

/// True for provider roll-up rows such as "2TM" or "TOT"
pub fn is_aggregate_team(team: &str) -> bool {
    let team = team.trim();
    if team.eq_ignore_ascii_case("TOT") {
        return true;
    }
    match team.strip_suffix("TM") {
        Some(count) => !count.is_empty() && count.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Group records by player id, preserving first-seen order
pub fn group_by_player(records: Vec<StatRecord>) -> Vec<(String, Vec<StatRecord>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<StatRecord>)> = Vec::new();

    for record in records {
        match index.get(&record.player_id) {
            Some(&slot) => groups[slot].1.push(record),
            None => {
                index.insert(record.player_id.clone(), groups.len());
                groups.push((record.player_id.clone(), vec![record]));
            }
        }
    }

    groups
}

/// Resolve one player's group
pub fn resolve_group(player_id: &str, mut group: Vec<StatRecord>) -> Result<ResolvedPlayer, PipelineError> {
    // rows without an id cannot be told apart, so they never form a player
    if player_id.trim().is_empty() {
        return Err(PipelineError::Resolution {
            player_id: String::new(),
            reason: format!("{} records without a provider player id", group.len()),
        });
    }

    if group.len() == 1 {
        let record = group.remove(0);
        return Ok(ResolvedPlayer {
            player_id: record.player_id.clone(),
            player_name: record.player_name.clone(),
            team: record.team.clone(),
            record,
        });
    }

    let team = group
        .iter()
        .filter(|r| !is_aggregate_team(&r.team))
        .max_by_key(|r| r.record_id)
        .map(|r| r.team.clone())
        .ok_or_else(|| PipelineError::Resolution {
            player_id: player_id.to_string(),
            reason: format!("{} records but none tied to a single team", group.len()),
        })?;

    let source = match group.iter().position(|r| is_aggregate_team(&r.team)) {
        Some(aggregate) => aggregate,
        None => group
            .iter()
            .enumerate()
            .max_by_key(|(_, r)| (r.games, r.record_id))
            .map(|(i, _)| i)
            .ok_or_else(|| PipelineError::Resolution {
                player_id: player_id.to_string(),
                reason: "empty record group".to_string(),
            })?,
    };

    let record = group.swap_remove(source);
    debug!(
        player_id,
        source_team = %record.team,
        current_team = %team,
        stints = group.len() + 1,
        "Resolved traded player"
    );

    Ok(ResolvedPlayer {
        player_id: record.player_id.clone(),
        player_name: record.player_name.clone(),
        team,
        record,
    })
}

/// Resolve every player in one fetch cycle's records.
///
/// Players that cannot be resolved are logged and skipped.
pub fn resolve_players(records: Vec<StatRecord>) -> Vec<ResolvedPlayer> {
    let mut resolved = Vec::new();

    for (player_id, group) in group_by_player(records) {
        match resolve_group(&player_id, group) {
            Ok(player) => resolved.push(player),
            Err(e) => warn!(player_id = %player_id, error = %e, "Skipping unresolvable player"),
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryStats;
    use crate::testing::{nba_totals, nfl_record};

    #[test]
    fn test_aggregate_markers() {
        assert!(is_aggregate_team("2TM"));
        assert!(is_aggregate_team("3TM"));
        assert!(is_aggregate_team("TOT"));
        assert!(!is_aggregate_team("TM"));
        assert!(!is_aggregate_team("BOS"));
        assert!(!is_aggregate_team("OKC"));
    }

    #[test]
    fn test_aggregate_record_is_statistics_source() {
        let records = vec![
            nba_totals(12, "p1", "Traded Guy", "2TM", 70, 700),
            nba_totals(5, "p1", "Traded Guy", "A", 40, 420),
            nba_totals(9, "p1", "Traded Guy", "B", 30, 280),
        ];

        let resolved = resolve_players(records);
        assert_eq!(resolved.len(), 1);

        let player = &resolved[0];
        assert_eq!(player.record.team, "2TM");
        assert_eq!(player.record.games, 70);
        assert_eq!(player.team, "B");
        match &player.record.stats {
            CategoryStats::NbaTotals(totals) => assert_eq!(totals.points, 700),
            other => panic!("unexpected stats {:?}", other),
        }
    }

    #[test]
    fn test_most_games_without_aggregate() {
        let records = vec![
            nba_totals(5, "p1", "Traded Guy", "A", 20, 200),
            nba_totals(9, "p1", "Traded Guy", "B", 50, 480),
        ];

        let player = &resolve_players(records)[0];
        assert_eq!(player.record.games, 50);
        assert_eq!(player.record.team, "B");
        assert_eq!(player.team, "B");
    }

    #[test]
    fn test_source_and_team_computed_independently() {
        // the stint with more games is older than the latest assignment
        let records = vec![
            nba_totals(5, "p1", "Traded Guy", "A", 50, 500),
            nba_totals(9, "p1", "Traded Guy", "B", 20, 180),
        ];

        let player = &resolve_players(records)[0];
        assert_eq!(player.record.team, "A");
        assert_eq!(player.team, "B");
    }

    #[test]
    fn test_single_record_is_source_and_team() {
        let player = &resolve_players(vec![nba_totals(3, "p2", "Solo", "2TM", 10, 90)])[0];
        assert_eq!(player.team, "2TM");
        assert_eq!(player.record.record_id, 3);
    }

    #[test]
    fn test_group_without_team_record_is_skipped() {
        let records = vec![
            nba_totals(1, "bad", "Only Aggregates", "2TM", 10, 100),
            nba_totals(2, "bad", "Only Aggregates", "TOT", 10, 100),
            nba_totals(3, "good", "Fine", "MIA", 10, 100),
        ];

        let resolved = resolve_players(records);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].player_id, "good");
    }

    #[test]
    fn test_rows_without_player_id_are_skipped() {
        let records = vec![
            nfl_record(1, "", "Alpha", "KC", 8, 2000),
            nfl_record(2, "", "Beta", "BUF", 8, 1800),
            nfl_record(3, "q3", "Gamma", "MIA", 8, 1500),
        ];

        let resolved = resolve_players(records);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].player_id, "q3");
        assert!(resolve_group(" ", vec![nfl_record(4, " ", "Delta", "NYJ", 1, 10)]).is_err());
    }

    #[test]
    fn test_grouping_preserves_first_seen_order() {
        let records = vec![
            nba_totals(1, "b", "B", "BOS", 1, 1),
            nba_totals(2, "a", "A", "BOS", 1, 1),
            nba_totals(3, "b", "B", "NYK", 2, 2),
        ];

        let groups = group_by_player(records);
        let ids: Vec<&str> = groups.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(groups[0].1.len(), 2);
    }
}
