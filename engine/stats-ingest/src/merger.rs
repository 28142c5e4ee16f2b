//! Season-scoped merge of one statistics category into a detail document

use crate::error::{PipelineError, Result};
use crate::models::*;
use crate::resolver::ResolvedPlayer;
use crate::store::StatsStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// What a merge did to the stored document
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub created_document: bool,
    pub created_entry: bool,
    /// False when the record carried no usable values for its category
    pub category_written: bool,
    pub document: PlayerSeasonStats,
}

/// Result of applying a record to a document in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub created_entry: bool,
    pub category_written: bool,
}

/// Merge `resolved` into `doc` for `(record.season, phase)`.
///
/// Season metadata is always overwritten; only the category block carried by
/// the record is replaced, sibling blocks are left as stored.
pub fn apply_record(
    doc: &mut PlayerSeasonStats,
    resolved: &ResolvedPlayer,
    phase: Phase,
    updated_at: DateTime<Utc>,
) -> Result<Applied> {
    let record = &resolved.record;
    let season = record.season;

    let applied = match (&mut doc.history, &record.stats) {
        (SeasonHistory::Nba { regular_seasons, playoffs }, stats @ (CategoryStats::NbaTotals(_) | CategoryStats::NbaAdvanced(_))) => {
            let seasons = match phase {
                Phase::Regular => regular_seasons,
                Phase::Playoffs => playoffs,
            };
            let created_entry = !seasons.contains_key(&season);
            let entry = nba_entry_mut(seasons, season, resolved, updated_at);
            entry.team = resolved.team.clone();
            entry.position = record.position.clone();
            entry.age = record.age;
            entry.last_updated = updated_at;

            let category_written = match stats {
                CategoryStats::NbaTotals(totals) => {
                    entry.totals = Some(totals.clone());
                    true
                }
                CategoryStats::NbaAdvanced(advanced) if advanced.is_empty() => false,
                CategoryStats::NbaAdvanced(advanced) => {
                    entry.advanced = Some(advanced.clone());
                    true
                }
                _ => unreachable!("matched above"),
            };
            Applied { created_entry, category_written }
        }
        (SeasonHistory::Soccer { seasons }, CategoryStats::Soccer(stats)) => {
            if phase != Phase::Regular {
                return Err(PipelineError::merge(
                    &resolved.player_id,
                    format!("soccer history has no {phase} phase"),
                ));
            }
            let created_entry = !seasons.contains_key(&season);
            let entry = seasons.entry(season).or_insert_with(|| SoccerSeasonEntry {
                season,
                team: resolved.team.clone(),
                position: None,
                age: None,
                stats: None,
                last_updated: updated_at,
            });
            entry.team = resolved.team.clone();
            entry.position = record.position.clone();
            entry.age = record.age;
            entry.last_updated = updated_at;
            entry.stats = Some(stats.clone());
            Applied { created_entry, category_written: true }
        }
        (_, stats) => {
            return Err(PipelineError::merge(
                &resolved.player_id,
                format!("{} record does not fit a {} document", stats.category(), doc.league),
            ));
        }
    };

    if !resolved.player_name.is_empty() {
        doc.name = resolved.player_name.clone();
    }

    Ok(applied)
}

fn nba_entry_mut<'a>(
    seasons: &'a mut BTreeMap<i32, NbaSeasonEntry>,
    season: i32,
    resolved: &ResolvedPlayer,
    updated_at: DateTime<Utc>,
) -> &'a mut NbaSeasonEntry {
    seasons.entry(season).or_insert_with(|| NbaSeasonEntry {
        season,
        team: resolved.team.clone(),
        position: None,
        age: None,
        totals: None,
        advanced: None,
        last_updated: updated_at,
    })
}

/// Loads, merges and saves detail documents
pub struct SeasonMerger {
    store: Arc<dyn StatsStore>,
}

impl SeasonMerger {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self { store }
    }

    /// Merge one resolved player's record into the stored detail document,
    /// creating the document or season entry when missing.
    pub async fn merge(
        &self,
        league: League,
        resolved: &ResolvedPlayer,
        phase: Phase,
        updated_at: DateTime<Utc>,
    ) -> Result<MergeOutcome> {
        let existing = self.store.get_season_stats(league, &resolved.player_id).await?;
        let created_document = existing.is_none();

        let mut document = match existing {
            Some(document) => document,
            None => {
                if resolved.player_id.is_empty() || resolved.player_name.is_empty() {
                    return Err(PipelineError::merge(
                        &resolved.player_id,
                        "a new detail document needs both player id and name",
                    ));
                }
                PlayerSeasonStats::new(league, &resolved.player_id, &resolved.player_name).ok_or_else(|| {
                    PipelineError::merge(&resolved.player_id, format!("{league} keeps no season history"))
                })?
            }
        };

        let applied = apply_record(&mut document, resolved, phase, updated_at)?;
        self.store.save_season_stats(&document).await?;

        debug!(
            league = %league,
            player_id = %resolved.player_id,
            season = resolved.record.season,
            phase = %phase,
            category = %resolved.record.stats.category(),
            created_document,
            created_entry = applied.created_entry,
            "Merged season stats"
        );

        Ok(MergeOutcome {
            created_document,
            created_entry: applied.created_entry,
            category_written: applied.category_written,
            document,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve_players;
    use crate::store::InMemoryStore;
    use crate::testing::{fixed_time, nba_advanced, nba_totals, nfl_record, soccer_record};

    fn resolved(record: StatRecord) -> ResolvedPlayer {
        resolve_players(vec![record]).remove(0)
    }

    fn merger() -> (SeasonMerger, InMemoryStore) {
        let store = InMemoryStore::new();
        (SeasonMerger::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_merge_creates_document_and_entry() {
        let (merger, store) = merger();
        let player = resolved(nba_totals(1, "p1", "Jay Tatum", "BOS", 60, 1600));

        let outcome = merger.merge(League::Nba, &player, Phase::Regular, fixed_time()).await.unwrap();
        assert!(outcome.created_document);
        assert!(outcome.created_entry);

        let doc = store.get_season_stats(League::Nba, "p1").await.unwrap().unwrap();
        let entry = doc.nba_entry(2025, Phase::Regular).unwrap();
        assert_eq!(entry.team, "BOS");
        assert_eq!(entry.totals.as_ref().unwrap().points, 1600);
        assert!(entry.advanced.is_none());
        assert!(doc.nba_entry(2025, Phase::Playoffs).is_none());
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let (merger, store) = merger();
        let player = resolved(nba_totals(1, "p1", "Jay Tatum", "BOS", 60, 1600));

        merger.merge(League::Nba, &player, Phase::Regular, fixed_time()).await.unwrap();
        let once = serde_json::to_vec(&store.get_season_stats(League::Nba, "p1").await.unwrap()).unwrap();

        let outcome = merger.merge(League::Nba, &player, Phase::Regular, fixed_time()).await.unwrap();
        let twice = serde_json::to_vec(&store.get_season_stats(League::Nba, "p1").await.unwrap()).unwrap();

        assert!(!outcome.created_document);
        assert!(!outcome.created_entry);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_advanced_merge_leaves_totals_untouched() {
        let (merger, store) = merger();
        let totals = resolved(nba_totals(1, "p1", "Jay Tatum", "BOS", 60, 1600));
        merger.merge(League::Nba, &totals, Phase::Regular, fixed_time()).await.unwrap();

        let before = store.get_season_stats(League::Nba, "p1").await.unwrap().unwrap();
        let totals_before = serde_json::to_vec(&before.nba_entry(2025, Phase::Regular).unwrap().totals).unwrap();

        let advanced = resolved(nba_advanced(101, "p1", "Jay Tatum", "BOS", 60, 24.5));
        let later = fixed_time() + chrono::Duration::minutes(5);
        merger.merge(League::Nba, &advanced, Phase::Regular, later).await.unwrap();

        let after = store.get_season_stats(League::Nba, "p1").await.unwrap().unwrap();
        let entry = after.nba_entry(2025, Phase::Regular).unwrap();
        assert_eq!(serde_json::to_vec(&entry.totals).unwrap(), totals_before);
        assert_eq!(entry.advanced.as_ref().unwrap().player_efficiency_rating, Some(24.5));
        assert_eq!(entry.last_updated, later);
        assert_eq!(after.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_advanced_row_keeps_previous_block() {
        let (merger, store) = merger();
        merger
            .merge(League::Nba, &resolved(nba_advanced(1, "p1", "Jay Tatum", "BOS", 60, 21.0)), Phase::Regular, fixed_time())
            .await
            .unwrap();

        let mut blank = nba_advanced(2, "p1", "Jay Tatum", "BOS", 61, 0.0);
        blank.stats = CategoryStats::NbaAdvanced(NbaAdvanced { games: 61, ..Default::default() });
        let outcome = merger.merge(League::Nba, &resolved(blank), Phase::Regular, fixed_time()).await.unwrap();

        assert!(!outcome.category_written);
        let doc = store.get_season_stats(League::Nba, "p1").await.unwrap().unwrap();
        let advanced = doc.nba_entry(2025, Phase::Regular).unwrap().advanced.clone().unwrap();
        assert_eq!(advanced.player_efficiency_rating, Some(21.0));
    }

    #[tokio::test]
    async fn test_win_share_splits_alone_are_written() {
        let (merger, store) = merger();
        let mut splits = nba_advanced(3, "p1", "Jay Tatum", "BOS", 40, 0.0);
        splits.stats = CategoryStats::NbaAdvanced(NbaAdvanced {
            games: 40,
            offensive_win_shares: Some(1.2),
            defensive_win_shares: Some(2.1),
            win_shares_per_48: Some(0.098),
            ..Default::default()
        });

        let outcome = merger.merge(League::Nba, &resolved(splits), Phase::Regular, fixed_time()).await.unwrap();

        assert!(outcome.category_written);
        let doc = store.get_season_stats(League::Nba, "p1").await.unwrap().unwrap();
        let advanced = doc.nba_entry(2025, Phase::Regular).unwrap().advanced.clone().unwrap();
        assert_eq!(advanced.defensive_win_shares, Some(2.1));
        assert_eq!(advanced.win_shares_per_48, Some(0.098));
    }

    #[tokio::test]
    async fn test_metadata_overwritten_on_existing_entry() {
        let (merger, store) = merger();
        merger
            .merge(League::Nba, &resolved(nba_totals(1, "p1", "Mover", "BOS", 20, 200)), Phase::Regular, fixed_time())
            .await
            .unwrap();

        let mut moved = nba_totals(2, "p1", "Mover", "LAL", 45, 500);
        moved.age = Some(28);
        moved.position = Some("PF".to_string());
        merger.merge(League::Nba, &resolved(moved), Phase::Regular, fixed_time()).await.unwrap();

        let doc = store.get_season_stats(League::Nba, "p1").await.unwrap().unwrap();
        let entry = doc.nba_entry(2025, Phase::Regular).unwrap();
        assert_eq!(entry.team, "LAL");
        assert_eq!(entry.age, Some(28));
        assert_eq!(entry.position.as_deref(), Some("PF"));
        assert_eq!(entry.totals.as_ref().unwrap().games, 45);
    }

    #[tokio::test]
    async fn test_phases_are_separate_entries() {
        let (merger, store) = merger();
        let player = resolved(nba_totals(1, "p1", "Jay Tatum", "BOS", 60, 1600));
        merger.merge(League::Nba, &player, Phase::Regular, fixed_time()).await.unwrap();

        let playoff = resolved(nba_totals(7, "p1", "Jay Tatum", "BOS", 12, 330));
        let outcome = merger.merge(League::Nba, &playoff, Phase::Playoffs, fixed_time()).await.unwrap();
        assert!(outcome.created_entry);

        let doc = store.get_season_stats(League::Nba, "p1").await.unwrap().unwrap();
        assert_eq!(doc.entry_count(), 2);
        assert_eq!(doc.nba_entry(2025, Phase::Regular).unwrap().totals.as_ref().unwrap().points, 1600);
        assert_eq!(doc.nba_entry(2025, Phase::Playoffs).unwrap().totals.as_ref().unwrap().points, 330);
    }

    #[tokio::test]
    async fn test_soccer_season_merge() {
        let (merger, store) = merger();
        let mut older = soccer_record(1, "s1", "Bukayo Saka", "Arsenal", 35, 16);
        older.season = 2024;
        merger.merge(League::Epl, &resolved(older), Phase::Regular, fixed_time()).await.unwrap();
        merger
            .merge(League::Epl, &resolved(soccer_record(2, "s1", "Bukayo Saka", "Arsenal", 9, 4)), Phase::Regular, fixed_time())
            .await
            .unwrap();

        let doc = store.get_season_stats(League::Epl, "s1").await.unwrap().unwrap();
        assert_eq!(doc.entry_count(), 2);
        assert_eq!(doc.soccer_entry(2024).unwrap().stats.as_ref().unwrap().goals.total, 16);
        assert_eq!(doc.soccer_entry(2025).unwrap().stats.as_ref().unwrap().appearances, 9);
    }

    #[tokio::test]
    async fn test_mismatched_category_is_rejected() {
        let (merger, store) = merger();
        merger
            .merge(League::Nba, &resolved(nba_totals(1, "p1", "Jay Tatum", "BOS", 60, 1600)), Phase::Regular, fixed_time())
            .await
            .unwrap();

        let wrong = resolved(soccer_record(2, "p1", "Jay Tatum", "BOS", 3, 1));
        let result = merger.merge(League::Nba, &wrong, Phase::Regular, fixed_time()).await;
        assert!(matches!(result, Err(PipelineError::Merge { .. })));

        let doc = store.get_season_stats(League::Nba, "p1").await.unwrap().unwrap();
        assert_eq!(doc.nba_entry(2025, Phase::Regular).unwrap().totals.as_ref().unwrap().points, 1600);
    }

    #[tokio::test]
    async fn test_league_without_history_is_rejected() {
        let (merger, store) = merger();
        let result = merger
            .merge(League::Nfl, &resolved(nfl_record(1, "q1", "Quarterback", "KC", 8, 2100)), Phase::Regular, fixed_time())
            .await;
        assert!(result.is_err());
        assert_eq!(store.season_stats_count(League::Nfl).await, 0);
    }
}
