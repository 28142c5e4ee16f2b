//! PostgreSQL backend
//!
//! Documents are stored as JSONB keyed by `(league, id)`. Every write is an
//! `INSERT .. ON CONFLICT DO UPDATE` of a single row.

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::*;
use crate::store::StatsStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(max_connections = config.max_connections, "Connected to stats database");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode<T: DeserializeOwned>(row: &PgRow, column: &str) -> Result<T> {
    let value: serde_json::Value = row.try_get(column)?;
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl StatsStore for PgStore {
    async fn upsert_team(&self, team: &Team) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO teams (league, team_id, data, last_updated)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (league, team_id)
            DO UPDATE SET
                data = EXCLUDED.data,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(team.league.as_str())
        .bind(&team.id)
        .bind(serde_json::to_value(team)?)
        .bind(team.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_team(&self, league: League, team_id: &str) -> Result<Option<Team>> {
        let row = sqlx::query("SELECT data FROM teams WHERE league = $1 AND team_id = $2")
            .bind(league.as_str())
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| decode(&r, "data")).transpose()
    }

    async fn get_player(&self, league: League, player_id: &str) -> Result<Option<PlayerSummary>> {
        let row = sqlx::query("SELECT data FROM players WHERE league = $1 AND player_id = $2")
            .bind(league.as_str())
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| decode(&r, "data")).transpose()
    }

    async fn upsert_player(&self, player: &PlayerSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO players (league, player_id, team_id, detail_ref, data, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (league, player_id)
            DO UPDATE SET
                team_id = EXCLUDED.team_id,
                detail_ref = EXCLUDED.detail_ref,
                data = EXCLUDED.data,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(player.league.as_str())
        .bind(&player.id)
        .bind(&player.team_id)
        .bind(player.detail_ref.as_deref())
        .bind(serde_json::to_value(player)?)
        .bind(player.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_season_stats(&self, league: League, player_id: &str) -> Result<Option<PlayerSeasonStats>> {
        let row = sqlx::query("SELECT data FROM player_season_stats WHERE league = $1 AND player_id = $2")
            .bind(league.as_str())
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| decode(&r, "data")).transpose()
    }

    async fn save_season_stats(&self, stats: &PlayerSeasonStats) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO player_season_stats (league, player_id, data, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (league, player_id)
            DO UPDATE SET
                data = EXCLUDED.data,
                updated_at = NOW()
            "#,
        )
        .bind(stats.league.as_str())
        .bind(&stats.player_id)
        .bind(serde_json::to_value(stats)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_system_info(&self, key: &str, value: serde_json::Value, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO system_info (key, value, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key)
            DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_system_info(&self, key: &str) -> Result<Option<SystemInfo>> {
        let row = sqlx::query("SELECT key, value, updated_at FROM system_info WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(SystemInfo {
                key: row.try_get("key")?,
                value: row.try_get("value")?,
                updated_at: row.try_get("updated_at")?,
            })),
            None => Ok(None),
        }
    }
}
