use anyhow::Result;

use super::schema::Database;
use super::types::CacheStats;
use crate::catalog::GameDetails;

/// Detail pages stay fresh for a day.
const DEFAULT_TTL_HOURS: i64 = 24;

impl Database {
    // ========================================================================
    // Game Detail Cache
    // ========================================================================

    /// Store a detail record, replacing any previous copy.
    ///
    /// `ttl_hours` of `None` uses the 24 hour default.
    pub async fn cache_game(&self, details: &GameDetails, ttl_hours: Option<i64>) -> Result<()> {
        let ttl = ttl_hours.unwrap_or(DEFAULT_TTL_HOURS).max(1);
        let ttl_modifier = format!("+{ttl} hours");
        let json = serde_json::to_string(details)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO game_cache (game_id, json, fetched_at, expires_at)
            VALUES (?, ?, datetime('now'), datetime('now', ?))
        "#,
        )
        .bind(details.id as i64)
        .bind(&json)
        .bind(&ttl_modifier)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a cached detail record if present and not expired.
    ///
    /// A row that no longer decodes (older schema) is treated as a miss and removed.
    pub async fn get_cached_game(&self, game_id: u64) -> Result<Option<GameDetails>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT json FROM game_cache WHERE game_id = ? AND expires_at > datetime('now')",
        )
        .bind(game_id as i64)
        .fetch_optional(&self.pool)
        .await?;

        let Some((json,)) = row else {
            return Ok(None);
        };

        match serde_json::from_str(&json) {
            Ok(details) => Ok(Some(details)),
            Err(e) => {
                tracing::warn!(game_id, error = %e, "Discarding undecodable cache entry");
                sqlx::query("DELETE FROM game_cache WHERE game_id = ?")
                    .bind(game_id as i64)
                    .execute(&self.pool)
                    .await?;
                Ok(None)
            }
        }
    }

    /// Delete expired entries, returning how many were removed.
    pub async fn purge_expired_games(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM game_cache WHERE expires_at <= datetime('now')")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Drop every cached entry, fresh or not.
    pub async fn clear_game_cache(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM game_cache")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn game_cache_stats(&self) -> Result<CacheStats> {
        let row: (i64, i64, Option<String>) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN expires_at <= datetime('now') THEN 1 ELSE 0 END), 0),
                   MAX(fetched_at)
            FROM game_cache
        "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CacheStats {
            total_entries: row.0,
            expired_entries: row.1,
            newest_entry: row.2,
        })
    }
}
