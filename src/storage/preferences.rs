use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // User Preferences Operations
    // ========================================================================

    /// Get a single preference value by key.
    ///
    /// Keys use dotted convention: `theme.variant`, `feed.genre`, `account.email`.
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM user_preferences WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a preference value (UPSERT), refreshing `updated_at`.
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a preference. Clearing a filter deletes its key rather than
    /// storing an "unset" marker.
    pub async fn delete_preference(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_preferences WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All preferences whose key starts with `prefix`, ordered by key.
    ///
    /// `_` and `%` in the prefix are matched literally.
    pub async fn get_preferences_by_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let escaped = prefix
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("{}%", escaped);
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM user_preferences WHERE key LIKE ? ESCAPE '\\' ORDER BY key",
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_preference_missing() {
        let db = test_db().await;
        assert_eq!(db.get_preference("feed.genre").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_preference_upsert() {
        let db = test_db().await;
        db.set_preference("theme.variant", "dark").await.unwrap();
        db.set_preference("theme.variant", "light").await.unwrap();

        let value = db.get_preference("theme.variant").await.unwrap();
        assert_eq!(value, Some("light".to_string()));
    }

    #[tokio::test]
    async fn test_delete_preference() {
        let db = test_db().await;
        db.set_preference("feed.platform", "7").await.unwrap();
        assert!(db.delete_preference("feed.platform").await.unwrap());
        assert!(!db.delete_preference("feed.platform").await.unwrap());
        assert_eq!(db.get_preference("feed.platform").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_preferences_by_prefix() {
        let db = test_db().await;
        db.set_preference("feed.genre", "4").await.unwrap();
        db.set_preference("feed.platform", "1").await.unwrap();
        db.set_preference("feedback.sent", "no").await.unwrap();
        db.set_preference("account.email", "ada@example.com")
            .await
            .unwrap();

        let feed_prefs = db.get_preferences_by_prefix("feed.").await.unwrap();
        assert_eq!(
            feed_prefs,
            vec![
                ("feed.genre".to_string(), "4".to_string()),
                ("feed.platform".to_string(), "1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_prefix_wildcards_are_literal() {
        let db = test_db().await;
        db.set_preference("keybind.open_link", "o").await.unwrap();
        db.set_preference("keybindXopen", "x").await.unwrap();

        let prefs = db.get_preferences_by_prefix("keybind_").await.unwrap();
        assert!(prefs.is_empty());
    }
}
