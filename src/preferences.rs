//! Preference manager that merges config.toml defaults with DB overrides.
//!
//! Config values serve as defaults; rows in `user_preferences` override them.
//! Writes always go to the DB, never to the config file.
use std::collections::HashMap;

use anyhow::Result;

use crate::config::Config;
use crate::feed::FilterSelection;
use crate::storage::Database;
use crate::theme::ThemeVariant;

pub const KEY_THEME: &str = "theme.variant";
pub const KEY_PAGE_SIZE: &str = "feed.page_size";
pub const KEY_GENRE: &str = "feed.genre";
pub const KEY_PLATFORM: &str = "feed.platform";
pub const KEY_EMAIL: &str = "account.email";

// ============================================================================
// PreferenceManager
// ============================================================================

/// Merged preference store: config.toml defaults + DB overrides.
///
/// Reads are in-memory. Writes persist to the DB first and only then update
/// the map, so a failed write leaves the old value visible.
pub struct PreferenceManager {
    prefs: HashMap<String, String>,
}

impl PreferenceManager {
    pub async fn load(config: &Config, db: &Database) -> Result<Self> {
        let mut prefs = Self::flatten_config(config);
        for (key, value) in db.get_preferences_by_prefix("").await? {
            prefs.insert(key, value);
        }
        Ok(Self { prefs })
    }

    /// Config only. Used when the DB read fails at startup.
    pub fn from_config(config: &Config) -> Self {
        Self {
            prefs: Self::flatten_config(config),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.prefs.get(key).map(String::as_str)
    }

    pub async fn set(&mut self, db: &Database, key: &str, value: &str) -> Result<()> {
        db.set_preference(key, value).await?;
        self.prefs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Removes a DB override. Any config default stays hidden until the next
    /// load.
    pub async fn clear(&mut self, db: &Database, key: &str) -> Result<()> {
        db.delete_preference(key).await?;
        self.prefs.remove(key);
        Ok(())
    }

    // ========================================================================
    // Type-safe Accessors
    // ========================================================================

    /// Unknown names fall back to Dark.
    pub fn theme_variant(&self) -> ThemeVariant {
        self.get(KEY_THEME)
            .and_then(ThemeVariant::from_str_name)
            .unwrap_or_default()
    }

    pub fn page_size(&self) -> Option<u32> {
        self.get(KEY_PAGE_SIZE).and_then(|v| v.parse().ok())
    }

    /// Genre and platform the user last browsed with. Search text is never
    /// restored.
    pub fn saved_filters(&self) -> FilterSelection {
        FilterSelection::new("", self.get(KEY_GENRE), self.get(KEY_PLATFORM))
    }

    pub fn last_email(&self) -> Option<&str> {
        self.get(KEY_EMAIL).filter(|e| !e.is_empty())
    }

    /// Keybinding overrides from both layers, keyed by action name.
    pub fn keybindings(&self) -> HashMap<String, String> {
        self.prefs
            .iter()
            .filter_map(|(k, v)| Some((k.strip_prefix("keybind.")?.to_string(), v.clone())))
            .collect()
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn flatten_config(config: &Config) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(KEY_THEME.to_string(), config.theme.clone());
        map.insert(
            KEY_PAGE_SIZE.to_string(),
            config.effective_page_size().to_string(),
        );
        for (action, key_str) in &config.keybindings {
            map.insert(format!("keybind.{action}"), key_str.clone());
        }
        // API keys stay out of the preference table
        map
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_defaults_come_from_config() {
        let db = test_db().await;
        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();

        assert_eq!(pm.theme_variant(), ThemeVariant::Dark);
        assert_eq!(pm.page_size(), Some(12));
        assert_eq!(pm.saved_filters(), FilterSelection::default());
        assert_eq!(pm.last_email(), None);
    }

    #[tokio::test]
    async fn test_db_overrides_config() {
        let db = test_db().await;
        db.set_preference(KEY_THEME, "light").await.unwrap();
        db.set_preference(KEY_GENRE, "4").await.unwrap();

        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        assert_eq!(pm.theme_variant(), ThemeVariant::Light);
        assert_eq!(pm.saved_filters().genre(), Some("4"));
        assert_eq!(pm.saved_filters().platform(), None);
    }

    #[tokio::test]
    async fn test_set_persists_and_survives_reload() {
        let db = test_db().await;
        let config = Config::default();
        let mut pm = PreferenceManager::load(&config, &db).await.unwrap();

        pm.set(&db, KEY_PLATFORM, "2").await.unwrap();
        pm.set(&db, KEY_EMAIL, "player@example.com").await.unwrap();
        assert_eq!(pm.saved_filters().platform(), Some("2"));
        drop(pm);

        let pm = PreferenceManager::load(&config, &db).await.unwrap();
        assert_eq!(pm.saved_filters().platform(), Some("2"));
        assert_eq!(pm.last_email(), Some("player@example.com"));
    }

    #[tokio::test]
    async fn test_clear_removes_override() {
        let db = test_db().await;
        let mut pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        pm.set(&db, KEY_GENRE, "51").await.unwrap();

        pm.clear(&db, KEY_GENRE).await.unwrap();
        assert_eq!(pm.saved_filters().genre(), None);
        assert_eq!(db.get_preference(KEY_GENRE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unset_markers_in_db_are_ignored() {
        let db = test_db().await;
        db.set_preference(KEY_GENRE, "all").await.unwrap();
        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        assert_eq!(pm.saved_filters().genre(), None);
    }

    #[tokio::test]
    async fn test_unknown_theme_falls_back_to_dark() {
        let config = Config {
            theme: "solarized".into(),
            ..Config::default()
        };
        let pm = PreferenceManager::from_config(&config);
        assert_eq!(pm.theme_variant(), ThemeVariant::Dark);
    }

    #[tokio::test]
    async fn test_keybindings_merge_layers() {
        let db = test_db().await;
        let mut config = Config::default();
        config.keybindings.insert("quit".into(), "Ctrl+q".into());
        config.keybindings.insert("reload".into(), "F5".into());
        db.set_preference("keybind.reload", "R").await.unwrap();

        let pm = PreferenceManager::load(&config, &db).await.unwrap();
        let binds = pm.keybindings();
        assert_eq!(binds.get("quit").map(String::as_str), Some("Ctrl+q"));
        assert_eq!(binds.get("reload").map(String::as_str), Some("R"));
        assert_eq!(binds.len(), 2);
    }

    #[tokio::test]
    async fn test_api_keys_not_flattened() {
        let config = Config {
            catalog_api_key: Some("rawg-secret".into()),
            backend_anon_key: Some("anon-secret".into()),
            ..Config::default()
        };
        let pm = PreferenceManager::from_config(&config);
        assert!(pm.prefs.values().all(|v| !v.contains("secret")));
    }
}
