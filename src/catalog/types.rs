use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Data Structures
// ============================================================================

/// An `{id, name}` pair used for genres, platforms, developers and publishers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    pub name: String,
}

/// One catalog item as shown in the feed.
///
/// Items are read-only once constructed. `name` uses `Arc<str>` so list
/// snapshots handed to the renderer clone cheaply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: u64,
    pub name: Arc<str>,
    pub cover_image: Option<String>,
    pub rating: f64,
    pub released: Option<String>,
    pub genres: Vec<NamedRef>,
    pub platforms: Vec<NamedRef>,
}

/// Minimum/recommended system requirements for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub minimum: Option<String>,
    pub recommended: Option<String>,
}

/// A platform entry on the detail page, with its requirements when published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRelease {
    pub platform: NamedRef,
    pub requirements: Option<Requirements>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub id: u64,
    pub image: String,
}

/// Full record for the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDetails {
    pub id: u64,
    pub name: String,
    pub released: Option<String>,
    pub rating: f64,
    pub cover_image: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<NamedRef>,
    pub platforms: Vec<PlatformRelease>,
    pub developers: Vec<NamedRef>,
    pub publishers: Vec<NamedRef>,
    pub website: Option<String>,
    pub screenshots: Vec<Screenshot>,
}

impl GameDetails {
    /// Platforms that publish at least one requirements block.
    pub fn platforms_with_requirements(&self) -> impl Iterator<Item = &PlatformRelease> {
        self.platforms.iter().filter(|p| p.requirements.is_some())
    }

    /// Reduce to the list-card shape (used by the wishlist view).
    pub fn summary(&self) -> Game {
        Game {
            id: self.id,
            name: Arc::from(self.name.as_str()),
            cover_image: self.cover_image.clone(),
            rating: self.rating,
            released: self.released.clone(),
            genres: self.genres.clone(),
            platforms: self.platforms.iter().map(|p| p.platform.clone()).collect(),
        }
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<Game>,
    /// Whether the source reports another page after this one.
    pub has_next: bool,
    /// Total matching items when the source reports it.
    pub total: Option<u64>,
    /// Entries dropped because they had no usable identifier.
    pub skipped: usize,
}

/// Categorical filters forwarded to the catalog source.
///
/// Only set values are ever sent; see `feed::FilterSelection` for normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CatalogFilters {
    pub genre: Option<String>,
    pub platform: Option<String>,
}

// ============================================================================
// Wire Types
// ============================================================================

/// Raw `{id, name}` object. Missing ids make the reference unusable.
#[derive(Debug, Deserialize)]
pub(crate) struct RawNamed {
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RawNamed {
    fn into_named(self) -> Option<NamedRef> {
        Some(NamedRef {
            id: self.id?,
            name: self.name.unwrap_or_else(|| "Unknown".to_string()),
        })
    }
}

fn collect_named(raw: Vec<RawNamed>) -> Vec<NamedRef> {
    raw.into_iter().filter_map(RawNamed::into_named).collect()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawRequirements {
    #[serde(default)]
    pub minimum: Option<String>,
    #[serde(default)]
    pub recommended: Option<String>,
}

impl RawRequirements {
    fn into_requirements(self) -> Option<Requirements> {
        let minimum = self.minimum.filter(|s| !s.trim().is_empty());
        let recommended = self.recommended.filter(|s| !s.trim().is_empty());
        if minimum.is_none() && recommended.is_none() {
            return None;
        }
        Some(Requirements {
            minimum,
            recommended,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlatformEntry {
    pub platform: Option<RawNamed>,
    #[serde(default)]
    pub requirements: Option<RawRequirements>,
    #[serde(default)]
    pub requirements_en: Option<RawRequirements>,
}

/// A list entry as returned by the games endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct RawGame {
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<RawNamed>>,
    #[serde(default)]
    pub platforms: Option<Vec<RawPlatformEntry>>,
}

impl RawGame {
    /// Convert to a `Game`, or `None` when the entry has no identifier.
    pub(crate) fn into_game(self) -> Option<Game> {
        let id = self.id?;
        Some(Game {
            id,
            name: Arc::from(self.name.unwrap_or_else(|| "Untitled".to_string())),
            cover_image: self.background_image.filter(|s| !s.is_empty()),
            rating: self.rating.unwrap_or(0.0),
            released: self.released,
            genres: collect_named(self.genres.unwrap_or_default()),
            platforms: self
                .platforms
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| p.platform.and_then(RawNamed::into_named))
                .collect(),
        })
    }
}

/// Detail payload from `games/{id}`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawGameDetails {
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub description_raw: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<RawNamed>>,
    #[serde(default)]
    pub platforms: Option<Vec<RawPlatformEntry>>,
    #[serde(default)]
    pub developers: Option<Vec<RawNamed>>,
    #[serde(default)]
    pub publishers: Option<Vec<RawNamed>>,
    #[serde(default)]
    pub website: Option<String>,
}

impl RawGameDetails {
    pub(crate) fn into_details(self, screenshots: Vec<Screenshot>) -> Option<GameDetails> {
        let id = self.id?;
        let platforms = self
            .platforms
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let platform = entry.platform.and_then(RawNamed::into_named)?;
                let requirements = entry
                    .requirements
                    .and_then(RawRequirements::into_requirements)
                    .or_else(|| {
                        entry
                            .requirements_en
                            .and_then(RawRequirements::into_requirements)
                    });
                Some(PlatformRelease {
                    platform,
                    requirements,
                })
            })
            .collect();

        Some(GameDetails {
            id,
            name: self.name.unwrap_or_else(|| "Untitled".to_string()),
            released: self.released,
            rating: self.rating.unwrap_or(0.0),
            cover_image: self.background_image.filter(|s| !s.is_empty()),
            description: self.description_raw.filter(|s| !s.trim().is_empty()),
            genres: collect_named(self.genres.unwrap_or_default()),
            platforms,
            developers: collect_named(self.developers.unwrap_or_default()),
            publishers: collect_named(self.publishers.unwrap_or_default()),
            website: self.website.filter(|s| !s.trim().is_empty()),
            screenshots,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawScreenshot {
    pub id: Option<u64>,
    pub image: Option<String>,
}

impl RawScreenshot {
    pub(crate) fn into_screenshot(self) -> Option<Screenshot> {
        Some(Screenshot {
            id: self.id?,
            image: self.image.filter(|s| !s.is_empty())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn raw_game_without_id_is_dropped() {
        let raw: RawGame = serde_json::from_str(r#"{"name": "Ghost"}"#).unwrap();
        assert!(raw.into_game().is_none());
    }

    #[test]
    fn raw_game_defaults_missing_fields() {
        let raw: RawGame = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        let game = raw.into_game().unwrap();
        assert_eq!(game.id, 7);
        assert_eq!(&*game.name, "Untitled");
        assert_eq!(game.rating, 0.0);
        assert!(game.cover_image.is_none());
        assert!(game.genres.is_empty());
    }

    #[test]
    fn raw_game_flattens_platform_wrappers() {
        let raw: RawGame = serde_json::from_str(
            r#"{
                "id": 3498,
                "name": "Grand Theft Auto V",
                "background_image": "https://media.example/gta.jpg",
                "rating": 4.47,
                "genres": [{"id": 4, "name": "Action"}, {"name": "no id"}],
                "platforms": [{"platform": {"id": 4, "name": "PC"}}, {"platform": null}]
            }"#,
        )
        .unwrap();
        let game = raw.into_game().unwrap();
        assert_eq!(
            game.genres,
            vec![NamedRef {
                id: 4,
                name: "Action".into()
            }]
        );
        assert_eq!(
            game.platforms,
            vec![NamedRef {
                id: 4,
                name: "PC".into()
            }]
        );
    }

    #[test]
    fn empty_requirements_are_absent() {
        let raw: RawGameDetails = serde_json::from_str(
            r#"{
                "id": 1,
                "name": "Portal",
                "platforms": [
                    {"platform": {"id": 4, "name": "PC"}, "requirements": {"minimum": "2GB RAM"}},
                    {"platform": {"id": 1, "name": "Xbox"}, "requirements": {}}
                ]
            }"#,
        )
        .unwrap();
        let details = raw.into_details(Vec::new()).unwrap();
        let with_reqs: Vec<_> = details.platforms_with_requirements().collect();
        assert_eq!(with_reqs.len(), 1);
        assert_eq!(with_reqs[0].platform.name, "PC");
        assert_eq!(
            with_reqs[0].requirements.as_ref().unwrap().minimum.as_deref(),
            Some("2GB RAM")
        );
    }

    #[test]
    fn details_summary_keeps_identity() {
        let raw: RawGameDetails = serde_json::from_str(
            r#"{"id": 9, "name": "Celeste", "rating": 4.2, "platforms": [{"platform": {"id": 7, "name": "Switch"}}]}"#,
        )
        .unwrap();
        let summary = raw.into_details(Vec::new()).unwrap().summary();
        assert_eq!(summary.id, 9);
        assert_eq!(&*summary.name, "Celeste");
        assert_eq!(summary.platforms[0].name, "Switch");
    }
}
