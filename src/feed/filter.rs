use crate::catalog::CatalogFilters;

/// Values the UI layer may hand us that mean "no filter".
const UNSET_MARKERS: &[&str] = &["null", "undefined", "none", "all"];

/// Composite key for one feed: search text plus genre and platform.
///
/// Any change to any field invalidates the whole feed. Construct through
/// [`FilterSelection::new`] or the `with_*` builders so unset markers never
/// survive into a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSelection {
    search_query: Option<String>,
    genre: Option<String>,
    platform: Option<String>,
}

fn normalize_id(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty()
        || UNSET_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
    {
        return None;
    }
    Some(trimmed.to_string())
}

fn normalize_query(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl FilterSelection {
    pub fn new(search_query: &str, genre: Option<&str>, platform: Option<&str>) -> Self {
        Self {
            search_query: normalize_query(search_query),
            genre: normalize_id(genre),
            platform: normalize_id(platform),
        }
    }

    pub fn with_search(&self, query: &str) -> Self {
        Self {
            search_query: normalize_query(query),
            ..self.clone()
        }
    }

    pub fn with_genre(&self, genre: Option<&str>) -> Self {
        Self {
            genre: normalize_id(genre),
            ..self.clone()
        }
    }

    pub fn with_platform(&self, platform: Option<&str>) -> Self {
        Self {
            platform: normalize_id(platform),
            ..self.clone()
        }
    }

    pub fn search_query(&self) -> Option<&str> {
        self.search_query.as_deref()
    }

    pub fn genre(&self) -> Option<&str> {
        self.genre.as_deref()
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// True when requests must go through the search endpoint.
    pub fn is_search(&self) -> bool {
        self.search_query.is_some()
    }

    /// Categorical filters to forward, carrying only the set values.
    pub fn to_filters(&self) -> CatalogFilters {
        CatalogFilters {
            genre: self.genre.clone(),
            platform: self.platform.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unset_markers_become_none() {
        for marker in ["", "  ", "null", "undefined", "None", "ALL"] {
            let sel = FilterSelection::new("", Some(marker), Some(marker));
            assert_eq!(sel.to_filters(), CatalogFilters::default(), "marker {marker:?}");
        }
    }

    #[test]
    fn test_query_is_trimmed() {
        let sel = FilterSelection::new("  zelda ", None, None);
        assert_eq!(sel.search_query(), Some("zelda"));
        assert!(sel.is_search());
        assert!(!FilterSelection::new("   ", None, None).is_search());
    }

    #[test]
    fn test_builders_keep_other_fields() {
        let sel = FilterSelection::new("mario", Some("4"), None).with_platform(Some("7"));
        assert_eq!(sel.search_query(), Some("mario"));
        assert_eq!(sel.genre(), Some("4"));
        assert_eq!(sel.platform(), Some("7"));

        let cleared = sel.with_genre(Some("null"));
        assert_eq!(cleared.genre(), None);
        assert_eq!(cleared.platform(), Some("7"));
    }

    proptest! {
        #[test]
        fn forwarded_filters_never_carry_markers(genre in "\\PC*", platform in "\\PC*") {
            let filters = FilterSelection::new("", Some(&genre), Some(&platform)).to_filters();
            for value in [filters.genre, filters.platform].into_iter().flatten() {
                prop_assert!(!value.is_empty());
                prop_assert!(!UNSET_MARKERS.iter().any(|m| value.eq_ignore_ascii_case(m)));
                prop_assert_eq!(value.trim(), value.as_str());
            }
        }
    }
}
