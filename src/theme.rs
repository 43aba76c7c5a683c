//! Theme system for the TUI.
//!
//! Semantic color roles map to ratatui `Style` values. `ThemeVariant` picks
//! the Dark or Light palette; `Theme` is the explicit context object the app
//! carries and hands to every renderer.

use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

// ============================================================================
// Theme Variant
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    /// Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Name stored in preferences.
    pub fn key(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

// ============================================================================
// Color Palette
// ============================================================================

/// Every semantic UI role mapped to a `Style`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    // -- Catalog list --
    pub item_normal: Style,
    pub item_selected: Style,
    pub item_rating: Style,
    pub item_meta: Style,
    pub item_placeholder: Style,
    pub wishlist_marker: Style,

    // -- Detail page --
    pub detail_heading: Style,
    pub detail_body: Style,
    pub detail_label: Style,
    pub detail_link: Style,
    pub comment_author: Style,
    pub comment_pending: Style,

    // -- Feedback --
    pub banner_error: Style,
    pub banner_empty: Style,

    // -- Inputs and menus --
    pub input_active: Style,
    pub input_inactive: Style,
    pub menu_selected: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub panel_border: Style,
    pub panel_border_focused: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            item_normal: Style::default(),
            item_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            item_rating: Style::default().fg(Color::Yellow),
            item_meta: Style::default().fg(Color::Gray),
            item_placeholder: Style::default().fg(Color::DarkGray),
            wishlist_marker: Style::default().fg(Color::LightRed),

            detail_heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            detail_body: Style::default(),
            detail_label: Style::default().fg(Color::DarkGray),
            detail_link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            comment_author: Style::default().add_modifier(Modifier::BOLD),
            comment_pending: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            banner_error: Style::default().fg(Color::White).bg(Color::Red),
            banner_empty: Style::default().fg(Color::Gray),

            input_active: Style::default().fg(Color::Yellow),
            input_inactive: Style::default().fg(Color::DarkGray),
            menu_selected: Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),

            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            panel_border: Style::default(),
            panel_border_focused: Style::default().fg(Color::Cyan),
        }
    }

    fn light() -> Self {
        Self {
            item_normal: Style::default().fg(Color::Black),
            item_selected: Style::default().bg(Color::Blue).fg(Color::White),
            item_rating: Style::default().fg(Color::Magenta),
            item_meta: Style::default().fg(Color::DarkGray),
            item_placeholder: Style::default().fg(Color::Gray),
            wishlist_marker: Style::default().fg(Color::Red),

            detail_heading: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            detail_body: Style::default().fg(Color::Black),
            detail_label: Style::default().fg(Color::DarkGray),
            detail_link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            comment_author: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            comment_pending: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),

            banner_error: Style::default().fg(Color::White).bg(Color::Red),
            banner_empty: Style::default().fg(Color::DarkGray),

            input_active: Style::default().fg(Color::Blue),
            input_inactive: Style::default().fg(Color::Gray),
            menu_selected: Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),

            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            panel_border: Style::default().fg(Color::DarkGray),
            panel_border_focused: Style::default().fg(Color::Blue),
        }
    }

    fn roles(&self) -> [(&'static str, Style); 20] {
        [
            ("item_normal", self.item_normal),
            ("item_selected", self.item_selected),
            ("item_rating", self.item_rating),
            ("item_meta", self.item_meta),
            ("item_placeholder", self.item_placeholder),
            ("wishlist_marker", self.wishlist_marker),
            ("detail_heading", self.detail_heading),
            ("detail_body", self.detail_body),
            ("detail_label", self.detail_label),
            ("detail_link", self.detail_link),
            ("comment_author", self.comment_author),
            ("comment_pending", self.comment_pending),
            ("banner_error", self.banner_error),
            ("banner_empty", self.banner_empty),
            ("input_active", self.input_active),
            ("input_inactive", self.input_inactive),
            ("menu_selected", self.menu_selected),
            ("status_bar", self.status_bar),
            ("panel_border", self.panel_border),
            ("panel_border_focused", self.panel_border_focused),
        ]
    }
}

// ============================================================================
// Style Map
// ============================================================================

/// String-keyed style lookup, built from a `ColorPalette`.
#[derive(Debug, Clone)]
pub struct StyleMap {
    map: HashMap<&'static str, Style>,
}

impl StyleMap {
    pub fn from_palette(p: &ColorPalette) -> Self {
        Self {
            map: p.roles().into_iter().collect(),
        }
    }

    /// `Style::default()` for unknown roles.
    pub fn resolve(&self, role: &str) -> Style {
        self.map.get(role).copied().unwrap_or_default()
    }
}

// ============================================================================
// Theme Context
// ============================================================================

/// The active theme. Created once at startup and passed explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    variant: ThemeVariant,
    palette: ColorPalette,
}

impl Theme {
    pub fn new(variant: ThemeVariant) -> Self {
        Self {
            variant,
            palette: variant.palette(),
        }
    }

    pub fn variant(&self) -> ThemeVariant {
        self.variant
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    /// Switch to the other variant and return it.
    pub fn toggle(&mut self) -> ThemeVariant {
        *self = Self::new(self.variant.next());
        self.variant
    }

    pub fn style_map(&self) -> StyleMap {
        StyleMap::from_palette(&self.palette)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ThemeVariant::default())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_from_str_name() {
        assert_eq!(ThemeVariant::from_str_name("dark"), Some(ThemeVariant::Dark));
        assert_eq!(ThemeVariant::from_str_name(" Light "), Some(ThemeVariant::Light));
        assert_eq!(ThemeVariant::from_str_name("neon"), None);
    }

    #[test]
    fn variant_key_roundtrips() {
        for variant in [ThemeVariant::Dark, ThemeVariant::Light] {
            assert_eq!(ThemeVariant::from_str_name(variant.key()), Some(variant));
        }
    }

    #[test]
    fn light_palette_differs_from_dark() {
        let dark = ThemeVariant::Dark.palette();
        let light = ThemeVariant::Light.palette();
        assert_ne!(dark.item_selected, light.item_selected);
        assert_ne!(dark.status_bar, light.status_bar);
    }

    #[test]
    fn toggle_swaps_palette() {
        let mut theme = Theme::default();
        assert_eq!(theme.variant(), ThemeVariant::Dark);
        assert_eq!(theme.toggle(), ThemeVariant::Light);
        assert_eq!(theme.palette(), &ThemeVariant::Light.palette());
        assert_eq!(theme.toggle(), ThemeVariant::Dark);
    }

    #[test]
    fn style_map_resolves_every_role() {
        let palette = ThemeVariant::Dark.palette();
        let sm = StyleMap::from_palette(&palette);
        for (name, style) in palette.roles() {
            assert_eq!(sm.resolve(name), style, "role {name}");
        }
        assert_eq!(sm.resolve("nonexistent_role"), Style::default());
    }
}
