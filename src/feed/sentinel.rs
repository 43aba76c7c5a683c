/// Decides when the end of the catalog list has scrolled into view.
///
/// The terminal has no intersection observer, so the render loop asks after
/// every frame whether the last row lies inside the viewport (optionally with
/// a few rows of lookahead).
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewportSentinel {
    lookahead: usize,
}

impl ViewportSentinel {
    pub fn new(lookahead: usize) -> Self {
        Self { lookahead }
    }

    /// `offset` is the index of the first visible row, `viewport_rows` how
    /// many rows fit on screen.
    pub fn is_visible(&self, offset: usize, viewport_rows: usize, item_count: usize) -> bool {
        if item_count == 0 || viewport_rows == 0 {
            return false;
        }
        let last_visible = offset
            .saturating_add(viewport_rows)
            .saturating_add(self.lookahead);
        last_visible >= item_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_list_is_visible() {
        assert!(ViewportSentinel::default().is_visible(0, 20, 12));
    }

    #[test]
    fn test_scrolled_to_bottom() {
        let sentinel = ViewportSentinel::default();
        assert!(!sentinel.is_visible(0, 10, 24));
        assert!(!sentinel.is_visible(13, 10, 24));
        assert!(sentinel.is_visible(14, 10, 24));
    }

    #[test]
    fn test_lookahead_fires_early() {
        assert!(ViewportSentinel::new(3).is_visible(11, 10, 24));
    }

    #[test]
    fn test_empty_list_never_visible() {
        assert!(!ViewportSentinel::default().is_visible(0, 10, 0));
        assert!(!ViewportSentinel::default().is_visible(0, 0, 5));
    }
}
