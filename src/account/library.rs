use super::rows::{validate_comment, Comment};
use super::AccountError;
use crate::catalog::Game;
use chrono::Utc;

/// A local mutation applied ahead of the backend's answer.
///
/// Hand it back to the list that produced it: `commit` once the remote call
/// succeeded, `rollback` if it failed.
#[must_use = "pending changes must be committed or rolled back"]
#[derive(Debug, Clone, PartialEq)]
pub enum PendingChange {
    CommentInserted { local_id: i64 },
    CommentDeleted { index: usize, comment: Comment },
    WishlistAdded { game_id: u64 },
    WishlistRemoved { index: usize, entry: WishlistEntry },
}

// ============================================================================
// Comments
// ============================================================================

/// Comments shown on one game's detail page, newest first.
#[derive(Debug, Clone)]
pub struct CommentThread {
    game_id: u64,
    comments: Vec<Comment>,
    next_local_id: i64,
}

impl CommentThread {
    pub fn new(game_id: u64, comments: Vec<Comment>) -> Self {
        Self {
            game_id,
            comments,
            next_local_id: -1,
        }
    }

    pub fn game_id(&self) -> u64 {
        self.game_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// True for comments that exist only locally, waiting on the backend.
    pub fn is_pending(comment: &Comment) -> bool {
        comment.id < 0
    }

    /// Shows a new comment at the top immediately, under a temporary id.
    pub fn insert(&mut self, user_id: &str, content: &str) -> Result<PendingChange, AccountError> {
        let content = validate_comment(content)?;
        let local_id = self.next_local_id;
        self.next_local_id -= 1;
        self.comments.insert(
            0,
            Comment {
                id: local_id,
                user_id: user_id.to_string(),
                game_id: self.game_id,
                content: content.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(PendingChange::CommentInserted { local_id })
    }

    /// Hides a comment immediately. `None` if no comment has that id.
    pub fn remove(&mut self, comment_id: i64) -> Option<PendingChange> {
        let index = self.comments.iter().position(|c| c.id == comment_id)?;
        let comment = self.comments.remove(index);
        Some(PendingChange::CommentDeleted { index, comment })
    }

    /// Confirms a change. For inserts, `saved` is the row the backend stored
    /// and replaces the temporary entry.
    pub fn commit(&mut self, change: PendingChange, saved: Option<Comment>) {
        if let PendingChange::CommentInserted { local_id } = change {
            let Some(pos) = self.comments.iter().position(|c| c.id == local_id) else {
                return;
            };
            match saved {
                Some(row) => self.comments[pos] = row,
                None => {
                    tracing::warn!(local_id, "Comment insert confirmed without a row");
                    self.comments.remove(pos);
                }
            }
        }
    }

    /// Reverts a change the backend refused.
    pub fn rollback(&mut self, change: PendingChange) {
        match change {
            PendingChange::CommentInserted { local_id } => {
                self.comments.retain(|c| c.id != local_id);
            }
            PendingChange::CommentDeleted { index, comment } => {
                if self.comments.iter().any(|c| c.id == comment.id) {
                    return;
                }
                let index = index.min(self.comments.len());
                self.comments.insert(index, comment);
            }
            other => {
                tracing::debug!(change = ?other, "Ignoring non-comment change");
            }
        }
    }
}

// ============================================================================
// Wishlist
// ============================================================================

/// One wishlisted game. `game` is filled in once its details load.
#[derive(Debug, Clone, PartialEq)]
pub struct WishlistEntry {
    pub game_id: u64,
    pub game: Option<Game>,
}

/// The signed-in user's wishlist, in the order the backend returned it.
#[derive(Debug, Clone, Default)]
pub struct WishlistState {
    entries: Vec<WishlistEntry>,
}

impl WishlistState {
    pub fn from_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        let mut state = Self::default();
        for game_id in ids {
            if !state.contains(game_id) {
                state.entries.push(WishlistEntry {
                    game_id,
                    game: None,
                });
            }
        }
        state
    }

    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, game_id: u64) -> bool {
        self.entries.iter().any(|e| e.game_id == game_id)
    }

    /// Attaches loaded details to an entry.
    pub fn fill(&mut self, game: Game) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.game_id == game.id) {
            entry.game = Some(game);
        }
    }

    /// Adds the game if absent, removes it if present.
    pub fn toggle(&mut self, game_id: u64, game: Option<Game>) -> PendingChange {
        match self.remove(game_id) {
            Some(change) => change,
            None => {
                self.entries.push(WishlistEntry { game_id, game });
                PendingChange::WishlistAdded { game_id }
            }
        }
    }

    pub fn remove(&mut self, game_id: u64) -> Option<PendingChange> {
        let index = self.entries.iter().position(|e| e.game_id == game_id)?;
        let entry = self.entries.remove(index);
        Some(PendingChange::WishlistRemoved { index, entry })
    }

    pub fn commit(&mut self, change: PendingChange) {
        tracing::trace!(change = ?change, "Wishlist change confirmed");
    }

    pub fn rollback(&mut self, change: PendingChange) {
        match change {
            PendingChange::WishlistAdded { game_id } => {
                self.entries.retain(|e| e.game_id != game_id);
            }
            PendingChange::WishlistRemoved { index, entry } => {
                if self.contains(entry.game_id) {
                    return;
                }
                let index = index.min(self.entries.len());
                self.entries.insert(index, entry);
            }
            other => {
                tracing::debug!(change = ?other, "Ignoring non-wishlist change");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn comment(id: i64, content: &str) -> Comment {
        Comment {
            id,
            user_id: "u-1".into(),
            game_id: 10,
            content: content.into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        }
    }

    fn game(id: u64) -> Game {
        Game {
            id,
            name: Arc::from("Hades"),
            cover_image: None,
            rating: 4.4,
            released: None,
            genres: Vec::new(),
            platforms: Vec::new(),
        }
    }

    #[test]
    fn test_insert_then_commit_replaces_placeholder() {
        let mut thread = CommentThread::new(10, vec![comment(1, "older")]);
        let change = thread.insert("u-1", "  new take  ").unwrap();
        assert_eq!(thread.comments()[0].content, "new take");
        assert!(CommentThread::is_pending(&thread.comments()[0]));

        thread.commit(change, Some(comment(2, "new take")));
        let ids: Vec<i64> = thread.comments().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_insert_rollback_removes_placeholder() {
        let mut thread = CommentThread::new(10, vec![comment(1, "older")]);
        let change = thread.insert("u-1", "doomed").unwrap();
        thread.rollback(change);
        assert_eq!(thread.comments(), &[comment(1, "older")]);
    }

    #[test]
    fn test_blank_comment_rejected_locally() {
        let mut thread = CommentThread::new(10, Vec::new());
        assert!(thread.insert("u-1", "   ").is_err());
        assert!(thread.comments().is_empty());
    }

    #[test]
    fn test_delete_rollback_restores_position() {
        let mut thread =
            CommentThread::new(10, vec![comment(3, "c"), comment(2, "b"), comment(1, "a")]);
        let change = thread.remove(2).unwrap();
        assert_eq!(thread.comments().len(), 2);
        thread.rollback(change);
        let ids: Vec<i64> = thread.comments().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert!(thread.remove(99).is_none());
    }

    #[test]
    fn test_wishlist_toggle_and_rollback() {
        let mut wishlist = WishlistState::from_ids([5, 6, 5]);
        assert_eq!(wishlist.len(), 2);

        let change = wishlist.toggle(7, Some(game(7)));
        assert!(wishlist.contains(7));
        wishlist.rollback(change);
        assert!(!wishlist.contains(7));

        let change = wishlist.toggle(5, None);
        assert!(!wishlist.contains(5));
        wishlist.rollback(change);
        let ids: Vec<u64> = wishlist.entries().iter().map(|e| e.game_id).collect();
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn test_wishlist_fill_and_commit() {
        let mut wishlist = WishlistState::from_ids([9]);
        wishlist.fill(game(9));
        assert!(wishlist.entries()[0].game.is_some());

        let change = wishlist.remove(9).unwrap();
        wishlist.commit(change);
        assert!(wishlist.is_empty());
    }
}
