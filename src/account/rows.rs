use super::session::AuthClient;
use super::AccountError;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Longest comment accepted locally.
pub const MAX_COMMENT_CHARS: usize = 2000;

/// A comment row as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: String,
    pub game_id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct WishlistRow {
    game_id: u64,
}

/// Comment and wishlist rows on the hosted row store.
///
/// Every call runs as the signed-in user; row-level policies on the backend
/// decide what that user may touch.
pub struct RowStore {
    auth: Arc<AuthClient>,
}

impl RowStore {
    pub fn new(auth: Arc<AuthClient>) -> Self {
        Self { auth }
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// Comments on a game, newest first. Readable without signing in.
    pub async fn comments_for_game(&self, game_id: u64) -> Result<Vec<Comment>, AccountError> {
        let token = self.auth.access_token().await.ok().map(|(token, _)| token);
        let backend = self.auth.backend();
        let request = backend
            .request(Method::GET, "/rest/v1/comments", token.as_deref())
            .query(&[
                ("select", "*".to_string()),
                ("game_id", format!("eq.{game_id}")),
                ("order", "created_at.desc".to_string()),
            ]);
        backend.send_json(request).await
    }

    /// The signed-in user's comments across all games, newest first.
    pub async fn comments_for_user(&self) -> Result<Vec<Comment>, AccountError> {
        let (token, user) = self.auth.access_token().await?;
        let backend = self.auth.backend();
        let request = backend
            .request(Method::GET, "/rest/v1/comments", Some(token.as_ref()))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user.id)),
                ("order", "created_at.desc".to_string()),
            ]);
        backend.send_json(request).await
    }

    /// Posts a comment and returns the stored row.
    pub async fn insert_comment(&self, game_id: u64, content: &str) -> Result<Comment, AccountError> {
        let content = validate_comment(content)?;
        let (token, user) = self.auth.access_token().await?;
        let backend = self.auth.backend();
        let request = backend
            .request(Method::POST, "/rest/v1/comments", Some(token.as_ref()))
            .header("Prefer", "return=representation")
            .json(&json!([{ "user_id": user.id, "game_id": game_id, "content": content }]));

        let mut rows: Vec<Comment> = backend.send_json(request).await?;
        let row = rows
            .pop()
            .ok_or_else(|| AccountError::Malformed("insert returned no row".into()))?;
        tracing::debug!(comment_id = row.id, game_id, "Comment posted");
        Ok(row)
    }

    /// Deletes one of the signed-in user's comments.
    pub async fn delete_comment(&self, comment_id: i64) -> Result<(), AccountError> {
        let (token, user) = self.auth.access_token().await?;
        let backend = self.auth.backend();
        let request = backend
            .request(Method::DELETE, "/rest/v1/comments", Some(token.as_ref()))
            .query(&[
                ("id", format!("eq.{comment_id}")),
                ("user_id", format!("eq.{}", user.id)),
            ]);
        backend.send(request).await?;
        tracing::debug!(comment_id, "Comment deleted");
        Ok(())
    }

    // ========================================================================
    // Wishlist
    // ========================================================================

    pub async fn wishlist_game_ids(&self) -> Result<Vec<u64>, AccountError> {
        let (token, user) = self.auth.access_token().await?;
        let backend = self.auth.backend();
        let request = backend
            .request(Method::GET, "/rest/v1/wishlists", Some(token.as_ref()))
            .query(&[
                ("select", "game_id".to_string()),
                ("user_id", format!("eq.{}", user.id)),
            ]);
        let rows: Vec<WishlistRow> = backend.send_json(request).await?;
        Ok(rows.into_iter().map(|r| r.game_id).collect())
    }

    /// False when nobody is signed in.
    pub async fn is_wishlisted(&self, game_id: u64) -> Result<bool, AccountError> {
        let (token, user) = match self.auth.access_token().await {
            Ok(pair) => pair,
            Err(AccountError::NotSignedIn) => return Ok(false),
            Err(e) => return Err(e),
        };
        let backend = self.auth.backend();
        let request = backend
            .request(Method::GET, "/rest/v1/wishlists", Some(token.as_ref()))
            .query(&[
                ("select", "game_id".to_string()),
                ("user_id", format!("eq.{}", user.id)),
                ("game_id", format!("eq.{game_id}")),
                ("limit", "1".to_string()),
            ]);
        let rows: Vec<WishlistRow> = backend.send_json(request).await?;
        Ok(!rows.is_empty())
    }

    pub async fn add_to_wishlist(&self, game_id: u64) -> Result<(), AccountError> {
        let (token, user) = self.auth.access_token().await?;
        let backend = self.auth.backend();
        let request = backend
            .request(Method::POST, "/rest/v1/wishlists", Some(token.as_ref()))
            .header("Prefer", "return=minimal")
            .json(&json!([{ "user_id": user.id, "game_id": game_id }]));
        backend.send(request).await?;
        tracing::debug!(game_id, "Added to wishlist");
        Ok(())
    }

    pub async fn remove_from_wishlist(&self, game_id: u64) -> Result<(), AccountError> {
        let (token, user) = self.auth.access_token().await?;
        let backend = self.auth.backend();
        let request = backend
            .request(Method::DELETE, "/rest/v1/wishlists", Some(token.as_ref()))
            .query(&[
                ("user_id", format!("eq.{}", user.id)),
                ("game_id", format!("eq.{game_id}")),
            ]);
        backend.send(request).await?;
        tracing::debug!(game_id, "Removed from wishlist");
        Ok(())
    }
}

/// Trims a comment and rejects blank or oversized text.
pub(crate) fn validate_comment(content: &str) -> Result<&str, AccountError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AccountError::InvalidInput("Comment is empty".into()));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(AccountError::InvalidInput(format!(
            "Comment is longer than {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_comment() {
        assert_eq!(validate_comment("  great game \n").unwrap(), "great game");
        assert!(validate_comment("   ").is_err());
        assert!(validate_comment(&"x".repeat(MAX_COMMENT_CHARS + 1)).is_err());
    }

    #[test]
    fn test_comment_row_decodes_backend_timestamp() {
        let row: Comment = serde_json::from_str(
            r#"{"id": 12, "user_id": "u-1", "game_id": 3498, "content": "Classic", "created_at": "2024-05-01T10:15:30.123456+00:00"}"#,
        )
        .unwrap();
        assert_eq!(row.id, 12);
        assert_eq!(row.created_at.format("%Y-%m-%d").to_string(), "2024-05-01");
    }
}
