use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another gamedex process has the database open for writing
    #[error("Another instance of gamedex appears to be running. Please close it and try again.")]
    InstanceLocked,

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all mean
    /// another process got there first.
    pub(crate) fn is_lock_message(message: &str) -> bool {
        let message = message.to_lowercase();
        message.contains("database is locked")
            || message.contains("database table is locked")
            || message.contains("sqlite_busy")
            || message.contains("sqlite_locked")
            || message.contains("unable to open database file")
    }

    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if Self::is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

// ============================================================================
// Cache Types
// ============================================================================

/// Summary of the detail cache, shown in the profile view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: i64,
    pub expired_entries: i64,
    pub newest_entry: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_messages_detected() {
        assert!(DatabaseError::is_lock_message("error returned from database: (code: 5) database is locked"));
        assert!(DatabaseError::is_lock_message("SQLITE_BUSY"));
        assert!(!DatabaseError::is_lock_message("no such table: games"));
    }

    #[test]
    fn test_instance_locked_message_names_app() {
        assert!(DatabaseError::InstanceLocked.to_string().contains("gamedex"));
    }
}
