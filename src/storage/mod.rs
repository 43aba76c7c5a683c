mod game_cache;
mod preferences;
mod schema;
mod types;

pub use schema::Database;
pub use types::{CacheStats, DatabaseError};
