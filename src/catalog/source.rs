use crate::catalog::client::CatalogError;
use crate::catalog::types::{CatalogFilters, CatalogPage, GameDetails, NamedRef};
use async_trait::async_trait;

/// Read-only games catalog.
///
/// The feed controller only ever talks to this trait, so tests and alternate
/// backends can stand in for [`CatalogClient`](crate::catalog::CatalogClient).
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Browse mode: one page ordered by rating, highest first.
    async fn list_items(
        &self,
        page: u32,
        page_size: u32,
        filters: &CatalogFilters,
    ) -> Result<CatalogPage, CatalogError>;

    /// Free-text search mode. No ordering is imposed; the source ranks results.
    async fn search_items(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
        filters: &CatalogFilters,
    ) -> Result<CatalogPage, CatalogError>;

    async fn get_item(&self, id: u64) -> Result<GameDetails, CatalogError>;

    async fn list_genres(&self) -> Result<Vec<NamedRef>, CatalogError>;

    /// Parent platforms (PC, PlayStation, Xbox, ...), used by the platform filter.
    async fn list_platforms(&self) -> Result<Vec<NamedRef>, CatalogError>;
}
