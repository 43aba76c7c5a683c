mod client;
mod source;
mod types;

pub use client::{CatalogClient, CatalogError, FailureKind, DEFAULT_BASE_URL};
pub use source::CatalogSource;
pub use types::{
    CatalogFilters, CatalogPage, Game, GameDetails, NamedRef, PlatformRelease, Requirements,
    Screenshot,
};
