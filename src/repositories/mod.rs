// Repositories module - data access layer

pub mod catalog_repository;
pub mod draft_store;
pub mod quote_repository;


pub use catalog_repository::{CatalogRepository, InMemoryCatalogRepository};
pub use draft_store::{DraftStore, FileDraftStore, InMemoryDraftStore};
pub use quote_repository::{InMemoryQuoteRepository, QuoteRepository};
