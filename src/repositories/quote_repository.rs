use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{Quote, RepositoryError, RepositoryResult};

/// Trait defining the interface for saved-quote data access operations
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_all(&self) -> RepositoryResult<Vec<Quote>>;

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Quote>>;

    /// Store a quote under a new id; fails if the id is taken
    async fn insert(&self, quote: Quote) -> RepositoryResult<Quote>;

    /// Overwrite a stored quote; last write wins
    async fn replace(&self, quote: Quote) -> RepositoryResult<Quote>;

    async fn delete(&self, id: &str) -> RepositoryResult<()>;

    async fn exists(&self, id: &str) -> RepositoryResult<bool>;
}

#[derive(Clone, Default)]
pub struct InMemoryQuoteRepository {
    quotes: Arc<RwLock<HashMap<String, Quote>>>,
}

impl InMemoryQuoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn find_all(&self) -> RepositoryResult<Vec<Quote>> {
        Ok(self.quotes.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Quote>> {
        Ok(self.quotes.read().await.get(id).cloned())
    }

    async fn insert(&self, quote: Quote) -> RepositoryResult<Quote> {
        let mut quotes = self.quotes.write().await;
        if quotes.contains_key(&quote.id) {
            return Err(RepositoryError::ConstraintViolation {
                message: format!("Quote {} already exists", quote.id),
            });
        }
        quotes.insert(quote.id.clone(), quote.clone());
        Ok(quote)
    }

    async fn replace(&self, quote: Quote) -> RepositoryResult<Quote> {
        let mut quotes = self.quotes.write().await;
        match quotes.get_mut(&quote.id) {
            Some(existing) => {
                *existing = quote.clone();
                Ok(quote)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: &str) -> RepositoryResult<()> {
        self.quotes
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn exists(&self, id: &str) -> RepositoryResult<bool> {
        Ok(self.quotes.read().await.contains_key(id))
    }
}
