use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{Quote, QuoteError, QuoteResult, RepositoryError, Validate};
use crate::repositories::QuoteRepository;

/// Explicit save, load and housekeeping of named quotes
pub struct SavedQuoteService {
    repository: Arc<dyn QuoteRepository>,
}

impl SavedQuoteService {
    pub fn new(repository: Arc<dyn QuoteRepository>) -> Self {
        Self { repository }
    }

    /// Saved quotes, most recently updated first
    #[instrument(skip(self))]
    pub async fn list_quotes(&self, include_archived: bool) -> QuoteResult<Vec<Quote>> {
        let mut quotes: Vec<Quote> = self
            .repository
            .find_all()
            .await?
            .into_iter()
            .filter(|q| include_archived || !q.archived)
            .collect();
        quotes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(quotes)
    }

    /// Save as a new quote; the stored copy always gets a fresh id
    #[instrument(skip(self, quote), fields(title = %quote.title))]
    pub async fn save_quote(&self, quote: &Quote) -> QuoteResult<Quote> {
        quote.validate()?;

        let mut copy = quote.clone();
        copy.id = Uuid::new_v4().to_string();
        copy.archived = false;
        copy.touch();

        let saved = self.repository.insert(copy).await?;
        info!(quote_id = %saved.id, "Quote saved");
        Ok(saved)
    }

    /// Replace the stored quote `id` with `quote`'s contents
    #[instrument(skip(self, quote))]
    pub async fn overwrite_quote(&self, id: &str, quote: &Quote) -> QuoteResult<Quote> {
        quote.validate()?;
        let existing = self.load_quote(id).await?;

        let mut copy = quote.clone();
        copy.id = existing.id;
        copy.created_at = existing.created_at;
        copy.archived = existing.archived;
        copy.touch();

        let saved = self
            .repository
            .replace(copy)
            .await
            .map_err(|e| not_found_as_quote(e, id))?;
        info!(quote_id = %saved.id, "Quote overwritten");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn load_quote(&self, id: &str) -> QuoteResult<Quote> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| QuoteError::QuoteNotFound { id: id.to_string() })
    }

    #[instrument(skip(self))]
    pub async fn delete_quote(&self, id: &str) -> QuoteResult<()> {
        self.repository
            .delete(id)
            .await
            .map_err(|e| not_found_as_quote(e, id))?;
        info!(quote_id = id, "Quote deleted");
        Ok(())
    }

    /// Hide a quote from the default listing and the calendar
    #[instrument(skip(self))]
    pub async fn archive_quote(&self, id: &str) -> QuoteResult<Quote> {
        let mut quote = self.load_quote(id).await?;
        quote.archived = true;
        quote.touch();
        let archived = self.repository.replace(quote).await?;
        info!(quote_id = id, "Quote archived");
        Ok(archived)
    }
}

fn not_found_as_quote(error: RepositoryError, id: &str) -> QuoteError {
    match error {
        RepositoryError::NotFound => QuoteError::QuoteNotFound { id: id.to_string() },
        other => other.into(),
    }
}
