use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::models::{Quote, QuoteResult, Validate};
use crate::observability::Metrics;
use crate::repositories::DraftStore;
use crate::services::QuoteEditor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Idle,
    /// Edited since the last write, waiting for the quiet period
    Pending,
    Saving,
    Saved {
        at: DateTime<Utc>,
    },
    Failed {
        message: String,
    },
}

/// Quiet-period tracker; `revision` counts edits so stale acknowledgements can be told apart
#[derive(Debug, Clone)]
pub struct DebouncedSave {
    quiet_period: Duration,
    dirty_since: Option<Instant>,
    forced: bool,
    revision: u64,
}

impl DebouncedSave {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            dirty_since: None,
            forced: false,
            revision: 0,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// Record an edit at `now`, restarting the quiet period
    pub fn touch(&mut self, now: Instant) {
        self.dirty_since = Some(now);
        self.revision += 1;
    }

    /// Make the next `due` check succeed regardless of the quiet period
    pub fn force(&mut self) {
        self.forced = true;
    }

    pub fn due(&self, now: Instant) -> bool {
        if self.forced {
            return true;
        }
        self.dirty_since
            .map(|since| now.saturating_duration_since(since) >= self.quiet_period)
            .unwrap_or(false)
    }

    /// Claim the pending write, returning the revision it covers
    pub fn take(&mut self, now: Instant) -> Option<u64> {
        if !self.due(now) {
            return None;
        }
        self.dirty_since = None;
        self.forced = false;
        Some(self.revision)
    }
}

/// Snapshot handed to the persistence layer
#[derive(Debug, Clone)]
pub struct PendingSave {
    pub revision: u64,
    pub quote: Quote,
}

/// Writes the editor's quote to a [`DraftStore`] under a fixed key
pub struct Autosaver {
    store: Arc<dyn DraftStore>,
    key: String,
    metrics: Option<Arc<Metrics>>,
}

impl Autosaver {
    pub fn new(store: Arc<dyn DraftStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write the draft if the editor's quiet period has elapsed.
    ///
    /// Returns whether a write happened. Store errors are recorded on the
    /// editor and also returned.
    #[instrument(skip(self, editor, now), fields(key = %self.key))]
    pub async fn flush(&self, editor: &mut QuoteEditor, now: Instant) -> QuoteResult<bool> {
        let Some(pending) = editor.pending_save(now) else {
            return Ok(false);
        };

        match self.store.store(&self.key, &pending.quote).await {
            Ok(()) => {
                editor.mark_saved(pending.revision, Utc::now());
                if let Some(metrics) = &self.metrics {
                    metrics.record_draft_write(true);
                }
                info!(revision = pending.revision, "Draft saved");
                Ok(true)
            }
            Err(e) => {
                warn!(revision = pending.revision, error = %e, "Draft save failed");
                editor.mark_save_failed(e.to_string());
                if let Some(metrics) = &self.metrics {
                    metrics.record_draft_write(false);
                }
                Err(e.into())
            }
        }
    }

    /// The previously saved draft, if any. A draft that fails quote
    /// validation is returned as an error and left in the store.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn restore(&self) -> QuoteResult<Option<Quote>> {
        let draft = self.store.load(&self.key).await?;
        if let Some(quote) = &draft {
            if let Err(e) = quote.validate() {
                warn!(quote_id = %quote.id, error = %e, "Draft rejected");
                return Err(e.into());
            }
            info!(quote_id = %quote.id, "Draft restored");
        }
        Ok(draft)
    }

    pub async fn clear(&self) -> QuoteResult<()> {
        self.store.clear(&self.key).await?;
        Ok(())
    }
}
