use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use quote_builder_rs::{
    init_observability,
    models::{Quote, QuoteError, Service},
    repositories::{FileDraftStore, InMemoryCatalogRepository},
    services::{format_currency, Autosaver, CatalogService, QuoteEditor},
    shutdown_observability, Config, Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_environment()?;

    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        config.observability.otlp_endpoint.as_deref(),
        &config.observability.log_level,
        config.observability.enable_json_logging,
    )?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );

    let metrics = Arc::new(Metrics::new()?);

    let catalog_service = CatalogService::new(Arc::new(InMemoryCatalogRepository::new()))
        .with_metrics(metrics.clone());
    if let Some(path) = &config.catalog.catalog_path {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let services: Vec<Service> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing catalog {}", path.display()))?;
        let count = catalog_service.import_services(services).await?;
        info!(count, path = %path.display(), "Catalog imported");
    } else {
        warn!("No catalog configured; starting with an empty catalog");
    }
    let catalog = Arc::new(catalog_service.load_catalog().await?);

    let autosaver = Autosaver::new(
        Arc::new(FileDraftStore::new(config.editor.draft_dir.clone())),
        config.editor.draft_key.clone(),
    )
    .with_metrics(metrics.clone());
    let draft = match autosaver.restore().await {
        Ok(draft) => draft,
        Err(QuoteError::ValidationError { message }) => {
            warn!(error = %message, "Saved draft is invalid; starting a new quote");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let restored = draft.is_some();
    let quote = draft.unwrap_or_else(|| Quote::new("Untitled quote".to_string()));

    let mut editor = QuoteEditor::new(quote, catalog, config.editor.autosave_debounce())
        .with_metrics(metrics.clone());

    let issues = editor.dependency_issues();
    for issue in &issues {
        warn!(%issue, "Unsatisfied dependency in draft");
    }

    let totals = editor.totals();
    info!(
        quote_id = %editor.quote().id,
        restored,
        days = editor.quote().days.len(),
        services = editor.quote().total_entries(),
        subtotal = %format_currency(totals.subtotal),
        markups = %format_currency(totals.markups_total),
        discount = %format_currency(totals.discount_amount),
        "Quote ready"
    );
    println!("{}: {}", editor.quote().title, totals.summary());

    if !restored {
        editor.request_save();
        autosaver.flush(&mut editor, Instant::now()).await?;
    }

    shutdown_observability().await;
    Ok(())
}
