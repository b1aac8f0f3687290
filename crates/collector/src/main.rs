use std::sync::Arc;

use anyhow::Result;
use collector::service::{load_issues, write_issues};
use collector::{metrics, BatchFetcher, HttpGraphqlTransport, IssueEnricher, QueryTemplate};
use common::{config::AppConfig, logging, AppError};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    let template = QueryTemplate::build(
        config.github.is_primary_host(),
        config.github.server_version_or_default(),
    );
    let transport = Arc::new(HttpGraphqlTransport::from_config(&config.github)?);
    info!(
        endpoint = %transport.endpoint(),
        excluded = template.excluded().count(),
        "collector started"
    );
    let enricher = IssueEnricher::new(Arc::new(BatchFetcher::new(transport, template)));

    let mut issues = load_issues(&config.enricher.input_path).await?;
    let report = enricher
        .enrich(&mut issues)
        .await
        .map_err(AppError::fetch)?;
    write_issues(config.enricher.output_path.as_deref(), &issues).await?;

    if let Some(path) = &config.observability.metrics_path {
        tokio::fs::write(path, metrics::render()?)
            .await
            .map_err(|err| AppError::io(path.as_str(), err))?;
    }

    info!(
        fetched = report.fetched,
        merged = report.merged,
        missing = report.missing,
        "collector finished"
    );
    Ok(())
}
