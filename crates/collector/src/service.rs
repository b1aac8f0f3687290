use std::collections::HashSet;

use anyhow::Result;
use common::AppError;
use reconciler::{merge_remote_items, CanonicalIssue};
use tracing::{info, instrument};

use crate::fetcher::SharedFetcher;
use crate::metrics;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    /// Remote items returned by the server.
    pub fetched: usize,
    pub merged: usize,
    /// Issues the server returned nothing for; left unchanged.
    pub missing: usize,
}

/// Fetches remote state for a set of canonical issues and merges it back.
pub struct IssueEnricher {
    fetcher: SharedFetcher,
}

impl IssueEnricher {
    pub fn new(fetcher: SharedFetcher) -> Self {
        Self { fetcher }
    }

    /// A fetch failure leaves every issue untouched.
    #[instrument(skip_all, fields(issues = issues.len()))]
    pub async fn enrich(&self, issues: &mut [CanonicalIssue]) -> Result<EnrichReport> {
        let mut seen = HashSet::with_capacity(issues.len());
        let node_ids: Vec<String> = issues
            .iter()
            .map(|issue| issue.node_id.clone())
            .filter(|node_id| seen.insert(node_id.clone()))
            .collect();

        let items = self.fetcher.fetch_all(&node_ids).await?;
        let summary = merge_remote_items(&items, issues);
        metrics::MERGE_MISSING_TOTAL.inc_by(summary.missing as u64);

        let report = EnrichReport {
            fetched: items.len(),
            merged: summary.merged,
            missing: summary.missing,
        };
        info!(
            fetched = report.fetched,
            merged = report.merged,
            missing = report.missing,
            "issues enriched"
        );
        Ok(report)
    }
}

pub async fn load_issues(path: &str) -> common::Result<Vec<CanonicalIssue>> {
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| AppError::io(path, err))?;
    Ok(serde_json::from_str(&data)?)
}

/// Writes pretty-printed JSON to `path`, or to stdout when no path is given.
pub async fn write_issues(path: Option<&str>, issues: &[CanonicalIssue]) -> common::Result<()> {
    let mut data = serde_json::to_vec_pretty(issues)?;
    data.push(b'\n');
    match path {
        Some(path) => tokio::fs::write(path, data)
            .await
            .map_err(|err| AppError::io(path, err)),
        None => {
            use tokio::io::AsyncWriteExt;
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&data)
                .await
                .map_err(|err| AppError::io("<stdout>", err))?;
            stdout
                .flush()
                .await
                .map_err(|err| AppError::io("<stdout>", err))
        }
    }
}
