use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reconciler::RemoteItem;

pub mod batch;

pub use batch::{BatchFetcher, BATCH_SIZE};

#[async_trait]
pub trait ItemFetcher: Send + Sync {
    /// Fetches the issues and pull requests behind `node_ids`.
    ///
    /// Ids the server cannot resolve are absent from the result; callers
    /// match by node id, never by position.
    async fn fetch_all(&self, node_ids: &[String]) -> Result<Vec<RemoteItem>>;
}

pub type SharedFetcher = Arc<dyn ItemFetcher>;
