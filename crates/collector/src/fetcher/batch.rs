use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reconciler::{resolve_last_activity, RemoteItem};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::fetcher::ItemFetcher;
use crate::metrics;
use crate::query::QueryTemplate;
use crate::transport::GraphqlTransport;

/// Node ids per `nodes(ids: ...)` request.
pub const BATCH_SIZE: usize = 25;

const OP: &str = "nodes";

pub struct BatchFetcher {
    transport: Arc<dyn GraphqlTransport>,
    template: QueryTemplate,
}

impl BatchFetcher {
    pub fn new(transport: Arc<dyn GraphqlTransport>, template: QueryTemplate) -> Self {
        Self {
            transport,
            template,
        }
    }

    #[instrument(skip(self, node_ids), fields(batch = index, size = node_ids.len()))]
    async fn fetch_batch(&self, index: usize, node_ids: &[&str]) -> Result<Vec<RemoteItem>> {
        let query = self.template.render(node_ids);
        let start = Instant::now();
        let response = self.transport.request(&query).await;
        metrics::FETCH_LATENCY_SECONDS
            .with_label_values(&[OP])
            .observe(start.elapsed().as_secs_f64());

        let data = match response {
            Ok(data) => data,
            Err(err) => {
                metrics::FETCH_REQUESTS_TOTAL
                    .with_label_values(&[OP, "error"])
                    .inc();
                return Err(err);
            }
        };
        metrics::FETCH_REQUESTS_TOTAL
            .with_label_values(&[OP, "ok"])
            .inc();

        let mut items = decode_nodes(data)?;
        for item in &mut items {
            let activity = resolve_last_activity(item);
            item.core_mut().last_activity = Some(activity);
        }
        metrics::FETCH_ITEMS_TOTAL
            .with_label_values(&[OP])
            .inc_by(items.len() as u64);
        debug!(items = items.len(), "batch decoded");
        Ok(items)
    }
}

#[async_trait]
impl ItemFetcher for BatchFetcher {
    async fn fetch_all(&self, node_ids: &[String]) -> Result<Vec<RemoteItem>> {
        let node_ids: Vec<&str> = node_ids
            .iter()
            .map(String::as_str)
            .filter(|id| !id.is_empty())
            .collect();
        if node_ids.is_empty() {
            return Ok(Vec::new());
        }

        let batches: Vec<&[&str]> = node_ids.chunks(BATCH_SIZE).collect();
        let total = batches.len();
        debug!(ids = node_ids.len(), batches = total, "fetching nodes");

        // Every batch runs to completion; the first failure in batch order wins.
        let results = join_all(
            batches
                .iter()
                .enumerate()
                .map(|(index, batch)| self.fetch_batch(index, batch)),
        )
        .await;

        let mut items = Vec::with_capacity(node_ids.len());
        for (index, result) in results.into_iter().enumerate() {
            let batch_items =
                result.with_context(|| format!("node batch {} of {total} failed", index + 1))?;
            items.extend(batch_items);
        }
        Ok(items)
    }
}

fn decode_nodes(data: Value) -> Result<Vec<RemoteItem>> {
    let nodes = match data {
        Value::Object(mut map) => map.remove("nodes"),
        _ => None,
    };
    let Some(Value::Array(nodes)) = nodes else {
        return Err(anyhow!("graphql data has no nodes list"));
    };

    let mut items = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.is_null() {
            warn!("server returned a null node");
            metrics::NODES_SKIPPED_TOTAL
                .with_label_values(&["null"])
                .inc();
            continue;
        }

        let type_name = node
            .get("__typename")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if !matches!(type_name.as_str(), "Issue" | "PullRequest") {
            let node_id = node.get("node_id").and_then(Value::as_str).unwrap_or("-");
            warn!(node_id, type_name = %type_name, "skipping node that is neither an issue nor a pull request");
            metrics::NODES_SKIPPED_TOTAL
                .with_label_values(&["unsupported_type"])
                .inc();
            continue;
        }

        let item: RemoteItem = serde_json::from_value(node)
            .with_context(|| format!("malformed {type_name} node in graphql response"))?;
        items.push(item);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_skips_null_and_foreign_nodes() {
        let data = json!({"nodes": [
            null,
            {"node_id": "U_1", "__typename": "User"},
            {"node_id": "I_1", "__typename": "Issue", "updatedAt": "2024-01-01T00:00:00Z"}
        ]});
        let items = decode_nodes(data).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].node_id(), "I_1");
    }

    #[test]
    fn decode_rejects_missing_nodes_list() {
        assert!(decode_nodes(json!({"node": {}})).is_err());
        assert!(decode_nodes(json!(null)).is_err());
    }

    #[test]
    fn decode_reports_malformed_issue() {
        let err = decode_nodes(json!({"nodes": [
            {"node_id": "I_1", "__typename": "Issue", "updatedAt": "yesterday"}
        ]}))
        .unwrap_err();
        assert!(err.to_string().contains("malformed Issue node"));
    }
}
