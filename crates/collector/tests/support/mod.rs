#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use collector::GraphqlTransport;
use serde_json::{json, Value};

/// Answers `nodes(ids: ...)` queries from canned node bodies.
#[derive(Default)]
pub struct StubTransport {
    requests: Mutex<Vec<Vec<String>>>,
    nodes: HashMap<String, Value>,
    fail_marker: Option<String>,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    completed: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node_id: &str, body: Value) -> Self {
        self.nodes.insert(node_id.to_string(), body);
        self
    }

    /// Batches containing `node_id` fail without delay.
    pub fn failing_on(mut self, node_id: &str) -> Self {
        self.fail_marker = Some(node_id.to_string());
        self
    }

    /// Successful batches wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphqlTransport for StubTransport {
    async fn request(&self, query: &str) -> Result<Value> {
        let ids = requested_ids(query);
        self.requests.lock().unwrap().push(ids.clone());

        let failing = self
            .fail_marker
            .as_ref()
            .map_or(false, |marker| ids.contains(marker));

        let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(current, Ordering::SeqCst);
        if !failing && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);

        if failing {
            return Err(anyhow!("server rejected batch"));
        }
        let nodes: Vec<Value> = ids
            .iter()
            .map(|id| self.nodes.get(id).cloned().unwrap_or_else(|| issue_node(id)))
            .collect();
        Ok(json!({ "nodes": nodes }))
    }
}

/// Pulls the quoted id list out of a rendered query.
pub fn requested_ids(query: &str) -> Vec<String> {
    let start = query.find("ids: [").expect("ids argument") + "ids: ".len();
    let end = start + query[start..].find(']').expect("closing bracket") + 1;
    serde_json::from_str(&query[start..end]).expect("id list")
}

pub fn issue_node(node_id: &str) -> Value {
    json!({
        "node_id": node_id,
        "__typename": "Issue",
        "updatedAt": "2024-03-01T00:00:00Z",
        "author": {"login": "octocat"},
        "number": 1,
        "repository": {"nameWithOwner": "acme/widgets", "isPrivate": false},
        "participants": {"nodes": [{"login": "octocat", "name": null, "avatarUrl": "o.png"}]},
        "projectCards": {"nodes": []},
        "timelineItems": {"nodes": []}
    })
}

pub fn node_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("I_{i:03}")).collect()
}
