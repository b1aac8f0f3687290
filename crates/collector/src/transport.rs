use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use common::config::GithubConfig;
use http::{header, Request, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum GithubApiError {
    #[error("github api error: {status} for {endpoint}")]
    Http {
        status: StatusCode,
        endpoint: String,
    },
    #[error("graphql error: {message}")]
    Graphql { message: String },
    #[error("graphql response for {endpoint} carried no data")]
    MissingData { endpoint: String },
}

impl GithubApiError {
    pub fn status(status: StatusCode, endpoint: impl Into<String>) -> Self {
        Self::Http {
            status,
            endpoint: endpoint.into(),
        }
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        match *self {
            GithubApiError::Http { status, .. } => Some(status),
            _ => None,
        }
    }
}

/// Executes one GraphQL document against the server.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// Returns the response's `data` object.
    async fn request(&self, query: &str) -> Result<Value>;
}

pub struct HttpGraphqlTransport {
    client: reqwest::Client,
    endpoint: Url,
    user_agent: String,
    token: Option<String>,
}

impl HttpGraphqlTransport {
    pub fn new(endpoint: &str, user_agent: String, token: Option<String>) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("invalid graphql endpoint {endpoint}"))?;
        let client = reqwest::Client::builder()
            .user_agent(user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            endpoint,
            user_agent,
            token: token.filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn from_config(config: &GithubConfig) -> Result<Self> {
        Self::new(
            &config.graphql_endpoint(),
            config.user_agent.clone(),
            config.token.clone(),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn build_request(&self, query: &str) -> Result<Request<Vec<u8>>> {
        let payload = json!({ "query": query });
        let mut builder = Request::builder()
            .method("POST")
            .uri(self.endpoint.as_str())
            .header(header::USER_AGENT, self.user_agent.clone())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = &self.token {
            builder = builder.header(header::AUTHORIZATION, format!("bearer {token}"));
        }
        Ok(builder.body(serde_json::to_vec(&payload)?)?)
    }
}

#[async_trait]
impl GraphqlTransport for HttpGraphqlTransport {
    #[instrument(skip(self, query), fields(endpoint = %self.endpoint, query_bytes = query.len()))]
    async fn request(&self, query: &str) -> Result<Value> {
        let (parts, body) = self.build_request(query)?.into_parts();
        let response = self
            .client
            .request(parts.method, self.endpoint.clone())
            .headers(parts.headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                body = %body_preview(&bytes),
                "graphql request rejected"
            );
            return Err(GithubApiError::status(status, self.endpoint.path()).into());
        }

        let value: Value = serde_json::from_slice(&bytes)?;
        debug!(status = status.as_u16(), "graphql response received");
        extract_data(value, self.endpoint.path())
    }
}

/// Unwraps the `data` object of a GraphQL response envelope.
///
/// Errors that only report unresolvable node ids are tolerated when data is
/// present; the affected entries come back as null nodes.
pub fn extract_data(mut envelope: Value, endpoint: &str) -> Result<Value> {
    let data = envelope
        .get_mut("data")
        .map(Value::take)
        .filter(|data| !data.is_null());

    if let Some(errors) = envelope.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            match data {
                Some(data) if errors.iter().all(is_not_found) => {
                    warn!(
                        unresolved = errors.len(),
                        "graphql response reported unresolvable node ids"
                    );
                    return Ok(data);
                }
                _ => return Err(map_graphql_errors(errors, endpoint)),
            }
        }
    }

    data.ok_or_else(|| {
        GithubApiError::MissingData {
            endpoint: endpoint.to_string(),
        }
        .into()
    })
}

fn error_type(error: &Value) -> &str {
    error
        .get("type")
        .or_else(|| error.get("extensions").and_then(|ext| ext.get("code")))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn is_not_found(error: &Value) -> bool {
    error_type(error) == "NOT_FOUND"
}

fn map_graphql_errors(errors: &[Value], endpoint: &str) -> anyhow::Error {
    if let Some(first) = errors.first() {
        if is_not_found(first) {
            return GithubApiError::status(StatusCode::NOT_FOUND, endpoint).into();
        }
        let message = first
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown GraphQL error");
        return GithubApiError::Graphql {
            message: message.to_string(),
        }
        .into();
    }
    anyhow!("unknown GraphQL error")
}

fn body_preview(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }
    let text = String::from_utf8_lossy(body);
    truncate_str(&text, 256)
}

fn truncate_str(value: &str, limit: usize) -> String {
    let mut truncated: String = value.chars().take(limit).collect();
    if truncated.len() < value.len() {
        truncated.push('…');
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_data_object() {
        let data = extract_data(json!({"data": {"nodes": []}}), "/graphql").unwrap();
        assert_eq!(data, json!({"nodes": []}));
    }

    #[test]
    fn not_found_without_data_maps_to_404() {
        let err = extract_data(
            json!({"data": null, "errors": [{"type": "NOT_FOUND", "message": "gone"}]}),
            "/graphql",
        )
        .unwrap_err();
        let api = err.downcast_ref::<GithubApiError>().expect("api error");
        assert_eq!(api.status_code(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn unresolved_ids_keep_partial_data() {
        let data = extract_data(
            json!({
                "data": {"nodes": [null]},
                "errors": [{"type": "NOT_FOUND", "message": "Could not resolve to a node"}]
            }),
            "/graphql",
        )
        .unwrap();
        assert_eq!(data, json!({"nodes": [null]}));
    }

    #[test]
    fn other_errors_fail_even_with_data() {
        let err = extract_data(
            json!({
                "data": {"nodes": []},
                "errors": [{"extensions": {"code": "undefinedField"}, "message": "Field 'isDraft' doesn't exist"}]
            }),
            "/graphql",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "graphql error: Field 'isDraft' doesn't exist");
    }

    #[test]
    fn missing_data_is_an_error() {
        let err = extract_data(json!({}), "/graphql").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GithubApiError>(),
            Some(GithubApiError::MissingData { .. })
        ));
    }

    #[test]
    fn request_carries_token_and_headers() {
        let transport = HttpGraphqlTransport::new(
            "https://ghe.example.test/api/graphql",
            "issue-timeline".into(),
            Some("secret".into()),
        )
        .unwrap();
        let request = transport.build_request("query { viewer { login } }").unwrap();
        assert_eq!(request.headers()[header::AUTHORIZATION], "bearer secret");
        assert_eq!(
            request.headers()[header::ACCEPT],
            "application/vnd.github+json"
        );
        let body: Value = serde_json::from_slice(request.body()).unwrap();
        assert_eq!(body["query"], "query { viewer { login } }");
    }
}
