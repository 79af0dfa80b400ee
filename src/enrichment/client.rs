//! GraphQL client for the Hashnode tag and series lookups
//!
//! Tags go one request per batch; every identifier is queried through its
//! own aliased field so a single round trip answers the whole batch. Series
//! names come from the publication's series list in one request.

use crate::types::TagId;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Default public GraphQL endpoint
pub const DEFAULT_ENDPOINT: &str = "https://gql.hashnode.com";

/// Errors from the lookup service
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized ({0}): check the API key")]
    Unauthorized(u16),

    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EnrichmentError {
    /// Authentication failures make every later call pointless
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, EnrichmentError::Unauthorized(_))
    }
}

/// Batched lookup of tag identifiers to display names.
///
/// Identifiers the service does not know are simply absent from the result.
#[async_trait]
pub trait TagLookup: Send + Sync {
    async fn lookup(&self, ids: &[TagId]) -> Result<HashMap<TagId, String>, EnrichmentError>;
}

/// Series catalog of one publication: series identifier to display name.
///
/// An unknown publication yields an empty catalog.
#[async_trait]
pub trait SeriesLookup: Send + Sync {
    async fn publication_series(
        &self,
        publication_id: &str,
    ) -> Result<HashMap<String, String>, EnrichmentError>;
}

/// Most series one publication lookup returns
pub const SERIES_PAGE_SIZE: usize = 100;

const SERIES_QUERY: &str = "query PublicationSeries($id: ObjectId!, $first: Int!) { \
publication(id: $id) { seriesList(first: $first) { edges { node { id name slug } } } } }";

/// Connection settings for [`HashnodeClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("h2o/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Hashnode GraphQL API client
pub struct HashnodeClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest {
    query: String,
    variables: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Map<String, Value>>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TagNode {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublicationNode {
    #[serde(rename = "seriesList")]
    series_list: Option<SeriesConnection>,
}

#[derive(Debug, Deserialize)]
struct SeriesConnection {
    #[serde(default)]
    edges: Vec<SeriesEdge>,
}

#[derive(Debug, Deserialize)]
struct SeriesEdge {
    node: SeriesNode,
}

#[derive(Debug, Deserialize)]
struct SeriesNode {
    id: String,
    name: Option<String>,
}

impl HashnodeClient {
    pub fn new(config: ClientConfig) -> Result<Self, EnrichmentError> {
        info!("Initializing Hashnode client: endpoint={}", config.endpoint);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_value = format!("Bearer {}", config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| EnrichmentError::Config(format!("Invalid API key format: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
        })
    }

    /// POST one query and return the decoded JSON body
    async fn send(&self, request: &GraphQlRequest) -> Result<Value, EnrichmentError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EnrichmentError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EnrichmentError::Status {
                status: status.as_u16(),
                body: crate::util::truncate_str(&body, 200),
            });
        }

        response
            .json()
            .await
            .map_err(|e| EnrichmentError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl TagLookup for HashnodeClient {
    async fn lookup(&self, ids: &[TagId]) -> Result<HashMap<TagId, String>, EnrichmentError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        debug!("Looking up {} tags at {}", ids.len(), self.endpoint);
        let body = self.send(&build_request(ids)).await?;
        parse_response(ids, body)
    }
}

#[async_trait]
impl SeriesLookup for HashnodeClient {
    async fn publication_series(
        &self,
        publication_id: &str,
    ) -> Result<HashMap<String, String>, EnrichmentError> {
        debug!("Looking up series of publication {}", publication_id);
        let body = self.send(&build_series_request(publication_id)).await?;
        parse_series_response(body)
    }
}

/// Alias used for the identifier at `index` in a batch
fn alias(index: usize) -> String {
    format!("t{}", index)
}

fn build_request(ids: &[TagId]) -> GraphQlRequest {
    let params: Vec<String> = (0..ids.len()).map(|i| format!("${}: ID!", alias(i))).collect();
    let fields: Vec<String> = (0..ids.len())
        .map(|i| format!("{a}: tag(id: ${a}) {{ id name }}", a = alias(i)))
        .collect();

    let query = format!("query Tags({}) {{ {} }}", params.join(", "), fields.join(" "));
    let variables = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (alias(i), Value::String(id.clone())))
        .collect();

    GraphQlRequest { query, variables }
}

/// Map aliased fields back to identifiers.
///
/// Any reported GraphQL error fails the whole batch; null fields mean the
/// identifier is unknown.
fn parse_response(ids: &[TagId], body: Value) -> Result<HashMap<TagId, String>, EnrichmentError> {
    let data = response_data(body)?;

    let mut names = HashMap::new();
    for (i, id) in ids.iter().enumerate() {
        let Some(field) = data.get(&alias(i)) else {
            return Err(EnrichmentError::MalformedResponse(format!(
                "missing field for tag {}",
                id
            )));
        };
        if field.is_null() {
            continue;
        }
        let node: TagNode = serde_json::from_value(field.clone())
            .map_err(|e| EnrichmentError::MalformedResponse(e.to_string()))?;
        if let Some(name) = node.name.filter(|n| !n.trim().is_empty()) {
            names.insert(id.clone(), name);
        }
    }

    Ok(names)
}

fn build_series_request(publication_id: &str) -> GraphQlRequest {
    let mut variables = Map::new();
    variables.insert("id".to_string(), Value::String(publication_id.to_string()));
    variables.insert("first".to_string(), Value::from(SERIES_PAGE_SIZE));
    GraphQlRequest {
        query: SERIES_QUERY.to_string(),
        variables,
    }
}

fn parse_series_response(body: Value) -> Result<HashMap<String, String>, EnrichmentError> {
    let data = response_data(body)?;
    let publication = match data.get("publication") {
        None => {
            return Err(EnrichmentError::MalformedResponse(
                "missing field for publication".to_string(),
            ))
        }
        Some(Value::Null) => return Ok(HashMap::new()),
        Some(field) => field.clone(),
    };

    let publication: PublicationNode = serde_json::from_value(publication)
        .map_err(|e| EnrichmentError::MalformedResponse(e.to_string()))?;

    Ok(publication
        .series_list
        .map(|list| list.edges)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|edge| {
            let name = edge.node.name.filter(|n| !n.trim().is_empty())?;
            Some((edge.node.id, name))
        })
        .collect())
}

/// Unwrap the `data` object, failing on any reported GraphQL error
fn response_data(body: Value) -> Result<Map<String, Value>, EnrichmentError> {
    let response: GraphQlResponse = serde_json::from_value(body)
        .map_err(|e| EnrichmentError::MalformedResponse(e.to_string()))?;

    if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
        let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
        return Err(EnrichmentError::GraphQl(messages.join("; ")));
    }

    response
        .data
        .ok_or_else(|| EnrichmentError::MalformedResponse("missing 'data'".to_string()))
}
