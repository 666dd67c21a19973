use crate::catalog::normalize_type_list;
use crate::source::EntitySource;
use crate::types::{EntityQuery, FetchError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ngsi_map::config::NgsiConfig;
use ngsi_map::Entity;
use reqwest::header::{ACCEPT, LINK};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

pub const ENTITIES_PATH: &str = "/ngsi-ld/v1/entities";
pub const TYPES_PATH: &str = "/ngsi-ld/v1/types";

const LD_JSON: &str = "application/ld+json";

/// HTTP client for an NGSI-LD context broker.
///
/// Sends `Accept: application/ld+json` and, when a context document is
/// configured, the JSON-LD context `Link` header.
pub struct NgsiClient {
    http_client: Client,
    base_url: String,
    context_url: Option<String>,
}

impl NgsiClient {
    pub fn new(base_url: &str, context_url: Option<String>) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("ngsi-poller/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            context_url: context_url.filter(|c| !c.trim().is_empty()),
        })
    }

    pub fn from_config(config: &NgsiConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .context("ngsi.base_url is required for the HTTP source")?;
        Self::new(base_url, config.context_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full entities URL for `query`; no `?` when the query is empty.
    pub fn entities_url(&self, query: &EntityQuery) -> Result<String, FetchError> {
        let params = query.to_query_string()?;
        if params.is_empty() {
            Ok(format!("{}{}", self.base_url, ENTITIES_PATH))
        } else {
            Ok(format!("{}{}?{}", self.base_url, ENTITIES_PATH, params))
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.http_client.get(url).header(ACCEPT, LD_JSON);
        match &self.context_url {
            Some(context) => request.header(
                LINK,
                format!(
                    "<{}>; rel=\"http://www.w3.org/ns/json-ld#context\"; type=\"{}\"",
                    context, LD_JSON
                ),
            ),
            None => request,
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        check_response_status(&response)?;
        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Entities matching `query`.
    pub async fn get_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, FetchError> {
        let url = self.entities_url(query)?;
        let body = self.get_json(&url).await?;

        let records = match body {
            Value::Array(records) => records,
            other => {
                return Err(FetchError::Decode(format!(
                    "expected a JSON array of entities, got {}",
                    json_kind(&other)
                )))
            }
        };

        let total = records.len();
        let entities: Vec<Entity> = records
            .iter()
            .filter_map(|record| match Entity::from_json(record) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed entity record");
                    None
                }
            })
            .collect();

        debug!(
            url = %url,
            records = total,
            entities = entities.len(),
            "Fetched entity page"
        );
        Ok(entities)
    }

    /// Entity type catalogue, normalized.
    pub async fn get_types(&self) -> Result<Vec<String>, FetchError> {
        let url = format!("{}{}", self.base_url, TYPES_PATH);
        let body = self.get_json(&url).await?;
        Ok(normalize_type_list(&body))
    }
}

#[async_trait]
impl EntitySource for NgsiClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, FetchError> {
        self.get_entities(query).await
    }

    async fn fetch_types(&self) -> Result<Vec<String>, FetchError> {
        self.get_types().await
    }
}

/// Map a non-success status to a fetch error.
fn check_response_status(response: &reqwest::Response) -> Result<(), FetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status(status.as_u16()))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
