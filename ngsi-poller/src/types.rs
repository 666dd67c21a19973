use serde::Serialize;
use std::fmt;

/// Entity query parameters for `GET /ngsi-ld/v1/entities`.
///
/// Unset and empty parameters are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityQuery {
    #[serde(rename = "type", skip_serializing_if = "is_blank")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "is_unset")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "is_blank")]
    pub georel: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub geometry: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub coordinates: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub geoproperty: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn is_unset(value: &Option<u32>) -> bool {
    value.map_or(true, |v| v == 0)
}

impl EntityQuery {
    /// Query for one entity type with a page size.
    pub fn for_type(entity_type: &str, limit: u32) -> Self {
        Self {
            entity_type: Some(entity_type.to_string()),
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// URL-encoded query string, without the leading `?`.
    pub fn to_query_string(&self) -> Result<String, FetchError> {
        serde_urlencoded::to_string(self).map_err(|e| FetchError::Transport(e.to_string()))
    }
}

/// Why a fetch cycle produced no data.
///
/// Distinct from entity malformation, which never fails a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Broker answered with a non-success HTTP status
    Status(u16),
    /// Request could not be sent or the connection failed
    Transport(String),
    /// Response body was not the expected JSON shape
    Decode(String),
    /// Superseded by a newer cycle or shut down
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status(code) => write!(f, "NGSI-LD error: {}", code),
            FetchError::Transport(msg) => write!(f, "request failed: {}", msg),
            FetchError::Decode(msg) => write!(f, "unexpected response: {}", msg),
            FetchError::Cancelled => write!(f, "fetch cancelled"),
        }
    }
}

impl std::error::Error for FetchError {}
