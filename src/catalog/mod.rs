use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_CATALOG_URL: &str = "https://pokeapi.co/api/v2/pokemon";

// an entity as consumed by the gallery: identifier, display name and 1-2 attribute tags
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntityRecord {
    pub id: u64,
    pub name: String,
    pub attributes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request for entity {id} failed: {source}")]
    Transport {
        id: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("catalog answered {status} for entity {id}")]
    Status { id: u64, status: u16 },

    #[error("failed to decode entity {id}: {source}")]
    Decode {
        id: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed entity {id}: {reason}")]
    Malformed { id: u64, reason: String },

    #[error("entity {id} not found")]
    NotFound { id: u64 },
}

impl LookupError {
    pub fn id(&self) -> u64 {
        match self {
            LookupError::Transport { id, .. }
            | LookupError::Status { id, .. }
            | LookupError::Decode { id, .. }
            | LookupError::Malformed { id, .. }
            | LookupError::NotFound { id } => *id,
        }
    }
}

/// The remote catalog boundary: one JSON record per identifier.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn lookup(&self, id: u64) -> Result<EntityRecord, LookupError>;
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    id: u64,
    name: String,
    types: Vec<RawTypeSlot>,
}

#[derive(Debug, Deserialize)]
struct RawTypeSlot {
    #[serde(rename = "type")]
    kind: RawNamedResource,
}

#[derive(Debug, Deserialize)]
struct RawNamedResource {
    name: String,
}

impl RawEntity {
    fn into_record(self, requested: u64) -> Result<EntityRecord, LookupError> {
        let malformed = |reason: String| LookupError::Malformed {
            id: requested,
            reason,
        };
        if self.id != requested {
            return Err(malformed(format!("catalog returned id {}", self.id)));
        }
        if self.name.trim().is_empty() {
            return Err(malformed("empty name".to_string()));
        }
        let attributes: Vec<String> = self.types.into_iter().map(|t| t.kind.name).collect();
        match attributes.as_slice() {
            [_] => {}
            [a, b] if a != b => {}
            [a, b] => return Err(malformed(format!("duplicate attribute '{a}' / '{b}'"))),
            other => {
                return Err(malformed(format!(
                    "expected 1 or 2 attributes, got {}",
                    other.len()
                )))
            }
        }
        Ok(EntityRecord {
            id: self.id,
            name: self.name,
            attributes,
        })
    }
}

/// Decodes one catalog payload, checking the attribute invariant.
pub fn parse_record(requested: u64, body: &str) -> Result<EntityRecord, LookupError> {
    let raw: RawEntity = serde_json::from_str(body).map_err(|e| LookupError::Malformed {
        id: requested,
        reason: e.to_string(),
    })?;
    raw.into_record(requested)
}

#[derive(Clone, Debug)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(
        base_url: &str,
        timeout_seconds: u64,
        proxy: Option<&str>,
    ) -> Result<Self, reqwest::Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!(
                "dexgallery/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_seconds.max(1)));
        if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn entity_url(&self, id: u64) -> String {
        format!("{}/{}", self.base_url, id)
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn lookup(&self, id: u64) -> Result<EntityRecord, LookupError> {
        let url = self.entity_url(id);
        log::debug!("GET {url}");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Transport { id, source: e })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound { id });
        }
        if !status.is_success() {
            return Err(LookupError::Status {
                id,
                status: status.as_u16(),
            });
        }

        let raw: RawEntity = resp
            .json()
            .await
            .map_err(|e| LookupError::Decode { id, source: e })?;
        raw.into_record(id)
    }
}
