use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::Fetcher;
use crate::parse_toggle_value;
use crate::ClientConfig;
use crate::FetchError;
use crate::Result;
use crate::Snapshot;

/// etcd v2 error code for a missing key
const ETCD_KEY_NOT_FOUND: u32 = 100;

/// Body of a successful `GET /v2/keys/<dir>` request
#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    action: String,
    node: ListingNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingNode {
    key: String,
    #[serde(default)]
    dir: bool,
    value: Option<String>,
    #[serde(default)]
    nodes: Vec<ListingNode>,
    #[serde(default)]
    modified_index: u64,
}

/// Body of a failed request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error_code: u32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    cause: String,
}

/// Decodes a directory listing into a [`Snapshot`].
///
/// - Toggle names are the last segment of each child key.
/// - Child directories are skipped; they are not toggles.
/// - The version is the highest `modifiedIndex` in the listing.
/// - Any value other than `true`/`false` fails the whole listing.
pub fn parse_listing(body: &[u8]) -> std::result::Result<Snapshot, FetchError> {
    let response: ListingResponse = serde_json::from_slice(body)?;
    let namespace = response.node;
    trace!(action = %response.action, key = %namespace.key, "Decoded listing");

    if !namespace.dir {
        return Err(FetchError::NotADirectory(namespace.key));
    }

    let mut version = namespace.modified_index;
    let mut toggles = BTreeMap::new();
    for child in namespace.nodes {
        version = version.max(child.modified_index);

        if child.dir {
            debug!(key = %child.key, "Skipping nested directory");
            continue;
        }

        let name = match child.key.rsplit('/').next() {
            Some(segment) if !segment.is_empty() => segment.to_string(),
            _ => {
                warn!(key = %child.key, "Skipping child with empty name");
                continue;
            }
        };
        let value = parse_toggle_value(&name, child.value.as_deref().unwrap_or_default())?;
        toggles.insert(name, value);
    }

    Ok(Snapshot::new(toggles, version))
}

/// Fetches toggles from an etcd v2 cluster over HTTP.
///
/// Endpoints are tried in configured order. Transport failures and 5xx
/// responses fall through to the next endpoint; any other failure is
/// returned immediately since another member would answer the same.
#[derive(Debug, Clone)]
pub struct EtcdFetcher {
    client: Client,
    endpoints: Vec<Url>,
    key_prefix: String,
}

impl EtcdFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.endpoints.is_empty() {
            return Err(FetchError::EmptyEndpointList.into());
        }
        let endpoints = config
            .endpoints
            .iter()
            .map(|e| Url::parse(e).map_err(|_| FetchError::InvalidEndpoint(e.clone())))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(FetchError::Transport)?;

        Ok(Self {
            client,
            endpoints,
            key_prefix: normalize_prefix(&config.key_prefix),
        })
    }

    /// `{endpoint}/v2/keys{key_prefix}/{app_name}`, with `app_name`
    /// percent-encoded as a single path segment.
    pub fn listing_url(
        &self,
        endpoint: &Url,
        app_name: &str,
    ) -> std::result::Result<Url, FetchError> {
        let mut url = endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidEndpoint(endpoint.to_string()))?
            .pop_if_empty()
            .extend(["v2", "keys"])
            .extend(self.key_prefix.split('/').filter(|s| !s.is_empty()))
            .push(app_name);
        Ok(url)
    }

    async fn fetch_from(
        &self,
        endpoint: &Url,
        app_name: &str,
    ) -> std::result::Result<Snapshot, FetchError> {
        let url = self.listing_url(endpoint, app_name)?;
        trace!(%url, "Fetching toggle listing");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return parse_listing(&body);
        }

        if status == StatusCode::NOT_FOUND {
            if let Ok(error) = serde_json::from_slice::<ErrorBody>(&body) {
                debug!(
                    error_code = error.error_code,
                    message = %error.message,
                    cause = %error.cause,
                    "Store rejected listing"
                );
                if error.error_code == ETCD_KEY_NOT_FOUND {
                    return Err(FetchError::NamespaceNotFound(app_name.to_string()));
                }
            }
        }

        Err(FetchError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl Fetcher for EtcdFetcher {
    async fn fetch_snapshot(
        &self,
        app_name: &str,
    ) -> Result<Snapshot> {
        let mut last_error = FetchError::EmptyEndpointList;

        for endpoint in &self.endpoints {
            match self.fetch_from(endpoint, app_name).await {
                Ok(snapshot) => {
                    debug!(
                        %endpoint,
                        app_name,
                        version = snapshot.version(),
                        toggles = snapshot.len(),
                        "Fetched snapshot"
                    );
                    return Ok(snapshot);
                }
                Err(e) if should_try_next_endpoint(&e) => {
                    warn!(%endpoint, app_name, "Endpoint failed, trying next: {}", e);
                    last_error = e;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_error.into())
    }
}

fn should_try_next_endpoint(error: &FetchError) -> bool {
    match error {
        FetchError::Transport(_) => true,
        FetchError::Status { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Leading slash, no trailing slash: `v1/toggles/` becomes `/v1/toggles`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
