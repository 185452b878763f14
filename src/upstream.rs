//! Upstream Provider Client
//!
//! Forwards cache misses from `/lookup` to the external data provider.
//! Each namespace maps to `{base_url}/{namespace}` and the caller's query
//! string is passed through unchanged.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::Namespace;
use crate::config::Config;
use crate::error::{CacheError, Result};

/// HTTP client for the upstream travel/mapping provider.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl UpstreamClient {
    /// Creates a client for `base_url`, sending `token` as a bearer credential
    /// when present.
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Builds the client described by `config`, or `None` when no upstream
    /// URL is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        config
            .upstream_url
            .as_ref()
            .map(|url| {
                Self::new(
                    url.clone(),
                    config.upstream_token.clone(),
                    Duration::from_secs(config.upstream_timeout),
                )
            })
            .transpose()
    }

    pub fn endpoint(&self, namespace: Namespace) -> String {
        format!("{}/{}", self.base_url, namespace)
    }

    /// Fetches the JSON payload for `query` in `namespace`.
    ///
    /// The pairs are sent in the order given, repeated names included.
    /// Non-success statuses are reported as [`CacheError::Upstream`].
    pub async fn fetch(&self, namespace: Namespace, query: &[(String, String)]) -> Result<Value> {
        let url = self.endpoint(namespace);
        debug!(%url, "Forwarding lookup upstream");

        let mut request = self.http.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "Upstream returned an error status");
            return Err(CacheError::Upstream(format!(
                "{} lookup returned {}",
                namespace, status
            )));
        }

        Ok(response.json::<Value>().await?)
    }
}

/// Groups query pairs by name into the parameters a lookup is keyed on.
///
/// A name given once maps to its string value; a repeated name maps to an
/// array of its values in request order, so `?w=A&w=B`, `?w=B&w=A` and
/// `?w=B` all key differently.
pub fn lookup_params(pairs: &[(String, String)]) -> BTreeMap<String, Value> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in pairs {
        grouped.entry(name.clone()).or_default().push(value.clone());
    }

    grouped
        .into_iter()
        .map(|(name, mut values)| {
            let value = if values.len() == 1 {
                Value::String(values.remove(0))
            } else {
                Value::from(values)
            };
            (name, value)
        })
        .collect()
}
