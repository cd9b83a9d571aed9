//! HTTP downstream using reqwest.
//!
//! Issues a single GET per invocation against the `{host, port}` configured
//! for the invocation's dependency and decodes the JSON body.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use super::{Downstream, Invocation, InvokeError, Result};
use crate::config::ServicesConfig;

/// Downstream that reaches each dependency over plain HTTP.
///
/// No request timeout is set on the client; callers bound the wait.
pub struct HttpDownstream {
    client: Client,
    services: ServicesConfig,
}

impl HttpDownstream {
    /// Create a downstream with a default reqwest client.
    pub fn new(services: ServicesConfig) -> Self {
        Self::with_client(Client::new(), services)
    }

    /// Create a downstream reusing an existing client (shared pool).
    pub fn with_client(client: Client, services: ServicesConfig) -> Self {
        Self { client, services }
    }

    /// Build the full URL for an invocation.
    fn url_for(&self, invocation: &Invocation) -> Result<Url> {
        let dependency = invocation.dependency();
        let endpoint = self.services.endpoint(dependency);

        let mut url = Url::parse(&endpoint.base_url())
            .map_err(|e| InvokeError::internal(dependency, format!("invalid base url: {e}")))?;
        url.set_path(invocation.path());

        if !invocation.segments().is_empty() {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InvokeError::internal(dependency, "base url cannot carry path segments")
            })?;
            segments.pop_if_empty().extend(invocation.segments());
        }

        if !invocation.params().is_empty() {
            url.query_pairs_mut().extend_pairs(invocation.params());
        }

        Ok(url)
    }
}

/// Classify a reqwest error: request construction is our fault, the rest is the remote's.
fn classify(invocation: &Invocation, err: reqwest::Error) -> InvokeError {
    if err.is_builder() {
        InvokeError::internal(invocation.dependency(), err.to_string())
    } else {
        InvokeError::gateway(invocation.dependency(), err.to_string())
    }
}

#[async_trait]
impl Downstream for HttpDownstream {
    async fn invoke(&self, invocation: &Invocation) -> Result<Value> {
        let url = self.url_for(invocation)?;
        debug!(dependency = %invocation.dependency(), url = %url, "Calling downstream");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify(invocation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InvokeError::gateway(
                invocation.dependency(),
                format!(
                    "HTTP {} from {} - {}",
                    status,
                    invocation.display_path(),
                    body.chars().take(200).collect::<String>()
                ),
            ));
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|e| classify(invocation, e))?;

        debug!(url = %url, "Response received");
        Ok(value)
    }
}
