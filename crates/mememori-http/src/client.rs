//! HTTP client construction and request helpers

use mememori_common::BackendConfig;
use mememori_core::{DomainError, PortResult};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::{map_http_error, status_error};

/// `ChatBackend` implementation over HTTP
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Build a backend with its own client, using the configured timeout
    ///
    /// # Errors
    /// Returns `DomainError::ValidationError` if the base URL is not usable
    pub fn new(config: &BackendConfig) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(map_http_error)?;
        Self::with_client(client, &config.api_url)
    }

    /// Build a backend around an existing client
    ///
    /// # Errors
    /// Returns `DomainError::ValidationError` if the base URL is not usable
    pub fn with_client(client: Client, base_url: &str) -> PortResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            DomainError::ValidationError(format!("invalid backend URL {base_url}: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DomainError::ValidationError(format!(
                "backend URL cannot carry a path: {base_url}"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each one
    pub(crate) fn endpoint(&self, segments: &[&str]) -> PortResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| DomainError::InternalError(format!("cannot extend {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn get(&self, segments: &[&str]) -> PortResult<RequestBuilder> {
        Ok(self.client.get(self.endpoint(segments)?))
    }

    pub(crate) fn post(&self, segments: &[&str]) -> PortResult<RequestBuilder> {
        Ok(self.client.post(self.endpoint(segments)?))
    }

    pub(crate) fn delete(&self, segments: &[&str]) -> PortResult<RequestBuilder> {
        Ok(self.client.delete(self.endpoint(segments)?))
    }

    /// Send a request; any non-2xx status becomes `DomainError::Backend`
    pub(crate) async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        let response = request.send().await.map_err(map_http_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    /// Read the whole body of a successful response
    pub(crate) async fn body(response: Response) -> PortResult<Vec<u8>> {
        let bytes = response.bytes().await.map_err(map_http_error)?;
        Ok(bytes.to_vec())
    }

    /// Send a request and decode its JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> PortResult<T> {
        let response = self.send(request).await?;
        let body = Self::body(response).await?;
        serde_json::from_slice(&body).map_err(DomainError::from)
    }
}
