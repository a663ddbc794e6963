//! HTTP transport.
//!
//! POSTs `{query, variables, operationName}` as JSON to a single endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use heroql_core::{ConfigError, ErrorCode, ExecutionError, ExecutionResult};
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use hyper::{Method, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::transport::{Request, Response, Transport};

/// A [`Transport`] speaking HTTP/1.1 to one endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    endpoint: Uri,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HttpTransport {
    /// Creates a transport for `endpoint`, sending `headers` with every request.
    pub fn new(endpoint: &str, headers: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let endpoint = parse_endpoint(endpoint)?;

        let headers = headers
            .iter()
            .map(|(name, value)| {
                let invalid = || ConfigError::InvalidHeader(name.clone());
                let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
                let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
                Ok((header_name, header_value))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let client = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            client,
            endpoint,
            headers,
        })
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Uri, ConfigError> {
    let uri: Uri = endpoint
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

    match uri.scheme_str() {
        Some("http") => {}
        Some("https") => {
            return Err(ConfigError::InvalidEndpoint(
                "HTTPS is not supported by the built-in transport. Use a proxy or supply a custom transport.".into(),
            ))
        }
        _ => {
            return Err(ConfigError::InvalidEndpoint(format!(
                "{}: expected an http:// URL",
                endpoint
            )))
        }
    }
    if uri.host().is_none() {
        return Err(ConfigError::InvalidEndpoint(format!("{}: missing host", endpoint)));
    }

    Ok(uri)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Request) -> ExecutionResult<Response> {
        let body =
            serde_json::to_vec(request).map_err(|e| ExecutionError::serialize(e.to_string()))?;

        let mut builder = hyper::Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        let http_request = builder
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| ExecutionError::network(e.to_string()))?;

        debug!(endpoint = %self.endpoint, "POST");
        let response = self.client.request(http_request).await.map_err(|e| {
            if e.is_connect() {
                ExecutionError::new(
                    ErrorCode::ConnectionRefused,
                    format!("Connection failed: {}", e),
                )
            } else {
                ExecutionError::network(e.to_string())
            }
        })?;

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ExecutionError::network(format!("Read failed: {}", e)))?
            .to_bytes();
        trace!(%status, len = bytes.len(), "response received");

        if !status.is_success() {
            return Err(ExecutionError::http(status.as_u16()));
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            let body = String::from_utf8_lossy(&bytes);
            ExecutionError::invalid_response(format!(
                "Failed to parse response: {}. Body: {}",
                e,
                body.chars().take(200).collect::<String>()
            ))
        })
    }
}
