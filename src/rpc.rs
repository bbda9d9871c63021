//! RPC transport boundary.
//!
//! Orchestrators call a named remote procedure (service + method + request
//! object) and get back an opaque JSON value or an [`RpcError`]. The trait
//! keeps the wire out of the data layer; the provided [`HttpTransport`]
//! speaks the backend's pRPC dialect over HTTP.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::future::Future;
use thiserror::Error;
use url::Url;

/// Service names understood by the backend.
pub mod services {
  pub const ISSUES: &str = "tracker.Issues";
  pub const FEATURES: &str = "tracker.Features";
  pub const USERS: &str = "tracker.Users";
  pub const PROJECTS: &str = "tracker.Projects";
  pub const PERMISSIONS: &str = "tracker.Permissions";
  /// Side channel for federated issue lookups against an external tracker.
  pub const EXTERNAL: &str = "tracker.External";
}

/// A categorized RPC failure.
///
/// Stored verbatim in request state for the presentational layer to inspect,
/// so it must be cheap to clone and compare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
  /// The call never completed (connection refused, timeout, DNS...).
  #[error("transport error: {0}")]
  Transport(String),
  /// The server answered with a non-OK status.
  #[error("rpc failed with HTTP {code}: {message}")]
  Http { code: u16, message: String },
  /// The response body did not match the expected shape.
  #[error("failed to decode {method} response: {message}")]
  Decode { method: String, message: String },
}

/// The network collaborator every fetch orchestrator talks to.
pub trait RpcTransport: Send + Sync {
  fn call(
    &self,
    service: &str,
    method: &str,
    request: Value,
  ) -> impl Future<Output = Result<Value, RpcError>> + Send;
}

/// Responses are prefixed to defeat cross-site script inclusion; the prefix
/// must be stripped before parsing.
const XSSI_PREFIX: &str = ")]}'\n";

fn strip_xssi(body: &str) -> &str {
  body.strip_prefix(XSSI_PREFIX).unwrap_or(body)
}

/// pRPC-over-HTTP transport: POST `{base}/prpc/{Service}/{Method}` with a
/// JSON body.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base: Url,
  token: Option<String>,
}

impl HttpTransport {
  pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
    let base = Url::parse(base_url).map_err(|e| eyre!("Invalid tracker URL {base_url}: {e}"))?;
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {e}"))?;

    Ok(Self {
      client,
      base,
      token,
    })
  }

  fn endpoint(&self, service: &str, method: &str) -> Result<Url, RpcError> {
    self
      .base
      .join(&format!("prpc/{}/{}", service, method))
      .map_err(|e| RpcError::Transport(format!("bad endpoint: {e}")))
  }
}

impl RpcTransport for HttpTransport {
  async fn call(&self, service: &str, method: &str, request: Value) -> Result<Value, RpcError> {
    let url = self.endpoint(service, method)?;

    let mut req = self
      .client
      .post(url)
      .header("Content-Type", "application/json")
      .header("Accept", "application/json")
      .json(&request);
    if let Some(token) = &self.token {
      req = req.bearer_auth(token);
    }

    let resp = req
      .send()
      .await
      .map_err(|e| RpcError::Transport(e.to_string()))?;

    let status = resp.status();
    let body = resp
      .text()
      .await
      .map_err(|e| RpcError::Transport(e.to_string()))?;

    if !status.is_success() {
      return Err(RpcError::Http {
        code: status.as_u16(),
        message: body,
      });
    }

    serde_json::from_str(strip_xssi(&body)).map_err(|e| RpcError::Decode {
      method: format!("{}/{}", service, method),
      message: e.to_string(),
    })
  }
}

/// Decode a JSON response into a typed envelope, mapping failures into the
/// error taxonomy.
pub fn decode<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> Result<T, RpcError> {
  serde_json::from_value(value).map_err(|e| RpcError::Decode {
    method: method.to_string(),
    message: e.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_strip_xssi_prefix() {
    assert_eq!(strip_xssi(")]}'\n{\"a\":1}"), "{\"a\":1}");
    assert_eq!(strip_xssi("{\"a\":1}"), "{\"a\":1}");
  }

  #[test]
  fn test_endpoint_join() {
    let t = HttpTransport::new("https://tracker.example.com/", None).unwrap();
    let url = t.endpoint(services::ISSUES, "GetIssue").unwrap();
    assert_eq!(
      url.as_str(),
      "https://tracker.example.com/prpc/tracker.Issues/GetIssue"
    );
  }

  #[test]
  fn test_decode_error_names_the_method() {
    let err = decode::<crate::api_types::GetIssueResponse>(
      "tracker.Issues/GetIssue",
      serde_json::json!([1, 2]),
    )
    .unwrap_err();
    match err {
      RpcError::Decode { method, .. } => assert_eq!(method, "tracker.Issues/GetIssue"),
      other => panic!("unexpected error: {other:?}"),
    }
  }
}
