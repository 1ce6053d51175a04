//! Shared request plumbing for the REST sub-clients.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, DefiError};

/// Why an outbound call did not produce a decoded body.
#[derive(Debug)]
pub(crate) enum HttpFailure {
    /// The request never completed or the body could not be decoded.
    Transport(reqwest::Error),
    /// The upstream answered with a non-success status.
    Status(ApiError),
}

impl HttpFailure {
    pub(crate) fn status(&self) -> Option<u16> {
        match self {
            HttpFailure::Status(api) => Some(api.status),
            HttpFailure::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }

    /// Wrap into a domain error. Transport failures keep the network
    /// classification; status failures get the domain error built by `domain`
    /// with the [`ApiError`] attached as cause.
    pub(crate) fn into_error(self, domain: impl FnOnce(&ApiError) -> DefiError) -> DefiError {
        match self {
            HttpFailure::Transport(e) => DefiError::from(e),
            HttpFailure::Status(api) => domain(&api).with_source(api),
        }
    }
}

/// Send `request` and decode the JSON body of a 2xx response.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, HttpFailure> {
    let resp = request.send().await.map_err(HttpFailure::Transport)?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(HttpFailure::Status(ApiError {
            status: status.as_u16(),
            body,
        }));
    }
    resp.json::<T>().await.map_err(HttpFailure::Transport)
}

/// Join a base URL and a path without doubling the separator.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a/", "/v1/wallets"), "http://a/v1/wallets");
        assert_eq!(join_url("http://a", "v1/wallets"), "http://a/v1/wallets");
    }
}
