//! Upstream feed transport.

mod basic;

pub use basic::BasicClient;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{FeedError, Result};

/// Transport used for every upstream feed request.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response>;
}

/// Fetches `url` and returns the response body verbatim.
///
/// Non-2xx responses are reported as [`FeedError::UpstreamFetch`]; there is
/// no retry.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().map_err(|e| FeedError::upstream(url, e))?,
    );

    let resp = client
        .execute(req)
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| FeedError::upstream(url, e))?;

    let bytes = resp.bytes().await.map_err(|e| FeedError::upstream(url, e))?;
    debug!(url, bytes = bytes.len(), "Feed bytes received");
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned [`HttpClient`] used by unit tests across the crate.

    use super::HttpClient;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};

    pub struct StaticClient {
        pub status: AtomicU16,
        pub body: Mutex<Vec<u8>>,
        pub calls: AtomicUsize,
    }

    impl StaticClient {
        pub fn ok(body: Vec<u8>) -> Self {
            Self::with_status(200, body)
        }

        pub fn with_status(status: u16, body: Vec<u8>) -> Self {
            Self {
                status: AtomicU16::new(status),
                body: Mutex::new(body),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn set_body(&self, body: Vec<u8>) {
            *self.body.lock().unwrap() = body;
        }

        pub fn set_status(&self, status: u16) {
            self.status.store(status, Ordering::SeqCst);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpClient for StaticClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = self.body.lock().unwrap().clone();
            let resp = axum::http::Response::builder()
                .status(self.status.load(Ordering::SeqCst))
                .body(body)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }
}
