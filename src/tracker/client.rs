use super::{TrackerRequest, TrackerResponse};
use crate::bencode::decode;
use crate::error::{AnnounceError, FetchFailure, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Status and body returned by a tracker
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Transport used to reach a tracker
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<HttpResponse>;
}

/// `Fetch` over HTTP(S) with reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<HttpResponse> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(HttpResponse { status, body })
    }
}

/// Decode a tracker reply that has already been fetched
pub fn decode_announce(status: u16, body: &[u8]) -> Result<TrackerResponse> {
    debug!("Tracker response status: {}, body length: {}", status, body.len());

    if status != 200 {
        return Err(AnnounceError::FetchFailed(FetchFailure::Status(status)));
    }

    let (decoded, consumed) = decode(body)?;
    if consumed < body.len() {
        debug!("Ignoring {} trailing bytes after tracker response", body.len() - consumed);
    }
    TrackerResponse::from_bencode(&decoded)
}

/// Client for communicating with BitTorrent trackers
pub struct TrackerClient<F = HttpFetcher> {
    fetcher: F,
}

impl TrackerClient<HttpFetcher> {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self::with_fetcher(HttpFetcher::new(timeout)?))
    }
}

impl<F: Fetch> TrackerClient<F> {
    pub fn with_fetcher(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Send a request to a tracker and get the peer list
    pub async fn announce(&self, tracker_url: &str, request: &TrackerRequest) -> Result<TrackerResponse> {
        info!("Announcing to tracker: {}", tracker_url);

        let url = request.announce_url(tracker_url)?;
        debug!("Tracker request URL: {}", url);

        let reply = self.fetcher.fetch(&url).await?;
        let response = decode_announce(reply.status, &reply.body)?;

        if response.is_failure() {
            warn!(
                "Tracker rejected announce: {}",
                response.failure_reason.as_deref().unwrap_or_default()
            );
            return Ok(response);
        }

        if let Some(message) = &response.warning_message {
            warn!("Tracker warning: {}", message);
        }

        debug!("Compact peer blob: {} bytes", response.peers.as_bytes().len());
        info!(
            "Received {} peers from tracker (interval: {}s)",
            response.peers.len(),
            response.interval
        );

        Ok(response)
    }
}
