use crate::error::Result;
use crate::tracker::{
    generate_peer_id, Fetch, HttpFetcher, TrackerClient, TrackerEvent, TrackerRequest, TrackerResponse,
};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Configuration for announcing to a tracker
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub listen_port: u16,
    pub timeout: Duration,
    /// Fixed peer id; a random one is generated when unset
    pub peer_id: Option<[u8; 20]>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            listen_port: 6881,
            timeout: Duration::from_secs(15),
            peer_id: None,
        }
    }
}

/// Announces a single torrent on behalf of this peer
pub struct AnnounceClient<F = HttpFetcher> {
    config: ClientConfig,
    peer_id: [u8; 20],
    tracker: TrackerClient<F>,
    /// Last `tracker id` handed out by the tracker, echoed on later announces
    tracker_id: Mutex<Option<Vec<u8>>>,
}

impl AnnounceClient<HttpFetcher> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let tracker = TrackerClient::new(config.timeout)?;
        Ok(Self::with_tracker(config, tracker))
    }
}

impl<F: Fetch> AnnounceClient<F> {
    pub fn with_tracker(config: ClientConfig, tracker: TrackerClient<F>) -> Self {
        let peer_id = config.peer_id.unwrap_or_else(generate_peer_id);
        info!("Client initialized with peer_id: {}", hex::encode(peer_id));

        Self {
            config,
            peer_id,
            tracker,
            tracker_id: Mutex::new(None),
        }
    }

    pub fn peer_id(&self) -> &[u8; 20] {
        &self.peer_id
    }

    /// Announce `info_hash` to `announce_url` and return the decoded response.
    ///
    /// A `tracker id` from an earlier response is sent back as `trackerid`.
    pub async fn announce(
        &self,
        announce_url: &str,
        info_hash: [u8; 20],
        event: Option<TrackerEvent>,
    ) -> Result<TrackerResponse> {
        info!("Info hash: {}", hex::encode(info_hash));

        let mut tracker_id = self.tracker_id.lock().await;

        let mut request = TrackerRequest::new(info_hash, self.peer_id, self.config.listen_port);
        request.event = event;
        request.tracker_id = tracker_id.clone();

        let response = self.tracker.announce(announce_url, &request).await?;

        if let Some(id) = &response.tracker_id {
            debug!("Tracker id: {}", String::from_utf8_lossy(id));
            *tracker_id = Some(id.clone());
        }

        for peer in response.peer_addresses() {
            info!("Peer: {}", peer);
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::client::HttpResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::{Arc, Mutex};
    use url::Url;

    const BODY: &[u8] = b"d8:intervali60e5:peers6:\x01\x02\x03\x04\x00\x50e";

    /// Replies with `body` and shares the requested URLs with the test
    struct RecordingFetcher {
        body: &'static [u8],
        urls: Arc<Mutex<Vec<Url>>>,
    }

    impl RecordingFetcher {
        fn new(body: &'static [u8]) -> (Self, Arc<Mutex<Vec<Url>>>) {
            let urls = Arc::new(Mutex::new(Vec::new()));
            let fetcher = Self {
                body,
                urls: Arc::clone(&urls),
            };
            (fetcher, urls)
        }
    }

    #[async_trait]
    impl Fetch for RecordingFetcher {
        async fn fetch(&self, url: &Url) -> Result<HttpResponse> {
            self.urls.lock().unwrap().push(url.clone());
            Ok(HttpResponse {
                status: 200,
                body: Bytes::from_static(self.body),
            })
        }
    }

    #[test]
    fn test_config_peer_id_and_port_are_sent() {
        let config = ClientConfig {
            listen_port: 51413,
            peer_id: Some(*b"-TA0001-abcdefghijkl"),
            ..ClientConfig::default()
        };
        let (fetcher, urls) = RecordingFetcher::new(BODY);
        let client = AnnounceClient::with_tracker(config, TrackerClient::with_fetcher(fetcher));
        assert_eq!(client.peer_id(), b"-TA0001-abcdefghijkl");

        let response = tokio_test::block_on(
            client.announce("http://tracker.example/announce", [0x11; 20], None),
        )
        .unwrap();
        assert_eq!(response.peer_addresses(), vec!["1.2.3.4:80".to_string()]);

        let urls = urls.lock().unwrap();
        let query = urls[0].query().unwrap();
        assert!(query.contains("port=51413"));
        assert!(query.contains("peer_id=-TA0001-abcdefghijkl"));
        assert!(!query.contains("event="));
        assert!(!query.contains("trackerid="));
    }

    #[test]
    fn test_event_is_sent() {
        let (fetcher, urls) = RecordingFetcher::new(BODY);
        let client = AnnounceClient::with_tracker(
            ClientConfig::default(),
            TrackerClient::with_fetcher(fetcher),
        );

        tokio_test::block_on(client.announce(
            "http://tracker.example/announce",
            [0x11; 20],
            Some(TrackerEvent::Started),
        ))
        .unwrap();

        let urls = urls.lock().unwrap();
        assert!(urls[0].query().unwrap().contains("event=started"));
    }

    #[test]
    fn test_tracker_id_is_echoed_on_next_announce() {
        let (fetcher, urls) =
            RecordingFetcher::new(b"d8:intervali60e5:peers0:10:tracker id6:abc 12e");
        let client = AnnounceClient::with_tracker(
            ClientConfig::default(),
            TrackerClient::with_fetcher(fetcher),
        );

        tokio_test::block_on(async {
            let first = client
                .announce("http://tracker.example/announce", [0x22; 20], Some(TrackerEvent::Started))
                .await
                .unwrap();
            assert_eq!(first.tracker_id.as_deref(), Some(&b"abc 12"[..]));

            client
                .announce("http://tracker.example/announce", [0x22; 20], None)
                .await
                .unwrap();
        });

        let urls = urls.lock().unwrap();
        assert_eq!(urls.len(), 2);
        assert!(!urls[0].query().unwrap().contains("trackerid="));
        assert!(urls[1].query().unwrap().contains("trackerid=abc+12"));
    }

    #[test]
    fn test_random_peer_id_when_unset() {
        let (fetcher, _) = RecordingFetcher::new(BODY);
        let client = AnnounceClient::with_tracker(
            ClientConfig::default(),
            TrackerClient::with_fetcher(fetcher),
        );
        assert_eq!(&client.peer_id()[..8], b"-TA0001-");
    }
}
