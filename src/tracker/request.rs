use crate::error::{AnnounceError, Result};
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use std::str::FromStr;
use url::form_urlencoded::byte_serialize;
use url::Url;

/// Events sent to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerEvent {
    Started,
    Stopped,
    Completed,
}

impl TrackerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerEvent::Started => "started",
            TrackerEvent::Stopped => "stopped",
            TrackerEvent::Completed => "completed",
        }
    }
}

impl FromStr for TrackerEvent {
    type Err = AnnounceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "started" => Ok(TrackerEvent::Started),
            "stopped" => Ok(TrackerEvent::Stopped),
            "completed" => Ok(TrackerEvent::Completed),
            other => Err(AnnounceError::InvalidArgument(format!(
                "unknown event '{}', expected started, stopped or completed",
                other
            ))),
        }
    }
}

/// Request parameters for tracker communication
#[derive(Debug, Clone)]
pub struct TrackerRequest {
    /// SHA1 hash of the info dictionary
    pub info_hash: [u8; 20],
    /// Unique peer ID
    pub peer_id: [u8; 20],
    /// Port this peer is listening on
    pub port: u16,
    /// Total amount uploaded
    pub uploaded: u64,
    /// Total amount downloaded
    pub downloaded: u64,
    /// Number of bytes left to download
    pub left: u64,
    /// Event (optional)
    pub event: Option<TrackerEvent>,
    /// Request compact peer list format
    pub compact: bool,
    /// Tracker id from a previous response, echoed back as `trackerid`
    pub tracker_id: Option<Vec<u8>>,
}

impl TrackerRequest {
    pub fn new(info_hash: [u8; 20], peer_id: [u8; 20], port: u16) -> Self {
        Self {
            info_hash,
            peer_id,
            port,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: None,
            compact: true,
            tracker_id: None,
        }
    }

    /// Query parameters as raw bytes; percent-encoding happens when the URL is built
    pub fn to_query_params(&self) -> Vec<(&'static str, Vec<u8>)> {
        let mut params = vec![
            ("info_hash", self.info_hash.to_vec()),
            ("peer_id", self.peer_id.to_vec()),
            ("port", self.port.to_string().into_bytes()),
            ("uploaded", self.uploaded.to_string().into_bytes()),
            ("downloaded", self.downloaded.to_string().into_bytes()),
            ("left", self.left.to_string().into_bytes()),
            ("compact", if self.compact { b"1".to_vec() } else { b"0".to_vec() }),
        ];

        if let Some(event) = &self.event {
            params.push(("event", event.as_str().as_bytes().to_vec()));
        }

        if let Some(tracker_id) = &self.tracker_id {
            params.push(("trackerid", tracker_id.clone()));
        }

        params
    }

    /// Build the announce URL on top of `announce_url`.
    ///
    /// Query pairs already on the announce URL are kept unless this request
    /// sets the same key. Keys are serialized in alphabetical order.
    pub fn announce_url(&self, announce_url: &str) -> Result<Url> {
        let mut url = Url::parse(announce_url)?;
        if url.cannot_be_a_base() {
            return Err(AnnounceError::InvalidAnnounceUrl(format!(
                "'{}' is not a hierarchical URL",
                announce_url
            )));
        }

        let mut query: BTreeMap<Vec<u8>, Vec<Vec<u8>>> = BTreeMap::new();
        if let Some(existing) = url.query() {
            for (key, value) in parse_query_bytes(existing) {
                query.entry(key).or_default().push(value);
            }
        }

        for (key, value) in self.to_query_params() {
            query.insert(key.as_bytes().to_vec(), vec![value]);
        }

        let encoded = query
            .iter()
            .flat_map(|(key, values)| {
                values.iter().map(move |value| {
                    format!(
                        "{}={}",
                        byte_serialize(key).collect::<String>(),
                        byte_serialize(value).collect::<String>()
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("&");

        url.set_query(Some(&encoded));
        Ok(url)
    }
}

/// Split a raw query string into form-decoded pairs without forcing the
/// values through UTF-8, so escaped binary (`%FF`) survives untouched
fn parse_query_bytes(query: &str) -> impl Iterator<Item = (Vec<u8>, Vec<u8>)> + '_ {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (form_decode(key), form_decode(value))
        })
}

fn form_decode(component: &str) -> Vec<u8> {
    let unplussed = component.replace('+', " ");
    percent_decode_str(&unplussed).collect::<Vec<u8>>()
}

/// Build a compact announce URL with zeroed transfer counters
pub fn build_announce_url(
    announce_url: &str,
    info_hash: [u8; 20],
    peer_id: [u8; 20],
    port: u16,
) -> Result<String> {
    TrackerRequest::new(info_hash, peer_id, port)
        .announce_url(announce_url)
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEER_ID: &[u8; 20] = b"-AB1000-abcdef123456";

    fn info_hash() -> [u8; 20] {
        let mut hash = [0u8; 20];
        for (i, byte) in hash.iter_mut().enumerate() {
            *byte = i as u8 + 1;
        }
        hash
    }

    #[test]
    fn test_build_announce_url() {
        let url = build_announce_url("http://tracker.example/announce", info_hash(), *PEER_ID, 6881)
            .unwrap();

        assert_eq!(
            url,
            "http://tracker.example/announce?compact=1&downloaded=0\
             &info_hash=%01%02%03%04%05%06%07%08%09%0A%0B%0C%0D%0E%0F%10%11%12%13%14\
             &left=0&peer_id=-AB1000-abcdef123456&port=6881&uploaded=0"
        );
    }

    #[test]
    fn test_binary_bytes_are_escaped() {
        let mut hash = [0xffu8; 20];
        hash[0] = b' ';
        hash[1] = b'&';
        hash[2] = b'a';
        let url = TrackerRequest::new(hash, *PEER_ID, 1)
            .announce_url("http://tracker.example/announce")
            .unwrap();

        let query = url.query().unwrap();
        assert!(query.contains(&format!("info_hash=+%26a{}", "%FF".repeat(17))));

        let decoded: Vec<u8> = url
            .query_pairs()
            .find(|(k, _)| k == "port")
            .map(|(_, v)| v.into_owned().into_bytes())
            .unwrap();
        assert_eq!(decoded, b"1");
    }

    #[test]
    fn test_existing_query_preserved_and_overwritten() {
        let url = TrackerRequest::new(info_hash(), *PEER_ID, 6881)
            .announce_url("https://tracker.example:8443/ann?passkey=abc&port=1&tag=x&tag=y")
            .unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("passkey".to_string(), "abc".to_string())));
        assert!(pairs.contains(&("port".to_string(), "6881".to_string())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "port").count(), 1);
        assert_eq!(
            pairs.iter().filter(|(k, _)| k == "tag").map(|(_, v)| v.as_str()).collect::<Vec<_>>(),
            vec!["x", "y"]
        );
        assert_eq!(url.host_str(), Some("tracker.example"));
        assert_eq!(url.port(), Some(8443));
        assert_eq!(url.path(), "/ann");
    }

    #[test]
    fn test_existing_binary_query_survives() {
        let url = TrackerRequest::new(info_hash(), *PEER_ID, 6881)
            .announce_url("http://tracker.example/announce?passkey=%FF%00&key=a+b&&flag")
            .unwrap();

        let query = url.query().unwrap();
        assert!(query.contains("passkey=%FF%00"));
        assert!(query.contains("key=a+b"));
        assert!(query.contains("flag=&"));
        assert!(!query.contains("%EF%BF%BD"));
    }

    #[test]
    fn test_event_from_str() {
        for event in [TrackerEvent::Started, TrackerEvent::Stopped, TrackerEvent::Completed] {
            assert_eq!(event.as_str().parse::<TrackerEvent>().unwrap(), event);
        }
        assert!(matches!(
            "paused".parse::<TrackerEvent>(),
            Err(AnnounceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_optional_params() {
        let mut request = TrackerRequest::new(info_hash(), *PEER_ID, 6881);
        request.event = Some(TrackerEvent::Started);
        request.tracker_id = Some(b"tid 1".to_vec());
        request.left = 1024;

        let url = request.announce_url("http://tracker.example/announce").unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("event=started"));
        assert!(query.contains("trackerid=tid+1"));
        assert!(query.contains("left=1024"));
    }

    #[test]
    fn test_invalid_announce_url() {
        for bad in ["not a url", "/announce", "tracker.example/announce", "mailto:someone@example.com"] {
            assert!(matches!(
                build_announce_url(bad, info_hash(), *PEER_ID, 6881),
                Err(AnnounceError::InvalidAnnounceUrl(_))
            ));
        }
    }
}
