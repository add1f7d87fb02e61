use crate::bencode::BencodeValue;
use crate::error::{AnnounceError, Result};
use super::peer::CompactPeers;
use std::collections::BTreeMap;
use tracing::trace;

const FAILURE_REASON: &[u8] = b"failure reason";
const WARNING_MESSAGE: &[u8] = b"warning message";
const INTERVAL: &[u8] = b"interval";
const MIN_INTERVAL: &[u8] = b"min interval";
const TRACKER_ID: &[u8] = b"tracker id";
const COMPLETE: &[u8] = b"complete";
const INCOMPLETE: &[u8] = b"incomplete";
const PEERS: &[u8] = b"peers";

const KNOWN_KEYS: [&[u8]; 8] = [
    FAILURE_REASON,
    WARNING_MESSAGE,
    INTERVAL,
    MIN_INTERVAL,
    TRACKER_ID,
    COMPLETE,
    INCOMPLETE,
    PEERS,
];

/// Response from a tracker
///
/// When `failure_reason` is set the tracker rejected the announce and the
/// remaining fields carry no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerResponse {
    /// Human-readable reason the announce was rejected
    pub failure_reason: Option<String>,
    /// Warning to surface to the user; the response is otherwise valid
    pub warning_message: Option<String>,
    /// Interval in seconds to wait before next request
    pub interval: u64,
    /// Minimum announce interval (optional)
    pub min_interval: Option<u64>,
    /// Opaque token to send back on the next announce
    pub tracker_id: Option<Vec<u8>>,
    /// Number of seeders
    pub complete: u64,
    /// Number of leechers
    pub incomplete: u64,
    /// Compact peer list
    pub peers: CompactPeers,
}

impl TrackerResponse {
    /// Map a decoded tracker dictionary onto the response fields.
    ///
    /// `interval` and `peers` must be present unless the tracker reported a
    /// failure; missing `complete`/`incomplete` counts are read as zero.
    pub fn from_bencode(value: &BencodeValue) -> Result<Self> {
        let dict = value
            .as_dict()
            .ok_or_else(|| AnnounceError::schema(b"<root>", "dictionary"))?;

        for key in dict.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_slice())) {
            trace!("Ignoring unknown tracker key '{}'", key.escape_ascii());
        }

        let failure_reason = optional_text(dict, FAILURE_REASON)?;
        let is_failure = failure_reason.is_some();

        let warning_message = optional_text(dict, WARNING_MESSAGE)?;
        let min_interval = optional_count(dict, MIN_INTERVAL)?;
        let tracker_id = optional_bytes(dict, TRACKER_ID)?.map(<[u8]>::to_vec);

        let interval = match optional_count(dict, INTERVAL)? {
            Some(interval) => interval,
            None if is_failure => 0,
            None => return Err(AnnounceError::schema(INTERVAL, "present")),
        };

        let complete = optional_count(dict, COMPLETE)?.unwrap_or(0);
        let incomplete = optional_count(dict, INCOMPLETE)?.unwrap_or(0);

        let peers = match optional_bytes(dict, PEERS)? {
            Some(blob) => CompactPeers::new(blob.to_vec())?,
            None if is_failure => CompactPeers::default(),
            None => return Err(AnnounceError::schema(PEERS, "present")),
        };

        Ok(TrackerResponse {
            failure_reason,
            warning_message,
            interval,
            min_interval,
            tracker_id,
            complete,
            incomplete,
            peers,
        })
    }

    pub fn is_failure(&self) -> bool {
        self.failure_reason.is_some()
    }

    /// Peers formatted as `a.b.c.d:port`
    pub fn peer_addresses(&self) -> Vec<String> {
        self.peers.iter().map(|peer| peer.to_string()).collect()
    }
}

type Dict = BTreeMap<Vec<u8>, BencodeValue>;

fn optional_bytes<'a>(dict: &'a Dict, key: &[u8]) -> Result<Option<&'a [u8]>> {
    dict.get(key)
        .map(|v| v.as_bytes().ok_or_else(|| mismatch(key, v, "byte string")))
        .transpose()
}

fn optional_text(dict: &Dict, key: &[u8]) -> Result<Option<String>> {
    optional_bytes(dict, key)?
        .map(|bytes| {
            String::from_utf8(bytes.to_vec()).map_err(|_| AnnounceError::schema(key, "UTF-8 text"))
        })
        .transpose()
}

fn optional_count(dict: &Dict, key: &[u8]) -> Result<Option<u64>> {
    dict.get(key)
        .map(|v| {
            let n = v.as_integer().ok_or_else(|| mismatch(key, v, "integer"))?;
            u64::try_from(n).map_err(|_| AnnounceError::schema(key, "non-negative integer"))
        })
        .transpose()
}

fn mismatch(key: &[u8], found: &BencodeValue, expected: &'static str) -> AnnounceError {
    trace!(
        "Tracker key '{}' holds a {}, expected {}",
        key.escape_ascii(),
        found.kind(),
        expected
    );
    AnnounceError::schema(key, expected)
}
