use crate::error::{AnnounceError, Result};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Size of one peer record in the compact format: 4 address bytes + 2 port bytes
pub const COMPACT_PEER_LEN: usize = 6;

/// A peer endpoint announced by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Peer {
    pub addr: SocketAddrV4,
}

impl Peer {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self {
            addr: SocketAddrV4::new(ip, port),
        }
    }

    /// Parse a peer from one compact record (big-endian port)
    pub fn from_compact(data: &[u8; COMPACT_PEER_LEN]) -> Self {
        let ip = Ipv4Addr::new(data[0], data[1], data[2], data[3]);
        let port = u16::from_be_bytes([data[4], data[5]]);

        Self::new(ip, port)
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Decode a compact peer blob into peers, preserving record order
pub fn decode_peers(data: &[u8]) -> Result<Vec<Peer>> {
    if data.len() % COMPACT_PEER_LEN != 0 {
        return Err(AnnounceError::InvalidPeerBlobLength(data.len()));
    }

    Ok(data
        .chunks_exact(COMPACT_PEER_LEN)
        .filter_map(|chunk| <&[u8; COMPACT_PEER_LEN]>::try_from(chunk).ok())
        .map(Peer::from_compact)
        .collect())
}

/// Compact peer list as sent by the tracker, decoded once on construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactPeers {
    raw: Vec<u8>,
    peers: Vec<Peer>,
}

impl CompactPeers {
    pub fn new(raw: Vec<u8>) -> Result<Self> {
        let peers = decode_peers(&raw)?;
        Ok(Self { raw, peers })
    }

    /// The blob exactly as received
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Peer> + '_ {
        self.peers.iter().copied()
    }
}
