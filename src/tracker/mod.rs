pub(crate) mod client;
mod peer;
mod request;
mod response;

pub use client::{Fetch, HttpFetcher, TrackerClient};
pub use request::{build_announce_url, TrackerEvent, TrackerRequest};
pub use response::TrackerResponse;

use rand::Rng;

/// Generate a random peer ID
/// Format: -TA0001-<12 random chars>
pub fn generate_peer_id() -> [u8; 20] {
    let mut peer_id = [0u8; 20];
    peer_id[0..8].copy_from_slice(b"-TA0001-");

    let mut rng = rand::thread_rng();
    for byte in &mut peer_id[8..] {
        *byte = rng.gen_range(b'0'..=b'z');
    }

    peer_id
}
