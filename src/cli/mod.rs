use crate::client::{AnnounceClient, ClientConfig};
use crate::error::{AnnounceError, Result};
use crate::tracker::{build_announce_url, generate_peer_id, TrackerEvent, TrackerResponse};
use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "tracker-announce")]
#[command(about = "Announce to a BitTorrent tracker and list the peers it returns", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Announce a torrent to a tracker and print the response
    Announce {
        /// Tracker announce URL
        #[arg(short, long)]
        tracker: String,

        /// Info hash as 40 hex characters
        #[arg(short, long)]
        info_hash: String,

        /// 20-character peer id (random when omitted)
        #[arg(long)]
        peer_id: Option<String>,

        /// Port to report to the tracker
        #[arg(short, long, default_value = "6881")]
        port: u16,

        /// Request timeout in seconds
        #[arg(long, default_value = "15")]
        timeout: u64,

        /// Announce event: started, stopped or completed
        #[arg(short, long)]
        event: Option<TrackerEvent>,
    },

    /// Print the announce URL without contacting the tracker
    Url {
        #[arg(short, long)]
        tracker: String,

        #[arg(short, long)]
        info_hash: String,

        #[arg(long)]
        peer_id: Option<String>,

        #[arg(short, long, default_value = "6881")]
        port: u16,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Announce {
                tracker,
                info_hash,
                peer_id,
                port,
                timeout,
                event,
            } => {
                let config = ClientConfig {
                    listen_port: *port,
                    timeout: Duration::from_secs(*timeout),
                    peer_id: peer_id.as_deref().map(parse_peer_id).transpose()?,
                };

                let client = AnnounceClient::new(config)?;
                println!("Peer id: {}", String::from_utf8_lossy(client.peer_id()));

                let response = client
                    .announce(tracker, parse_info_hash(info_hash)?, *event)
                    .await?;
                print_response(&response);
            }

            Commands::Url {
                tracker,
                info_hash,
                peer_id,
                port,
            } => {
                let peer_id = match peer_id {
                    Some(id) => parse_peer_id(id)?,
                    None => generate_peer_id(),
                };
                let url = build_announce_url(tracker, parse_info_hash(info_hash)?, peer_id, *port)?;
                println!("{}", url);
            }
        }

        Ok(())
    }
}

fn parse_info_hash(input: &str) -> Result<[u8; 20]> {
    let bytes = hex::decode(input)
        .map_err(|e| AnnounceError::InvalidArgument(format!("info hash: {}", e)))?;

    <[u8; 20]>::try_from(bytes.as_slice()).map_err(|_| {
        AnnounceError::InvalidArgument(format!(
            "info hash must be 20 bytes, got {}",
            bytes.len()
        ))
    })
}

fn parse_peer_id(input: &str) -> Result<[u8; 20]> {
    <[u8; 20]>::try_from(input.as_bytes()).map_err(|_| {
        AnnounceError::InvalidArgument(format!(
            "peer id must be 20 bytes, got {}",
            input.len()
        ))
    })
}

fn print_response(response: &TrackerResponse) {
    println!("Tracker Response");
    println!("================");
    if response.is_failure() {
        println!(
            "Failure reason: {}",
            response.failure_reason.as_deref().unwrap_or_default()
        );
        return;
    }
    if let Some(message) = &response.warning_message {
        println!("Warning message: {}", message);
    }
    println!("Interval: {}s", response.interval);
    if let Some(min_interval) = response.min_interval {
        println!("Min interval: {}s", min_interval);
    }
    if let Some(tracker_id) = &response.tracker_id {
        println!("Tracker id: {}", String::from_utf8_lossy(tracker_id));
    }
    println!("Complete: {}", response.complete);
    println!("Incomplete: {}", response.incomplete);
    if response.peers.is_empty() {
        println!("\nNo peers returned");
        return;
    }
    println!("\nPeers ({}):", response.peers.len());

    for peer in response.peer_addresses() {
        println!("  {}", peer);
    }
}
