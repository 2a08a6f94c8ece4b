//! LAN discovery beacon
//!
//! The server periodically broadcasts where its game endpoint lives; a client
//! listens for a single datagram to find it. The payload is the server port as
//! two little-endian bytes followed by the UTF-8 server address.

use crate::config::DiscoverySettings;
use crate::error::{GameError, Result};
use anyhow::Context;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Local port the beacon sends from
pub const DEFAULT_BEACON_PORT: u16 = 19471;

/// Port clients listen on for beacons
pub const DEFAULT_LISTEN_PORT: u16 = 19472;

const MAX_DATAGRAM: usize = 512;

/// Contents of one beacon datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconMessage {
    pub port: u16,
    pub address: String,
}

impl BeaconMessage {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            port,
            address: address.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(2 + self.address.len());
        payload.extend_from_slice(&self.port.to_le_bytes());
        payload.extend_from_slice(self.address.as_bytes());
        payload
    }

    pub fn decode(payload: &[u8]) -> std::result::Result<Self, GameError> {
        let (port, address) = match payload {
            [lo, hi, rest @ ..] => (u16::from_le_bytes([*lo, *hi]), rest),
            _ => {
                return Err(GameError::InvalidBeacon {
                    reason: format!("payload too short ({} bytes)", payload.len()),
                })
            }
        };

        let address = std::str::from_utf8(address).map_err(|e| GameError::InvalidBeacon {
            reason: format!("address is not valid UTF-8: {}", e),
        })?;

        Ok(Self::new(address, port))
    }

    /// WebSocket URL of the advertised game endpoint
    pub fn server_url(&self, path: &str) -> String {
        format!("ws://{}:{}{}", self.address, self.port, path)
    }
}

/// Periodic broadcaster of a [`BeaconMessage`]
#[derive(Debug, Clone)]
pub struct DiscoveryBeacon {
    message: BeaconMessage,
    bind_port: u16,
    target: SocketAddr,
    interval: Duration,
}

impl DiscoveryBeacon {
    pub fn new(message: BeaconMessage, bind_port: u16, target: SocketAddr, interval: Duration) -> Self {
        Self {
            message,
            bind_port,
            target,
            interval,
        }
    }

    /// Build a beacon advertising `server_port`, broadcasting to the whole
    /// local network
    pub fn from_config(config: &DiscoverySettings, server_port: u16) -> Result<Self> {
        let address = match &config.advertise_address {
            Some(address) => address.clone(),
            None => detect_local_ipv4()?.to_string(),
        };

        Ok(Self::new(
            BeaconMessage::new(address, server_port),
            config.bind_port,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), config.broadcast_port),
            Duration::from_millis(config.interval_ms),
        ))
    }

    pub fn message(&self) -> &BeaconMessage {
        &self.message
    }

    /// Broadcast until a shutdown signal arrives
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.bind_port))
            .await
            .with_context(|| format!("Failed to bind beacon port {}", self.bind_port))?;
        socket
            .set_broadcast(true)
            .context("Failed to enable broadcast on beacon socket")?;

        let payload = self.message.encode();
        let mut ticker = tokio::time::interval(self.interval);

        info!(
            "Discovery beacon advertising {} every {:?} to {}",
            self.message.server_url(""),
            self.interval,
            self.target
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Discovery beacon stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match socket.send_to(&payload, self.target).await {
                        Ok(_) => debug!("Beacon sent to {}", self.target),
                        Err(e) => warn!("Failed to send beacon to {}: {}", self.target, e),
                    }
                }
            }
        }
    }
}

/// Wait on `port` for one beacon
pub async fn listen_for_server(port: u16, timeout: Duration) -> Result<BeaconMessage> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("Failed to bind discovery port {}", port))?;
    receive_beacon(&socket, timeout).await
}

/// Receive and decode one beacon on an already bound socket
pub async fn receive_beacon(socket: &UdpSocket, timeout: Duration) -> Result<BeaconMessage> {
    let mut buf = [0u8; MAX_DATAGRAM];
    let (len, from) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
        .await
        .context("Timed out waiting for a discovery beacon")??;

    let message = BeaconMessage::decode(&buf[..len])?;
    debug!("Beacon from {}: {:?}", from, message);
    Ok(message)
}

/// First non-loopback IPv4 address of this host.
///
/// Taken from the host's interface list. Only when no interface has one is
/// the outbound route consulted.
pub fn detect_local_ipv4() -> Result<Ipv4Addr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => {
            if let Some(ip) = first_non_loopback_ipv4(interfaces.iter().map(|iface| iface.ip())) {
                return Ok(ip);
            }
            debug!("No interface carries a non-loopback IPv4 address");
        }
        Err(e) => warn!("Failed to list network interfaces: {}", e),
    }

    outbound_route_ipv4()
}

/// Pick the first IPv4 address that is neither loopback nor unspecified
pub fn first_non_loopback_ipv4<I>(addrs: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    addrs.into_iter().find_map(|addr| match addr {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    })
}

/// Address of the interface the OS would route public traffic through.
/// Connecting a UDP socket sends nothing.
fn outbound_route_ipv4() -> Result<Ipv4Addr> {
    let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .context("Failed to open probe socket")?;
    socket
        .connect((Ipv4Addr::new(8, 8, 8, 8), 80))
        .context("No route to determine the local address")?;

    let local = socket.local_addr()?.ip();
    first_non_loopback_ipv4([local]).ok_or_else(|| {
        GameError::ConfigurationError {
            message: format!("No usable IPv4 address found (got {})", local),
        }
        .into()
    })
}
