//! UDP inbound listener (C8 transport). Binds the configured port and hands
//! each datagram's parsed `(command, topic, value)` to the caller; raw
//! socket wiring only, the parsing itself lives in `relay_core::udp`.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::warn;

use relay_core::udp::{parse_datagram, Command};

pub(crate) async fn bind(port: u16) -> std::io::Result<UdpSocket> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    UdpSocket::bind(addr).await
}

/// Receive one datagram and parse it. Returns `None` for a datagram that
/// doesn't decode to a usable `(topic, value)` pair; logs and keeps
/// listening rather than treating it as fatal.
pub(crate) async fn recv_command(socket: &UdpSocket) -> Option<(Command, String, String)> {
    let mut buf = vec![0u8; 65536];
    let (len, peer) = match socket.recv_from(&mut buf).await {
        Ok(result) => result,
        Err(err) => {
            warn!("udp recv failed: {err}");
            return None;
        }
    };

    let text = String::from_utf8_lossy(&buf[..len]);
    match parse_datagram(&text) {
        Some(parsed) => Some(parsed),
        None => {
            warn!("unparseable udp datagram from {peer}");
            None
        }
    }
}
