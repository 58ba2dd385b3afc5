use bytes::BytesMut;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::SpeedTestConfig;
use crate::protocol::messages::OfferMessage;

/// Periodically broadcasts one offer datagram advertising the server's transfer
///  ports on the discovery port. Runs independently of all transfer handling.
pub struct DiscoveryBeacon {
    socket: UdpSocket,
    offer: OfferMessage,
    broadcast_addr: SocketAddr,
    interval: Duration,
}

impl DiscoveryBeacon {
    pub async fn new(config: &SpeedTestConfig) -> anyhow::Result<DiscoveryBeacon> {
        // broadcast is an IPv4 concept, so the beacon always goes out on an IPv4 socket
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;

        Ok(DiscoveryBeacon {
            socket,
            offer: OfferMessage {
                udp_port: config.udp_port(),
                tcp_port: config.tcp_port(),
            },
            broadcast_addr: (Ipv4Addr::BROADCAST, config.discovery_port()).into(),
            interval: config.offer_interval,
        })
    }

    /// Loops for the lifetime of the server. A failed send is logged and does not
    ///  stop subsequent offers.
    pub async fn run(&self) {
        let mut buf = BytesMut::with_capacity(OfferMessage::SERIALIZED_LEN);

        loop {
            buf.clear();
            self.offer.ser(&mut buf);

            match self.socket.send_to(buf.as_ref(), self.broadcast_addr).await {
                Ok(_) => debug!("sent {:?} to {}", self.offer, self.broadcast_addr),
                Err(e) => warn!("failed to send offer: {}", e),
            }
            sleep(self.interval).await;
        }
    }
}
