use socket2::{Domain, Protocol, Socket, Type};
use std::fmt::{Debug, Formatter};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::protocol::messages::OfferMessage;

/// One discovered server, captured from an offer datagram. Immutable; a fresh
///  Endpoint is discovered for every round of transfers.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Endpoint {
    pub udp_addr: SocketAddr,
    pub tcp_addr: SocketAddr,
}
impl Debug for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} udp:{} tcp:{}]", self.udp_addr.ip(), self.udp_addr.port(), self.tcp_addr.port())
    }
}

/// Listens on the discovery port for offer broadcasts. The listener stays bound
///  across rounds; `wait_for_offer` is called again after each batch of
///  transfers completes, so discovery and transfer phases alternate.
pub struct DiscoveryListener {
    socket: UdpSocket,
}

impl DiscoveryListener {
    /// Binds with SO_REUSEADDR so several client instances on one host can
    ///  listen for the same broadcasts.
    pub fn new(listen_port: u16) -> anyhow::Result<DiscoveryListener> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, listen_port)).into())?;

        Ok(DiscoveryListener {
            socket: UdpSocket::from_std(socket.into())?,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocks until the first valid offer arrives and returns the endpoint it
    ///  advertises. Anything that is not a well-formed offer of exactly the
    ///  right length is discarded without terminating the listener.
    pub async fn wait_for_offer(&self) -> anyhow::Result<Endpoint> {
        let mut buf = [0u8; 64];

        loop {
            let (len, from) = self.socket.recv_from(&mut buf).await?;

            if len != OfferMessage::SERIALIZED_LEN {
                debug!("ignoring {}-byte datagram from {}", len, from);
                continue;
            }
            match OfferMessage::deser(&mut &buf[..len]) {
                Ok(offer) => {
                    debug!("received {:?} from {}", offer, from);
                    return Ok(Endpoint {
                        udp_addr: SocketAddr::new(from.ip(), offer.udp_port),
                        tcp_addr: SocketAddr::new(from.ip(), offer.tcp_port),
                    });
                }
                Err(e) => debug!("ignoring datagram from {}: {}", from, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::RequestMessage;
    use bytes::BytesMut;

    #[tokio::test]
    async fn test_ignores_garbage_until_valid_offer() {
        let listener = DiscoveryListener::new(0).unwrap();
        let listen_addr = listener.local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        sender.send_to(b"not a protocol message", listen_addr).await.unwrap();
        sender.send_to(&[0xab, 0xcd], listen_addr).await.unwrap();

        // right length, wrong type
        let mut buf = BytesMut::new();
        RequestMessage { file_size: 9 }.ser(&mut buf);
        sender.send_to(&buf[..9], listen_addr).await.unwrap();

        buf.clear();
        OfferMessage { udp_port: 7002, tcp_port: 7001 }.ser(&mut buf);
        sender.send_to(buf.as_ref(), listen_addr).await.unwrap();

        let endpoint = listener.wait_for_offer().await.unwrap();
        assert_eq!(endpoint.udp_addr.ip(), sender.local_addr().unwrap().ip());
        assert_eq!(endpoint.udp_addr.port(), 7002);
        assert_eq!(endpoint.tcp_addr.port(), 7001);
    }

    #[tokio::test]
    async fn test_rearms_for_the_next_round() {
        let listener = DiscoveryListener::new(0).unwrap();
        let listen_addr = listener.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let mut buf = BytesMut::new();
        OfferMessage { udp_port: 5002, tcp_port: 5001 }.ser(&mut buf);
        sender.send_to(buf.as_ref(), listen_addr).await.unwrap();
        let first = listener.wait_for_offer().await.unwrap();

        sender.send_to(buf.as_ref(), listen_addr).await.unwrap();
        let second = listener.wait_for_offer().await.unwrap();

        assert_eq!(first, second);
    }
}
