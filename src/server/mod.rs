pub mod beacon;
pub mod tcp_handler;
pub mod udp_handler;

use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::select;
use tracing::{info, warn};

use crate::config::SpeedTestConfig;
use crate::server::beacon::DiscoveryBeacon;

/// The server side: advertises itself via the discovery beacon and serves any
///  number of concurrent TCP and UDP transfers until the process is interrupted.
pub struct SpeedTestServer {
    config: SpeedTestConfig,
}

impl SpeedTestServer {
    pub fn new(config: SpeedTestConfig) -> SpeedTestServer {
        SpeedTestServer { config }
    }

    /// Binds all sockets and drives the beacon, the TCP accept loop and the UDP
    ///  request loop concurrently. Handling one client never blocks accepting
    ///  new work from another.
    pub async fn run(&self) -> anyhow::Result<()> {
        let tcp_listener = TcpListener::bind((self.config.bind_addr, self.config.tcp_port())).await?;
        let udp_socket = Arc::new(UdpSocket::bind((self.config.bind_addr, self.config.udp_port())).await?);
        let beacon = DiscoveryBeacon::new(&self.config).await?;

        info!("server listening on {} (TCP) and {} (UDP), announcing on port {}",
              tcp_listener.local_addr()?, udp_socket.local_addr()?, self.config.discovery_port());

        select! {
            _ = beacon.run() => Ok(()),
            result = Self::accept_loop(tcp_listener) => result,
            result = udp_handler::run_request_loop(udp_socket) => result,
        }
    }

    async fn accept_loop(listener: TcpListener) -> anyhow::Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            info!("accepted TCP connection from {}", peer);

            tokio::spawn(async move {
                match tcp_handler::handle_connection(stream).await {
                    Ok(served) => info!("served {} bytes over TCP to {}", served, peer),
                    Err(e) => warn!("aborting TCP connection from {}: {}", peer, e),
                }
            });
        }
    }
}
