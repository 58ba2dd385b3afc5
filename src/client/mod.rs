pub mod discovery;
pub mod transfer;

use tracing::{error, info, warn};

use crate::client::discovery::{DiscoveryListener, Endpoint};
use crate::config::SpeedTestConfig;
use crate::report::TransferReport;

/// The client side: discovers a server, runs one round of concurrent transfers
///  against it, reports, and re-arms discovery for the next round.
pub struct SpeedTestClient {
    config: SpeedTestConfig,
    file_size: u64,
    tcp_conns: usize,
    udp_conns: usize,
}

impl SpeedTestClient {
    pub fn new(config: SpeedTestConfig, file_size: u64, tcp_conns: usize, udp_conns: usize) -> SpeedTestClient {
        SpeedTestClient {
            config,
            file_size,
            tcp_conns,
            udp_conns,
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = DiscoveryListener::new(self.config.discovery_port())?;

        loop {
            info!("listening for offers on port {}", self.config.discovery_port());
            let endpoint = listener.wait_for_offer().await?;
            info!("discovered server at {:?}", endpoint);

            let reports = self.run_round(&endpoint).await;
            for report in &reports {
                info!("{}", report);
            }
            info!("round complete: {} of {} transfers finished", reports.len(), self.tcp_conns + self.udp_conns);
        }
    }

    /// Launches all transfers of one round concurrently and waits for every one
    ///  of them before returning. A failed transfer is logged and dropped from
    ///  the batch; it never cancels its siblings.
    pub async fn run_round(&self, endpoint: &Endpoint) -> Vec<TransferReport> {
        let mut handles = Vec::with_capacity(self.tcp_conns + self.udp_conns);
        let mut next_index = 0;

        for _ in 0..self.tcp_conns {
            next_index += 1;
            let index = next_index;
            let addr = endpoint.tcp_addr;
            let size = self.file_size;
            handles.push(tokio::spawn(async move {
                transfer::run_tcp_transfer(index, addr, size).await
            }));
        }
        for _ in 0..self.udp_conns {
            next_index += 1;
            let index = next_index;
            let addr = endpoint.udp_addr;
            let size = self.file_size;
            let silence_timeout = self.config.udp_silence_timeout;
            handles.push(tokio::spawn(async move {
                transfer::run_udp_transfer(index, addr, size, silence_timeout).await
            }));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(e)) => warn!("transfer failed: {}", e),
                Err(e) => error!("transfer task panicked: {}", e),
            }
        }
        reports
    }
}
