use anyhow::bail;
use std::net::IpAddr;
use std::time::Duration;

/// Shared configuration for both roles. The port layout is part of the protocol:
///  TCP transfers on the base port, UDP requests on base+1, discovery offers
///  broadcast on base+2. Client and server must agree on the base port.
#[derive(Debug, Clone)]
pub struct SpeedTestConfig {
    pub bind_addr: IpAddr,
    pub base_port: u16,

    pub offer_interval: Duration,
    /// a UDP transfer is considered finished once this much time passes without
    ///  an accepted segment
    pub udp_silence_timeout: Duration,
}

impl SpeedTestConfig {
    pub fn new(bind_addr: IpAddr, base_port: u16) -> SpeedTestConfig {
        SpeedTestConfig {
            bind_addr,
            base_port,
            offer_interval: Duration::from_secs(1),
            udp_silence_timeout: Duration::from_secs(1),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_port > u16::MAX - 2 {
            bail!("base port {} leaves no room for the UDP and discovery ports above it", self.base_port);
        }
        if self.base_port == 0 {
            bail!("base port must be fixed, not ephemeral");
        }
        Ok(())
    }

    pub fn tcp_port(&self) -> u16 {
        self.base_port
    }

    pub fn udp_port(&self) -> u16 {
        self.base_port + 1
    }

    pub fn discovery_port(&self) -> u16 {
        self.base_port + 2
    }
}
