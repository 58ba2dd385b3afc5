use clap::Parser;
use clap_derive::{Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr};
use tokio::select;
use tracing::{info, Level};

use lanspeed::client::SpeedTestClient;
use lanspeed::config::SpeedTestConfig;
use lanspeed::server::SpeedTestServer;

#[derive(Parser)]
#[clap(about = "Measures achievable TCP and UDP throughput on a local network")]
struct Args {
    #[clap(subcommand)]
    role: Role,

    #[clap(short, long, default_value_t = false)]
    verbose: bool,

    #[clap(long, default_value_t = false)]
    very_verbose: bool,
}

#[derive(Subcommand)]
enum Role {
    /// Advertise this host and serve transfer requests until interrupted
    Server {
        #[clap(long, default_value = "0.0.0.0")]
        host: IpAddr,

        /// base port; UDP requests are served on port+1, offers broadcast on port+2
        #[clap(long, default_value_t = 5001)]
        port: u16,
    },
    /// Discover a server and run rounds of concurrent transfers against it
    Client {
        #[clap(long, default_value_t = 5001)]
        port: u16,

        /// bytes to download per transfer
        #[clap(long, default_value_t = 1024 * 1024)]
        size: u64,

        /// number of concurrent TCP transfers per round
        #[clap(long, default_value_t = 1)]
        tcp: usize,

        /// number of concurrent UDP transfers per round
        #[clap(long, default_value_t = 1)]
        udp: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match (args.verbose, args.very_verbose) {
        (_, true) => Level::TRACE,
        (true, _) => Level::DEBUG,
        (false, false) => Level::INFO,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init()
        .ok();

    match args.role {
        Role::Server { host, port } => {
            let config = SpeedTestConfig::new(host, port);
            config.validate()?;
            let server = SpeedTestServer::new(config);

            select! {
                result = server.run() => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, shutting down");
                    Ok(())
                }
            }
        }
        Role::Client { port, size, tcp, udp } => {
            let config = SpeedTestConfig::new(Ipv4Addr::UNSPECIFIED.into(), port);
            config.validate()?;
            let client = SpeedTestClient::new(config, size, tcp, udp);

            select! {
                result = client.run() => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, shutting down");
                    Ok(())
                }
            }
        }
    }
}
