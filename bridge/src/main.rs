use bridge::{BridgeConfig, RelayBridge};
use clap::Parser;
use log::{error, info};
use shared::{DEFAULT_CONTROL_PORT, DEFAULT_EVENT_PORT, DEFAULT_OBSERVER_PORT};
use std::net::{IpAddr, SocketAddr};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the event and observer listeners to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// UDP port the protocol engine sends events to
    #[arg(short, long, default_value_t = DEFAULT_EVENT_PORT)]
    event_port: u16,

    /// Host of the protocol engine's control listener
    #[arg(long, default_value = "127.0.0.1")]
    control_host: IpAddr,

    /// UDP port of the protocol engine's control listener
    #[arg(short, long, default_value_t = DEFAULT_CONTROL_PORT)]
    control_port: u16,

    /// WebSocket port observers connect to
    #[arg(short, long, default_value_t = DEFAULT_OBSERVER_PORT)]
    observer_port: u16,

    /// Maximum number of concurrent observers
    #[arg(short, long, default_value = "64")]
    max_observers: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = BridgeConfig {
        event_addr: SocketAddr::new(args.host, args.event_port),
        control_addr: SocketAddr::new(args.control_host, args.control_port),
        observer_addr: SocketAddr::new(args.host, args.observer_port),
        max_sessions: args.max_observers,
        ..BridgeConfig::default()
    };

    // Bind failures end the process here
    let bridge = RelayBridge::bind(&config).await?;

    tokio::select! {
        result = bridge.run() => {
            if let Err(e) = result {
                error!("Relay bridge stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
