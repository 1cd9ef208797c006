use clap::Parser;
use log::info;
use observer::console::spawn_stdin_reader;
use observer::network::ObserverClient;
use observer::ObserverError;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bridge WebSocket URL to subscribe to
    #[arg(short = 'b', long, default_value = "ws://127.0.0.1:3000")]
    bridge: String,

    /// Print a state snapshot every N milliseconds (0 disables)
    #[arg(short = 's', long, default_value = "1000")]
    snapshot_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let snapshot_interval = match args.snapshot_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };

    info!("Starting observer...");
    info!("Commands: pause, resume, toggle, reset, window <n>, loss <n>, snapshot, quit");

    let client = ObserverClient::connect(&args.bridge, snapshot_interval).await?;

    let (tx, rx) = mpsc::channel(32);
    spawn_stdin_reader(tx);

    match client.run(rx).await {
        Ok(engine) => {
            let metrics = engine.metrics();
            info!(
                "Done: sent {}, acked {}, timeouts {}, retransmits {}",
                metrics.sent, metrics.acked, metrics.timeouts, metrics.retransmits
            );
            Ok(())
        }
        Err(ObserverError::Closed) => {
            info!("Lost connection to the bridge");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
