//! Marvelmind Simulator CLI
//!
//! Usage:
//!   marvelmind-sim                                   # /dev/ttyACM0_PY @ 9600, 1 packet/s
//!   marvelmind-sim -d /dev/pts/4 -b 115200
//!   marvelmind-sim -t tcp -d 127.0.0.1:5000 -n 100
//!   marvelmind-sim -t stdout --interval-ms 100 | xxd

use anyhow::{Context, Result};
use clap::Parser;
use marvelmind_sim::{Args, Driver};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so the stdout transport stays a clean byte stream
    let default_filter = if args.verbose {
        "marvelmind_sim=debug"
    } else {
        "marvelmind_sim=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.into_config().context("invalid configuration")?;
    let mut driver = Driver::new(config);

    if let Err(e) = driver.open() {
        error!("Error: {}", e);
        return Err(e).context("transport unavailable");
    }

    match driver.run(interrupted()).await {
        Ok(report) => {
            info!("Stopped ({:?}) after {} packets", report.reason, report.packets_sent);
            Ok(())
        }
        Err(e) => {
            error!("Error: {}", e);
            Err(e).context("streaming aborted")
        }
    }
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl+C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}
