use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Failed to open transport {target}: {source}")]
    TransportOpen {
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("Transport write failed after {sent} packets: {source}")]
    TransportWrite {
        sent: u64,
        #[source]
        source: io::Error,
    },
    #[error("Failed to close transport: {0}")]
    TransportClose(#[source] io::Error),
    #[error("Invalid transport target: {0}")]
    InvalidTarget(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Driver is not streaming")]
    NotStreaming,
    #[error("Driver already stopped")]
    AlreadyStopped,
}

pub type Result<T> = std::result::Result<T, SimError>;
