//! Byte-stream transports
//!
//! The driver only sees a [`ByteSink`]: whole packets go in, in order, and the
//! sink is closed exactly once when streaming ends.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SimError};

/// Serial device used by the bench setup (virtual port paired with the consumer)
pub const DEFAULT_SERIAL_DEVICE: &str = "/dev/ttyACM0_PY";

pub const DEFAULT_BAUD_RATE: u32 = 9600;

const SERIAL_WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Per resolved address
pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Ordered byte sink owned by the driver
pub trait ByteSink: Send {
    /// Write one complete packet and flush it.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flush and release the underlying handle. Sending afterwards fails.
    fn close(&mut self) -> io::Result<()>;
}

/// Where packets are delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportTarget {
    Serial { device: String, baud_rate: u32 },
    Tcp { address: String },
    File { path: PathBuf },
    Stdout,
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { device, baud_rate } => write!(f, "serial {} @ {} baud", device, baud_rate),
            Self::Tcp { address } => write!(f, "tcp {}", address),
            Self::File { path } => write!(f, "file {}", path.display()),
            Self::Stdout => write!(f, "stdout"),
        }
    }
}

impl TransportTarget {
    /// Acquire the sink. Nothing is streamed if this fails.
    pub fn open(&self) -> Result<Box<dyn ByteSink>> {
        let open_err = |source: io::Error| SimError::TransportOpen {
            target: self.to_string(),
            source,
        };

        let sink: Box<dyn ByteSink> = match self {
            Self::Serial { device, baud_rate } => {
                let port = serialport::new(device.as_str(), *baud_rate)
                    .timeout(SERIAL_WRITE_TIMEOUT)
                    .open()
                    .map_err(|e| open_err(e.into()))?;
                Box::new(WriterSink::new(port))
            }
            Self::Tcp { address } => {
                let stream = connect_tcp(address, TCP_CONNECT_TIMEOUT).map_err(open_err)?;
                stream.set_nodelay(true).map_err(open_err)?;
                Box::new(WriterSink::new(stream))
            }
            Self::File { path } => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(open_err)?;
                Box::new(WriterSink::new(file))
            }
            Self::Stdout => Box::new(WriterSink::new(io::stdout())),
        };

        Ok(sink)
    }
}

/// Try every resolved address in turn, each bounded by `timeout`.
fn connect_tcp(address: &str, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in address.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{} resolved to no addresses", address),
        )
    }))
}

/// Adapts any `Write` handle; the handle is dropped on close
pub struct WriterSink<W: Write + Send> {
    inner: Option<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl<W: Write + Send> ByteSink for WriterSink<W> {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let writer = self
            .inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport closed"))?;
        writer.write_all(bytes)?;
        writer.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write + Send> Drop for WriterSink<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
