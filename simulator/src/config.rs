//! Command line / environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use marvelmind_protocol::{DEFAULT_ADDRESS, DEFAULT_FLAGS};

use crate::error::{Result, SimError};
use crate::trajectory::{DEFAULT_RADIUS_CM, DEFAULT_STEP_RAD};
use crate::transport::{TransportTarget, DEFAULT_BAUD_RATE, DEFAULT_SERIAL_DEVICE};

/// Fixed altitude reported by the simulated hedgehog (cm)
pub const DEFAULT_ALTITUDE_CM: i16 = 1500;

pub const DEFAULT_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    Serial,
    Tcp,
    File,
    Stdout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFormat {
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "marvelmind-sim",
    about = "Stream simulated Marvelmind hedgehog position packets without hardware"
)]
pub struct Args {
    /// Transport the packets are written to
    #[arg(short, long, value_enum, default_value_t = TransportKind::Serial, env = "MARVELMIND_TRANSPORT")]
    pub transport: TransportKind,

    /// Serial device, host:port, or file path (ignored for stdout)
    #[arg(short, long, default_value = DEFAULT_SERIAL_DEVICE, env = "MARVELMIND_DEVICE")]
    pub device: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE, env = "MARVELMIND_BAUD")]
    pub baud: u32,

    /// Delay between packets in milliseconds
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS, env = "MARVELMIND_INTERVAL_MS")]
    pub interval_ms: u64,

    /// Radius of the simulated circle in cm
    #[arg(long, default_value_t = DEFAULT_RADIUS_CM, env = "MARVELMIND_RADIUS_CM")]
    pub radius_cm: f64,

    /// Phase advance per packet in radians
    #[arg(long, default_value_t = DEFAULT_STEP_RAD, env = "MARVELMIND_STEP_RAD")]
    pub step_rad: f64,

    /// Fixed altitude in cm
    #[arg(long, default_value_t = DEFAULT_ALTITUDE_CM, allow_negative_numbers = true, env = "MARVELMIND_ALTITUDE_CM")]
    pub altitude_cm: i16,

    /// Hedgehog address written into each packet
    #[arg(long, default_value_t = DEFAULT_ADDRESS, env = "MARVELMIND_ADDRESS")]
    pub address: u8,

    /// Stop after this many packets (runs until interrupted if omitted)
    #[arg(short = 'n', long, env = "MARVELMIND_COUNT")]
    pub count: Option<u64>,

    /// Per-packet status line format
    #[arg(long, value_enum, default_value_t = StatusFormat::Text, env = "MARVELMIND_STATUS_FORMAT")]
    pub status_format: StatusFormat,

    /// Verbose output (packet hex dumps)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated simulator settings
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub target: TransportTarget,
    pub interval: Duration,
    pub radius_cm: f64,
    pub step_rad: f64,
    pub altitude_cm: i16,
    pub address: u8,
    pub flags: u8,
    pub count: Option<u64>,
    pub status_format: StatusFormat,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            target: TransportTarget::Serial {
                device: DEFAULT_SERIAL_DEVICE.to_string(),
                baud_rate: DEFAULT_BAUD_RATE,
            },
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            radius_cm: DEFAULT_RADIUS_CM,
            step_rad: DEFAULT_STEP_RAD,
            altitude_cm: DEFAULT_ALTITUDE_CM,
            address: DEFAULT_ADDRESS,
            flags: DEFAULT_FLAGS,
            count: None,
            status_format: StatusFormat::Text,
        }
    }
}

impl Args {
    pub fn target(&self) -> Result<TransportTarget> {
        let device = self.device.trim();
        let needs_device = self.transport != TransportKind::Stdout;
        if needs_device && device.is_empty() {
            return Err(SimError::InvalidTarget(format!(
                "{:?} transport needs --device",
                self.transport
            )));
        }

        Ok(match self.transport {
            TransportKind::Serial => TransportTarget::Serial {
                device: device.to_string(),
                baud_rate: self.baud,
            },
            TransportKind::Tcp => {
                if !device.contains(':') {
                    return Err(SimError::InvalidTarget(format!(
                        "tcp target '{}' is not host:port",
                        device
                    )));
                }
                TransportTarget::Tcp {
                    address: device.to_string(),
                }
            }
            TransportKind::File => TransportTarget::File {
                path: PathBuf::from(device),
            },
            TransportKind::Stdout => TransportTarget::Stdout,
        })
    }

    pub fn into_config(self) -> Result<SimConfig> {
        let target = self.target()?;

        if self.baud == 0 {
            return Err(SimError::InvalidConfig("baud rate must be non-zero".into()));
        }
        if self.interval_ms == 0 {
            return Err(SimError::InvalidConfig("interval must be at least 1 ms".into()));
        }
        // i16 coordinates overflow beyond this radius
        if !(self.radius_cm.is_finite() && self.radius_cm > 0.0 && self.radius_cm <= i16::MAX as f64) {
            return Err(SimError::InvalidConfig(format!(
                "radius {} cm outside (0, {}]",
                self.radius_cm,
                i16::MAX
            )));
        }
        if !(self.step_rad.is_finite() && self.step_rad > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "step {} rad must be positive",
                self.step_rad
            )));
        }
        if self.count == Some(0) {
            return Err(SimError::InvalidConfig("count must be at least 1".into()));
        }

        Ok(SimConfig {
            target,
            interval: Duration::from_millis(self.interval_ms),
            radius_cm: self.radius_cm,
            step_rad: self.step_rad,
            altitude_cm: self.altitude_cm,
            address: self.address,
            flags: DEFAULT_FLAGS,
            count: self.count,
            status_format: self.status_format,
        })
    }
}
