//! Marvelmind Hedgehog Simulator
//!
//! Streams synthetic hedgehog position reports over serial, TCP, a file or
//! stdout so consumers of the Marvelmind protocol can be exercised without
//! beacons. The simulated tag circles the origin at a fixed altitude while
//! its heading follows the phase angle.
//!
//! Framing lives in `marvelmind-protocol`; this crate owns the trajectory,
//! the transports and the paced streaming loop.

pub mod config;
pub mod driver;
pub mod error;
pub mod trajectory;
pub mod transport;

pub use config::{Args, SimConfig, StatusFormat, TransportKind};
pub use driver::{Driver, DriverState, StopReason, StopReport};
pub use error::{Result, SimError};
pub use trajectory::{CircleTrajectory, PlanarPose};
pub use transport::{ByteSink, TransportTarget, WriterSink};
