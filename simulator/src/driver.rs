//! Simulation driver
//!
//! `Idle -> Streaming -> Stopped`. Each tick generates a pose, stamps it,
//! frames it and writes it to the sink. Interruption is only observed while
//! waiting for the next tick; an encode plus write always runs to completion.
//! The sink is closed on every way out of `Streaming`.

use std::fmt;
use std::future::Future;

use chrono::Utc;
use marvelmind_protocol::{encode, PositionSample, PACKET_LEN};
use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{SimConfig, StatusFormat};
use crate::error::{Result, SimError};
use crate::trajectory::CircleTrajectory;
use crate::transport::ByteSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Transport not yet acquired
    Idle,
    Streaming,
    /// Final; the sink has been released
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Operator interrupt
    Interrupted,
    /// Configured packet count reached
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopReport {
    pub reason: StopReason,
    pub packets_sent: u64,
}

/// Per-packet operator status
#[derive(Debug, Clone, Serialize)]
pub struct StatusLine {
    pub seq: u64,
    pub timestamp_ms: u32,
    pub x_cm: i16,
    pub y_cm: i16,
    pub z_cm: i16,
    pub heading_deg: f64,
}

impl StatusLine {
    fn new(seq: u64, sample: &PositionSample) -> Self {
        Self {
            seq,
            timestamp_ms: sample.timestamp_ms,
            x_cm: sample.x_cm,
            y_cm: sample.y_cm,
            z_cm: sample.z_cm,
            heading_deg: sample.angle_tenths_deg as f64 / 10.0,
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sent: X={} cm, Y={} cm, Ang={:.1}°",
            self.x_cm, self.y_cm, self.heading_deg
        )
    }
}

/// Wall-clock milliseconds, wrapped to the 32-bit packet field
pub fn wall_clock_ms() -> u32 {
    Utc::now().timestamp_millis() as u32
}

pub struct Driver {
    config: SimConfig,
    trajectory: CircleTrajectory,
    sink: Option<Box<dyn ByteSink>>,
    state: DriverState,
    packets_sent: u64,
    clock: fn() -> u32,
}

impl Driver {
    pub fn new(config: SimConfig) -> Self {
        let trajectory = CircleTrajectory::new(config.radius_cm, config.step_rad);
        Self {
            config,
            trajectory,
            sink: None,
            state: DriverState::Idle,
            packets_sent: 0,
            clock: wall_clock_ms,
        }
    }

    /// Driver already streaming into a caller-provided sink
    pub fn with_sink(config: SimConfig, sink: Box<dyn ByteSink>) -> Self {
        let mut driver = Self::new(config);
        driver.sink = Some(sink);
        driver.state = DriverState::Streaming;
        driver
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: fn() -> u32) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Acquire the configured transport: `Idle -> Streaming`.
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            DriverState::Idle => {}
            DriverState::Streaming => return Ok(()),
            DriverState::Stopped => return Err(SimError::AlreadyStopped),
        }

        let sink = self.config.target.open()?;
        self.sink = Some(sink);
        self.state = DriverState::Streaming;

        info!("Marvelmind simulator on {}", self.config.target);
        Ok(())
    }

    /// One tick: generate, stamp, encode, write, report.
    ///
    /// A failed write stops the driver; there is no retry.
    pub fn step(&mut self) -> Result<PositionSample> {
        if self.state != DriverState::Streaming {
            return Err(match self.state {
                DriverState::Stopped => SimError::AlreadyStopped,
                _ => SimError::NotStreaming,
            });
        }
        let Some(sink) = self.sink.as_mut() else {
            return Err(SimError::NotStreaming);
        };

        let pose = self.trajectory.advance();
        let sample = PositionSample {
            timestamp_ms: (self.clock)(),
            x_cm: pose.x_cm,
            y_cm: pose.y_cm,
            z_cm: self.config.altitude_cm,
            angle_tenths_deg: pose.angle_tenths_deg,
        };
        let packet = encode(&sample, self.config.address, self.config.flags);

        if let Err(source) = sink.send(&packet) {
            let sent = self.packets_sent;
            if let Err(e) = self.release() {
                warn!("Close after write failure also failed: {}", e);
            }
            return Err(SimError::TransportWrite { sent, source });
        }

        self.packets_sent += 1;
        debug!(
            seq = self.packets_sent,
            packet = %hex::encode_upper(packet),
            "wrote {} bytes",
            PACKET_LEN
        );
        self.report(&sample);

        Ok(sample)
    }

    fn report(&self, sample: &PositionSample) {
        let status = StatusLine::new(self.packets_sent, sample);
        match self.config.status_format {
            StatusFormat::Text => info!("{}", status),
            StatusFormat::Json => match serde_json::to_string(&status) {
                Ok(line) => info!("{}", line),
                Err(e) => warn!("Failed to render status: {}", e),
            },
        }
    }

    /// Stream until `shutdown` resolves, the packet count is reached, or a
    /// write fails. Opens the transport first if still `Idle`.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<StopReport>
    where
        F: Future<Output = ()>,
    {
        match self.state {
            DriverState::Idle => self.open()?,
            DriverState::Streaming => {}
            DriverState::Stopped => return Err(SimError::AlreadyStopped),
        }

        info!(
            "Streaming packets every {:?} (Ctrl+C to stop)",
            self.config.interval
        );

        tokio::pin!(shutdown);
        let mut ticker = time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Interrupted, stopping");
                    break Ok(StopReason::Interrupted);
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.step() {
                break Err(e);
            }

            if self.config.count == Some(self.packets_sent) {
                info!("Sent {} packets, stopping", self.packets_sent);
                break Ok(StopReason::Completed);
            }
        };

        let closed = self.release();
        let reason = outcome?;
        closed?;

        Ok(StopReport {
            reason,
            packets_sent: self.packets_sent,
        })
    }

    /// Close the sink and enter `Stopped`. Idempotent.
    fn release(&mut self) -> Result<()> {
        self.state = DriverState::Stopped;
        match self.sink.take() {
            Some(mut sink) => sink.close().map_err(SimError::TransportClose),
            None => Ok(()),
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to close transport on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportTarget;
    use marvelmind_protocol::{crc16_modbus, HEADER};
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Shared in-memory sink so tests can inspect what the driver wrote
    #[derive(Clone, Default)]
    struct MemorySink {
        bytes: Arc<Mutex<Vec<u8>>>,
        closed: Arc<AtomicBool>,
        fail_after: Option<usize>,
        sends: usize,
    }

    impl ByteSink for MemorySink {
        fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
            }
            if Some(self.sends) == self.fail_after {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "cable pulled"));
            }
            self.sends += 1;
            self.bytes.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fast_config(count: Option<u64>) -> SimConfig {
        SimConfig {
            interval: Duration::from_millis(1),
            count,
            ..SimConfig::default()
        }
    }

    fn fixed_clock() -> u32 {
        0
    }

    #[test]
    fn test_step_writes_reference_packet() {
        let sink = MemorySink::default();
        let mut driver =
            Driver::with_sink(fast_config(None), Box::new(sink.clone())).with_clock(fixed_clock);

        let sample = driver.step().unwrap();
        assert_eq!(
            sample,
            PositionSample {
                timestamp_ms: 0,
                x_cm: 200,
                y_cm: 0,
                z_cm: 1500,
                angle_tenths_deg: 0
            }
        );

        let bytes = sink.bytes.lock().unwrap().clone();
        assert_eq!(bytes.len(), PACKET_LEN);
        assert_eq!(&bytes[..5], &HEADER);
        assert_eq!(
            &bytes[5..21],
            &[0x00, 0x00, 0x00, 0x00, 0xC8, 0x00, 0x00, 0x00, 0xDC, 0x05, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(&bytes[21..], &crc16_modbus(&bytes[..21]).to_le_bytes());
        assert_eq!(driver.packets_sent(), 1);
    }

    #[test]
    fn test_step_requires_streaming() {
        let mut driver = Driver::new(fast_config(None));
        assert_eq!(driver.state(), DriverState::Idle);
        assert!(matches!(driver.step(), Err(SimError::NotStreaming)));
    }

    #[tokio::test]
    async fn test_run_until_count() {
        let sink = MemorySink::default();
        let mut driver = Driver::with_sink(fast_config(Some(3)), Box::new(sink.clone()));

        let report = driver.run(std::future::pending()).await.unwrap();

        assert_eq!(
            report,
            StopReport {
                reason: StopReason::Completed,
                packets_sent: 3
            }
        );
        assert_eq!(driver.state(), DriverState::Stopped);
        assert!(sink.closed.load(Ordering::SeqCst));

        let bytes = sink.bytes.lock().unwrap().clone();
        assert_eq!(bytes.len(), 3 * PACKET_LEN);
        for packet in bytes.chunks(PACKET_LEN) {
            assert_eq!(&packet[..5], &HEADER);
            assert_eq!(&packet[21..], &crc16_modbus(&packet[..21]).to_le_bytes());
        }
        // second packet is one step along the circle
        let second = &bytes[PACKET_LEN..2 * PACKET_LEN];
        assert_eq!(i16::from_le_bytes([second[9], second[10]]), 199);
        assert_eq!(i16::from_le_bytes([second[11], second[12]]), 20);
        assert_eq!(u16::from_le_bytes([second[17], second[18]]), 60);
    }

    #[tokio::test]
    async fn test_interrupt_before_first_tick() {
        let sink = MemorySink::default();
        let mut driver = Driver::with_sink(fast_config(None), Box::new(sink.clone()));

        let report = driver.run(std::future::ready(())).await.unwrap();

        assert_eq!(report.reason, StopReason::Interrupted);
        assert_eq!(report.packets_sent, 0);
        assert_eq!(driver.state(), DriverState::Stopped);
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_interrupt_while_streaming() {
        let sink = MemorySink::default();
        let config = SimConfig {
            interval: Duration::from_millis(10),
            ..SimConfig::default()
        };
        let mut driver = Driver::with_sink(config, Box::new(sink.clone()));

        let report = driver
            .run(tokio::time::sleep(Duration::from_millis(35)))
            .await
            .unwrap();

        assert_eq!(report.reason, StopReason::Interrupted);
        assert!(report.packets_sent >= 1);
        assert_eq!(
            sink.bytes.lock().unwrap().len() as u64,
            report.packets_sent * PACKET_LEN as u64
        );
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_write_failure_stops_driver() {
        let sink = MemorySink {
            fail_after: Some(2),
            ..MemorySink::default()
        };
        let mut driver = Driver::with_sink(fast_config(None), Box::new(sink.clone()));

        let err = driver.run(std::future::pending()).await.unwrap_err();

        match err {
            SimError::TransportWrite { sent, source } => {
                assert_eq!(sent, 2);
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(driver.state(), DriverState::Stopped);
        assert!(sink.closed.load(Ordering::SeqCst));
        assert_eq!(sink.bytes.lock().unwrap().len(), 2 * PACKET_LEN);

        // Stopped is final
        assert!(matches!(driver.step(), Err(SimError::AlreadyStopped)));
        assert!(matches!(
            driver.run(std::future::pending()).await,
            Err(SimError::AlreadyStopped)
        ));
    }

    #[tokio::test]
    async fn test_open_failure_never_streams() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimConfig {
            target: TransportTarget::File {
                path: dir.path().join("missing").join("out.bin"),
            },
            ..fast_config(Some(1))
        };
        let mut driver = Driver::new(config);

        let err = driver.run(std::future::pending()).await.unwrap_err();
        assert!(matches!(err, SimError::TransportOpen { .. }));
        assert_eq!(driver.state(), DriverState::Idle);
        assert_eq!(driver.packets_sent(), 0);
    }

    #[tokio::test]
    async fn test_run_opens_file_transport() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hedgehog.bin");
        let config = SimConfig {
            target: TransportTarget::File { path: path.clone() },
            ..fast_config(Some(2))
        };
        let mut driver = Driver::new(config).with_clock(fixed_clock);

        let report = driver.run(std::future::pending()).await.unwrap();
        assert_eq!(report.reason, StopReason::Completed);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 2 * PACKET_LEN);
        assert_eq!(&bytes[21..23], &[0xA9, 0xCC]);
    }

    #[test]
    fn test_status_line_text() {
        let sample = PositionSample {
            timestamp_ms: 7,
            x_cm: 199,
            y_cm: 20,
            z_cm: 1500,
            angle_tenths_deg: 60,
        };
        let status = StatusLine::new(2, &sample);
        assert_eq!(status.to_string(), "Sent: X=199 cm, Y=20 cm, Ang=6.0°");

        let json: serde_json::Value = serde_json::to_value(&status).unwrap();
        assert_eq!(json["seq"], 2);
        assert_eq!(json["x_cm"], 199);
        assert_eq!(json["heading_deg"], 6.0);
    }
}
