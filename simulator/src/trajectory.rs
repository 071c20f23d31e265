//! Circular trajectory generator
//!
//! The hedgehog circles the origin at a fixed radius while its heading tracks
//! the phase angle. The phase only ever grows; only its cosine, sine and
//! modulo-360 projections are observed, so it never needs resetting.

/// Default circle radius (cm)
pub const DEFAULT_RADIUS_CM: f64 = 200.0;

/// Default phase advance per sample (radians)
pub const DEFAULT_STEP_RAD: f64 = 0.1;

/// Horizontal position and heading, before timestamping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanarPose {
    pub x_cm: i16,
    pub y_cm: i16,
    pub angle_tenths_deg: u16,
}

impl PlanarPose {
    /// Pose on a circle of `radius_cm` at phase `t` (radians).
    ///
    /// The heading is rounded to whole degrees before scaling to tenths, so a
    /// phase just short of a full turn reports 3600.
    pub fn on_circle(radius_cm: f64, t: f64) -> Self {
        let x_cm = (radius_cm * t.cos()).round() as i16;
        let y_cm = (radius_cm * t.sin()).round() as i16;
        let degrees = t.to_degrees().rem_euclid(360.0).round() as u16;

        Self {
            x_cm,
            y_cm,
            angle_tenths_deg: degrees * 10,
        }
    }

    /// Heading in degrees, for display
    pub fn heading_deg(&self) -> f64 {
        self.angle_tenths_deg as f64 / 10.0
    }
}

/// Endless circular path; owned by the driver, restart by building a new one
#[derive(Debug, Clone)]
pub struct CircleTrajectory {
    radius_cm: f64,
    step_rad: f64,
    phase: f64,
}

impl CircleTrajectory {
    pub fn new(radius_cm: f64, step_rad: f64) -> Self {
        Self::with_phase(radius_cm, step_rad, 0.0)
    }

    pub fn with_phase(radius_cm: f64, step_rad: f64, phase: f64) -> Self {
        Self {
            radius_cm,
            step_rad,
            phase,
        }
    }

    /// Phase the next sample will be taken at
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Pose at the current phase, then step the phase forward
    pub fn advance(&mut self) -> PlanarPose {
        let pose = PlanarPose::on_circle(self.radius_cm, self.phase);
        self.phase += self.step_rad;
        pose
    }
}

impl Default for CircleTrajectory {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_CM, DEFAULT_STEP_RAD)
    }
}

impl Iterator for CircleTrajectory {
    type Item = PlanarPose;

    fn next(&mut self) -> Option<PlanarPose> {
        Some(self.advance())
    }
}
