//! Light sensor readings and the sensor service abstraction.
//!
//! The platform sensor service is process-wide shared state. The bridge never
//! looks it up globally; it is handed a [`SensorSource`] at construction so
//! tests (and the demo host) can substitute a [`SimulatedLightSensor`].

pub mod simulated;

pub use simulated::SimulatedLightSensor;

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// A single illuminance sample in lux.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    lux: f64,
    timestamp: Option<DateTime<Utc>>,
}

impl Reading {
    /// Create a reading without a timestamp.
    pub fn new(lux: f64) -> Self {
        Self {
            lux,
            timestamp: None,
        }
    }

    /// Create a reading stamped with the current time.
    pub fn now(lux: f64) -> Self {
        Self {
            lux,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn lux(&self) -> f64 {
        self.lux
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

impl From<f64> for Reading {
    fn from(lux: f64) -> Self {
        Self::new(lux)
    }
}

/// Requested delivery cadence, mirroring the platform's delay classes.
///
/// The cadence is a hint to the sensor service, not a real-time guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingRate {
    Fastest,
    Game,
    Ui,
    #[default]
    Normal,
}

impl SamplingRate {
    /// Nominal period between readings.
    pub fn period(&self) -> Duration {
        match self {
            SamplingRate::Fastest => Duration::ZERO,
            SamplingRate::Game => Duration::from_millis(20),
            SamplingRate::Ui => Duration::from_micros(66_667),
            SamplingRate::Normal => Duration::from_millis(200),
        }
    }
}

/// Callback registered with a [`SensorSource`]. Invoked once per reading,
/// possibly from a thread owned by the source.
pub type ReadingCallback = Arc<dyn Fn(Reading) + Send + Sync>;

/// A platform light sensor service.
///
/// Registration is capability based: the caller hands over a closure and
/// later revokes it with [`unregister`](SensorSource::unregister). Sources may
/// still be running a callback when `unregister` returns, so callers must
/// re-check their own state inside the callback. `register` and `unregister`
/// must not wait for a callback running on another thread.
pub trait SensorSource: Send + Sync {
    /// Whether the device has an ambient light sensor at all.
    fn is_available(&self) -> bool;

    /// Begin delivering readings to `callback` at roughly `rate`.
    fn register(&self, rate: SamplingRate, callback: ReadingCallback) -> Result<()>;

    /// Stop delivering readings to the registered callback.
    fn unregister(&self);
}
