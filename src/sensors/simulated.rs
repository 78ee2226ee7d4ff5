//! Simulated ambient light sensor.
//!
//! Stands in for the platform sensor service on hosts without one (and in
//! tests). When registered inside a tokio runtime it emits a reading every
//! period; readings can also be pushed by hand with [`SimulatedLightSensor::inject`].

use super::{Reading, ReadingCallback, SamplingRate, SensorSource};
use crate::config::SimulationConfig;
use crate::error::{BridgeError, Result};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

pub struct SimulatedLightSensor {
    present: bool,
    ticking: bool,
    base_lux: f64,
    jitter_lux: f64,
    /// Overrides the requested sampling period when set.
    period: Option<Duration>,
    callback: Arc<RwLock<Option<ReadingCallback>>>,
    task: Mutex<Option<CancellationToken>>,
    registrations: AtomicU32,
    unregistrations: AtomicU32,
}

impl SimulatedLightSensor {
    /// Create a ticking sensor from configuration.
    ///
    /// Non-finite lux values fall back to zero so the ticker never panics.
    pub fn new(config: &SimulationConfig) -> Self {
        let base_lux = finite_or_zero("base_lux", config.base_lux);
        let jitter_lux = finite_or_zero("jitter_lux", config.jitter_lux).abs();
        Self::build(
            config.sensor_present,
            true,
            base_lux,
            jitter_lux,
            Some(Duration::from_millis(config.period_ms.max(1))),
        )
    }

    /// A present sensor that only produces readings through [`inject`](Self::inject).
    pub fn manual() -> Self {
        Self::build(true, false, 0.0, 0.0, None)
    }

    /// A device without a light sensor.
    pub fn absent() -> Self {
        Self::build(false, false, 0.0, 0.0, None)
    }

    fn build(
        present: bool,
        ticking: bool,
        base_lux: f64,
        jitter_lux: f64,
        period: Option<Duration>,
    ) -> Self {
        Self {
            present,
            ticking,
            base_lux,
            jitter_lux,
            period,
            callback: Arc::new(RwLock::new(None)),
            task: Mutex::new(None),
            registrations: AtomicU32::new(0),
            unregistrations: AtomicU32::new(0),
        }
    }

    /// Push a reading through the registered callback.
    ///
    /// Returns `false` when nothing is registered.
    pub fn inject(&self, reading: impl Into<Reading>) -> bool {
        let callback = self.callback.read().clone();
        match callback {
            Some(cb) => {
                cb(reading.into());
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.callback.read().is_some()
    }

    /// Number of successful `register` calls.
    pub fn registrations(&self) -> u32 {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Number of `unregister` calls that removed a callback.
    pub fn unregistrations(&self) -> u32 {
        self.unregistrations.load(Ordering::SeqCst)
    }

    fn spawn_ticker(&self, period: Duration) -> Option<CancellationToken> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => {
                debug!("[Sim] No tokio runtime, light sensor only accepts injected readings");
                return None;
            }
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let callback = self.callback.clone();
        let base = self.base_lux;
        let jitter = self.jitter_lux;

        handle.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let reading = Reading::now(next_lux(base, jitter));
                        let cb = callback.read().clone();
                        if let Some(cb) = cb {
                            cb(reading);
                        }
                    }
                }
            }
            debug!("[Sim] Light sensor ticker stopped");
        });

        Some(token)
    }
}

impl SensorSource for SimulatedLightSensor {
    fn is_available(&self) -> bool {
        self.present
    }

    fn register(&self, rate: SamplingRate, callback: ReadingCallback) -> Result<()> {
        if !self.present {
            return Err(BridgeError::SensorUnavailable);
        }

        *self.callback.write() = Some(callback);
        self.registrations.fetch_add(1, Ordering::SeqCst);

        if self.ticking {
            let period = self
                .period
                .unwrap_or_else(|| rate.period())
                .max(Duration::from_millis(1));
            let token = self.spawn_ticker(period);
            if let Some(old) = std::mem::replace(&mut *self.task.lock(), token) {
                old.cancel();
            }
            info!("[Sim] Light sensor registered, period {:?}", period);
        }
        Ok(())
    }

    fn unregister(&self) {
        if let Some(token) = self.task.lock().take() {
            token.cancel();
        }
        if self.callback.write().take().is_some() {
            self.unregistrations.fetch_add(1, Ordering::SeqCst);
            info!("[Sim] Light sensor unregistered");
        }
    }
}

impl Drop for SimulatedLightSensor {
    fn drop(&mut self) {
        if let Some(token) = self.task.get_mut().take() {
            token.cancel();
        }
    }
}

fn finite_or_zero(name: &str, value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!("[Sim] Ignoring non-finite {} ({}), using 0", name, value);
        0.0
    }
}

/// Base illuminance plus uniform jitter, never below zero.
fn next_lux(base: f64, jitter: f64) -> f64 {
    let offset = if jitter.is_finite() && jitter > 0.0 {
        rand::thread_rng().gen_range(-jitter..=jitter)
    } else {
        0.0
    };
    (base + offset).max(0.0)
}
