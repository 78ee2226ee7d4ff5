//! Sensor-to-stream bridge.
//!
//! [`LightSensorBridge`] owns the registration with a [`SensorSource`] and
//! relays each reading to at most one attached [`ReadingSink`].
//!
//! Control operations (`start`, `stop`, `attach_sink`, `detach_sink`) come
//! from the owner; readings arrive on whatever thread the source uses. The
//! subscription state and the sink live behind one re-entrant lock that the
//! reading path also holds while forwarding, so once `stop` or `detach_sink`
//! returns on another thread no reading can reach the previous sink. A sink
//! may call back into the bridge from `deliver`; the lock is re-entrant and no
//! `RefCell` borrow is held across the call.

pub mod sink;

pub use sink::{FnSink, ReadingSink};

use crate::error::{BridgeError, Result};
use crate::sensors::{Reading, ReadingCallback, SamplingRate, SensorSource};
use log::{debug, info, warn};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Whether the bridge currently holds a registration with the sensor source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionState {
    #[default]
    Idle,
    Listening,
}

#[derive(Default)]
struct Relay {
    state: SubscriptionState,
    sink: Option<Arc<dyn ReadingSink>>,
}

/// State shared with the callback registered at the source.
struct Shared {
    relay: ReentrantMutex<RefCell<Relay>>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            relay: ReentrantMutex::new(RefCell::new(Relay::default())),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    fn on_reading(&self, reading: Reading) {
        let relay = self.relay.lock();
        let sink = {
            let relay = relay.borrow();
            match (relay.state, relay.sink.as_ref()) {
                (SubscriptionState::Listening, Some(sink)) => Some(sink.clone()),
                _ => None,
            }
        };

        match sink {
            Some(sink) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                sink.deliver(reading);
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

pub struct LightSensorBridge {
    source: Arc<dyn SensorSource>,
    shared: Arc<Shared>,
}

impl LightSensorBridge {
    pub fn new(source: Arc<dyn SensorSource>) -> Self {
        Self {
            source,
            shared: Arc::new(Shared::new()),
        }
    }

    /// Register with the sensor source and begin relaying readings.
    ///
    /// Does nothing if already listening. Returns
    /// [`BridgeError::SensorUnavailable`] and stays idle when the device has
    /// no light sensor.
    pub fn start(&self) -> Result<()> {
        let relay = self.shared.relay.lock();

        if relay.borrow().state == SubscriptionState::Listening {
            debug!("Light sensor already listening");
            return Ok(());
        }
        if !self.source.is_available() {
            warn!("No ambient light sensor available, not starting");
            return Err(BridgeError::SensorUnavailable);
        }

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let callback: ReadingCallback = Arc::new(move |reading: Reading| {
            if let Some(shared) = shared.upgrade() {
                shared.on_reading(reading);
            }
        });
        self.source.register(SamplingRate::Normal, callback)?;

        relay.borrow_mut().state = SubscriptionState::Listening;
        info!("Light sensor listening");
        Ok(())
    }

    /// Deregister from the sensor source. Does nothing if idle.
    pub fn stop(&self) {
        let relay = self.shared.relay.lock();

        {
            let mut relay = relay.borrow_mut();
            if relay.state == SubscriptionState::Idle {
                return;
            }
            relay.state = SubscriptionState::Idle;
        }
        // Readings still in flight at the source now see Idle and are dropped.
        self.source.unregister();
        info!("Light sensor stopped");
    }

    /// Make `sink` the consumer of subsequent readings.
    ///
    /// Returns the sink it replaced, which receives nothing further.
    pub fn attach_sink(&self, sink: Box<dyn ReadingSink>) -> Option<Arc<dyn ReadingSink>> {
        let previous = self
            .shared
            .relay
            .lock()
            .borrow_mut()
            .sink
            .replace(Arc::from(sink));
        if previous.is_some() {
            debug!("Replaced light sensor consumer");
        } else {
            debug!("Attached light sensor consumer");
        }
        previous
    }

    /// Remove the current consumer; readings are dropped until another attaches.
    pub fn detach_sink(&self) -> Option<Arc<dyn ReadingSink>> {
        let previous = self.shared.relay.lock().borrow_mut().sink.take();
        if previous.is_some() {
            debug!("Detached light sensor consumer");
        }
        previous
    }

    /// Relay one reading. This is the path the registered source callback takes.
    pub fn on_reading(&self, reading: Reading) {
        self.shared.on_reading(reading);
    }

    pub fn state(&self) -> SubscriptionState {
        self.shared.relay.lock().borrow().state
    }

    pub fn is_listening(&self) -> bool {
        self.state() == SubscriptionState::Listening
    }

    pub fn has_sink(&self) -> bool {
        self.shared.relay.lock().borrow().sink.is_some()
    }

    /// Readings forwarded to a sink since construction.
    pub fn delivered_count(&self) -> u64 {
        self.shared.delivered.load(Ordering::Relaxed)
    }

    /// Readings dropped because the bridge was idle or had no sink.
    pub fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}
