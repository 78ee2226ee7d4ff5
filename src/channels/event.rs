//! Push-based event channel carrying lux readings.

use crate::bridge::{LightSensorBridge, ReadingSink};
use crate::sensors::Reading;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use strum::{Display, EnumString};

/// How subscribing to the event channel relates to the sensor registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LifecyclePolicy {
    /// Only the command channel starts and stops the sensor. Cancelling a
    /// subscription leaves the registration running for a fast resubscribe.
    Explicit,
    /// Listening starts the sensor and cancelling stops it.
    AutoStart,
}

/// Subscription side of an event channel.
pub trait StreamHandler: Send + Sync {
    fn on_listen(&self, sink: Box<dyn ReadingSink>);
    fn on_cancel(&self);
}

pub struct LightEventChannel {
    bridge: Arc<LightSensorBridge>,
    policy: LifecyclePolicy,
}

impl LightEventChannel {
    pub fn new(bridge: Arc<LightSensorBridge>, policy: LifecyclePolicy) -> Self {
        Self { bridge, policy }
    }

    pub fn policy(&self) -> LifecyclePolicy {
        self.policy
    }
}

impl StreamHandler for LightEventChannel {
    fn on_listen(&self, sink: Box<dyn ReadingSink>) {
        self.bridge.attach_sink(sink);
        info!("Light event stream subscribed ({})", self.policy);

        if self.policy == LifecyclePolicy::AutoStart
            && let Err(e) = self.bridge.start()
        {
            warn!("Light event stream has no source: {}", e);
        }
    }

    fn on_cancel(&self) {
        if self.policy == LifecyclePolicy::AutoStart {
            self.bridge.stop();
        }
        self.bridge.detach_sink();
        info!("Light event stream cancelled");
    }
}

/// Event payload for one reading: a bare lux value.
pub fn encode_event(reading: &Reading) -> Value {
    Value::from(reading.lux())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SimulatedLightSensor;
    use std::str::FromStr;
    use tokio::sync::mpsc;

    fn setup(
        policy: LifecyclePolicy,
    ) -> (LightEventChannel, Arc<LightSensorBridge>, Arc<SimulatedLightSensor>) {
        let sensor = Arc::new(SimulatedLightSensor::manual());
        let bridge = Arc::new(LightSensorBridge::new(sensor.clone()));
        (LightEventChannel::new(bridge.clone(), policy), bridge, sensor)
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(
            LifecyclePolicy::from_str("auto-start").unwrap(),
            LifecyclePolicy::AutoStart
        );
        assert_eq!(LifecyclePolicy::Explicit.to_string(), "explicit");
        assert!(LifecyclePolicy::from_str("lazy").is_err());
    }

    #[test]
    fn test_auto_start_listen_starts_and_cancel_stops() {
        let (channel, bridge, sensor) = setup(LifecyclePolicy::AutoStart);
        let (tx, mut rx) = mpsc::channel::<Reading>(16);

        channel.on_listen(Box::new(tx));
        assert!(bridge.is_listening());
        sensor.inject(120.0);
        assert_eq!(rx.try_recv().unwrap().lux(), 120.0);

        channel.on_cancel();
        assert!(!bridge.is_listening());
        assert!(!bridge.has_sink());
        assert_eq!(sensor.unregistrations(), 1);
    }

    #[test]
    fn test_explicit_listen_does_not_start() {
        let (channel, bridge, sensor) = setup(LifecyclePolicy::Explicit);
        let (tx, mut rx) = mpsc::channel::<Reading>(16);

        channel.on_listen(Box::new(tx));
        assert!(!bridge.is_listening());
        assert!(!sensor.inject(1.0));
        assert!(rx.try_recv().is_err());

        bridge.start().unwrap();
        sensor.inject(2.0);
        assert_eq!(rx.try_recv().unwrap().lux(), 2.0);
    }

    #[test]
    fn test_explicit_cancel_keeps_registration() {
        let (channel, bridge, sensor) = setup(LifecyclePolicy::Explicit);
        let (tx, _rx) = mpsc::channel::<Reading>(16);

        bridge.start().unwrap();
        channel.on_listen(Box::new(tx));
        channel.on_cancel();

        assert!(bridge.is_listening());
        assert!(!bridge.has_sink());
        assert!(sensor.is_registered());
        assert_eq!(sensor.unregistrations(), 0);
    }

    #[test]
    fn test_auto_start_relisten_replaces_sink() {
        let (channel, bridge, sensor) = setup(LifecyclePolicy::AutoStart);
        let (tx_a, mut rx_a) = mpsc::channel::<Reading>(16);
        let (tx_b, mut rx_b) = mpsc::channel::<Reading>(16);

        channel.on_listen(Box::new(tx_a));
        channel.on_listen(Box::new(tx_b));
        sensor.inject(7.0);

        assert_eq!(sensor.registrations(), 1);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap().lux(), 7.0);
        assert!(bridge.is_listening());
    }

    #[test]
    fn test_encode_event() {
        assert_eq!(encode_event(&Reading::new(500.0)), serde_json::json!(500.0));
    }
}
