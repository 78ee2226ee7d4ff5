//! Light sensor bridge library.
//!
//! Relays ambient light readings from a sensor service to a single consumer,
//! controlled over a command channel and streamed over an event channel.

pub mod bridge;
pub mod channels;
pub mod config;
pub mod error;
pub mod host;
pub mod sensors;

pub use bridge::{LightSensorBridge, ReadingSink, SubscriptionState};
pub use error::{BridgeError, Result};
pub use host::SensorHost;
pub use sensors::{Reading, SensorSource};
