//! Channels exposed to the application messaging layer.
//!
//! - `command`: request/reply control (`startLightSensor`, `stopLightSensor`)
//! - `event`: subscription delivering one lux value per event
//!
//! [`ChannelRegistry`] routes by channel name so a host transport only needs
//! to know the names from [`ChannelConfig`].

pub mod command;
pub mod event;

pub use command::{CommandChannel, MethodCall, MethodResponse, SensorCommand};
pub use event::{LifecyclePolicy, LightEventChannel, StreamHandler, encode_event};

use crate::bridge::{LightSensorBridge, ReadingSink};
use crate::config::ChannelConfig;
use log::debug;
use std::sync::Arc;

pub struct ChannelRegistry {
    command_name: String,
    event_name: String,
    command: CommandChannel,
    events: LightEventChannel,
}

impl ChannelRegistry {
    pub fn new(
        config: &ChannelConfig,
        bridge: Arc<LightSensorBridge>,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            command_name: config.command_channel.clone(),
            event_name: config.event_channel.clone(),
            command: CommandChannel::new(bridge.clone()),
            events: LightEventChannel::new(bridge, policy),
        }
    }

    pub fn command_channel_name(&self) -> &str {
        &self.command_name
    }

    pub fn event_channel_name(&self) -> &str {
        &self.event_name
    }

    pub fn command(&self) -> &CommandChannel {
        &self.command
    }

    pub fn events(&self) -> &LightEventChannel {
        &self.events
    }

    /// Deliver a method call addressed to `channel`.
    ///
    /// Returns `None` when no command channel has that name.
    pub fn dispatch(&self, channel: &str, call: &MethodCall) -> Option<MethodResponse> {
        if channel != self.command_name {
            debug!("No command channel named {}", channel);
            return None;
        }
        Some(self.command.handle(call))
    }

    /// Subscribe `sink` to the event channel `channel`. Returns `false` for unknown names.
    pub fn listen(&self, channel: &str, sink: Box<dyn ReadingSink>) -> bool {
        if channel != self.event_name {
            debug!("No event channel named {}", channel);
            return false;
        }
        self.events.on_listen(sink);
        true
    }

    /// Cancel the subscription on `channel`. Returns `false` for unknown names.
    pub fn cancel(&self, channel: &str) -> bool {
        if channel != self.event_name {
            debug!("No event channel named {}", channel);
            return false;
        }
        self.events.on_cancel();
        true
    }
}
