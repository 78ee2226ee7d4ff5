//! Owning context for the light sensor bridge.
//!
//! [`SensorHost`] plays the part of the application shell's activity: it
//! builds the bridge and its channels, reacts to pause/resume, and stops the
//! sensor exactly once when it is torn down.

use crate::bridge::LightSensorBridge;
use crate::channels::ChannelRegistry;
use crate::config::Config;
use crate::sensors::SensorSource;
use log::{info, warn};
use std::sync::Arc;

pub struct SensorHost {
    bridge: Arc<LightSensorBridge>,
    channels: ChannelRegistry,
    pause_in_background: bool,
    /// Set when `on_pause` stopped a running sensor.
    resume_pending: bool,
}

impl SensorHost {
    pub fn new(config: &Config, source: Arc<dyn SensorSource>) -> Self {
        let bridge = Arc::new(LightSensorBridge::new(source));
        let channels =
            ChannelRegistry::new(&config.channels, bridge.clone(), config.lifecycle.policy);

        info!(
            "Sensor host ready: commands on {}, events on {} ({})",
            config.channels.command_channel,
            config.channels.event_channel,
            config.lifecycle.policy
        );

        Self {
            bridge,
            channels,
            pause_in_background: config.lifecycle.pause_in_background,
            resume_pending: false,
        }
    }

    pub fn bridge(&self) -> &Arc<LightSensorBridge> {
        &self.bridge
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Host moved to the background.
    pub fn on_pause(&mut self) {
        if self.pause_in_background && self.bridge.is_listening() {
            info!("Pausing light sensor while in background");
            self.bridge.stop();
            self.resume_pending = true;
        }
    }

    /// Host returned to the foreground. Restarts the sensor only if `on_pause`
    /// stopped it and a consumer is still attached.
    pub fn on_resume(&mut self) {
        if !std::mem::take(&mut self.resume_pending) {
            return;
        }
        if !self.bridge.has_sink() {
            info!("No light sensor consumer left, staying stopped");
            return;
        }
        if let Err(e) = self.bridge.start() {
            warn!("Failed to resume light sensor: {}", e);
        }
    }
}

impl Drop for SensorHost {
    fn drop(&mut self) {
        self.bridge.stop();
        info!("Sensor host destroyed");
    }
}
