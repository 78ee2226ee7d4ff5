use crate::channels::LifecyclePolicy;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Parse `KEY=value` lines, skipping blanks and comments and stripping
/// one pair of surrounding quotes from the value.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key, value));
        }
    }

    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub channels: ChannelConfig,
    pub lifecycle: LifecycleConfig,
    pub simulation: SimulationConfig,
}

/// Names the host messaging layer routes by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub command_channel: String,
    pub event_channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Whether subscribing to the event channel also starts the sensor.
    pub policy: LifecyclePolicy,
    /// Stop the sensor while the host is paused and restart it on resume.
    pub pause_in_background: bool,
}

/// Parameters for the simulated light sensor used by the demo host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub sensor_present: bool,
    pub base_lux: f64,
    pub jitter_lux: f64,
    pub period_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channels: ChannelConfig {
                command_channel: "com.getup.alarm/sensors".to_string(),
                event_channel: "com.getup.alarm/light_sensor".to_string(),
            },
            lifecycle: LifecycleConfig {
                policy: LifecyclePolicy::AutoStart,
                pause_in_background: false,
            },
            simulation: SimulationConfig {
                sensor_present: true,
                base_lux: 320.0,
                jitter_lux: 40.0,
                period_ms: 200,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from defaults overridden by `lookup`.
    ///
    /// Values that fail to parse are ignored and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(name) = lookup("LIGHT_COMMAND_CHANNEL") {
            config.channels.command_channel = name;
        }
        if let Some(name) = lookup("LIGHT_EVENT_CHANNEL") {
            config.channels.event_channel = name;
        }

        if let Some(policy) = lookup("LIGHT_LIFECYCLE_POLICY")
            && let Ok(p) = LifecyclePolicy::from_str(policy.trim())
        {
            config.lifecycle.policy = p;
        }
        if let Some(pause) = lookup("LIGHT_PAUSE_IN_BACKGROUND")
            && let Some(p) = parse_bool(&pause)
        {
            config.lifecycle.pause_in_background = p;
        }

        // Simulation
        if let Some(present) = lookup("LIGHT_SENSOR_PRESENT")
            && let Some(p) = parse_bool(&present)
        {
            config.simulation.sensor_present = p;
        }
        if let Some(lux) = lookup("LIGHT_SIM_BASE_LUX")
            && let Ok(l) = lux.trim().parse()
        {
            config.simulation.base_lux = l;
        }
        if let Some(jitter) = lookup("LIGHT_SIM_JITTER_LUX")
            && let Ok(j) = jitter.trim().parse()
        {
            config.simulation.jitter_lux = j;
        }
        if let Some(period) = lookup("LIGHT_SIM_PERIOD_MS")
            && let Ok(p) = period.trim().parse()
        {
            config.simulation.period_ms = p;
        }

        config
    }

    /// Reject values the simulated sensor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.channels.command_channel.is_empty() || self.channels.event_channel.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "channel names must not be empty".to_string(),
            ));
        }
        if self.channels.command_channel == self.channels.event_channel {
            return Err(BridgeError::InvalidConfig(format!(
                "command and event channel share the name {}",
                self.channels.command_channel
            )));
        }
        if self.simulation.period_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "simulation period must be at least 1 ms".to_string(),
            ));
        }
        if !self.simulation.base_lux.is_finite()
            || !self.simulation.jitter_lux.is_finite()
            || self.simulation.jitter_lux < 0.0
        {
            return Err(BridgeError::InvalidConfig(
                "simulation lux values must be finite and jitter non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.channels.command_channel, "com.getup.alarm/sensors");
        assert_eq!(config.channels.event_channel, "com.getup.alarm/light_sensor");
        assert_eq!(config.lifecycle.policy, LifecyclePolicy::AutoStart);
        assert!(!config.lifecycle.pause_in_background);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("LIGHT_COMMAND_CHANNEL", "app/cmd"),
            ("LIGHT_LIFECYCLE_POLICY", "explicit"),
            ("LIGHT_PAUSE_IN_BACKGROUND", "yes"),
            ("LIGHT_SENSOR_PRESENT", "false"),
            ("LIGHT_SIM_PERIOD_MS", "50"),
            ("LIGHT_SIM_BASE_LUX", "12.5"),
        ]));

        assert_eq!(config.channels.command_channel, "app/cmd");
        assert_eq!(config.lifecycle.policy, LifecyclePolicy::Explicit);
        assert!(config.lifecycle.pause_in_background);
        assert!(!config.simulation.sensor_present);
        assert_eq!(config.simulation.period_ms, 50);
        assert_eq!(config.simulation.base_lux, 12.5);
    }

    #[test]
    fn test_unparseable_values_keep_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("LIGHT_LIFECYCLE_POLICY", "sometimes"),
            ("LIGHT_SIM_PERIOD_MS", "soon"),
            ("LIGHT_PAUSE_IN_BACKGROUND", "maybe"),
        ]));

        assert_eq!(config.lifecycle.policy, LifecyclePolicy::AutoStart);
        assert_eq!(config.simulation.period_ms, 200);
        assert!(!config.lifecycle.pause_in_background);
    }

    #[test]
    fn test_validate_rejects_shared_channel_name() {
        let mut config = Config::default();
        config.channels.event_channel = config.channels.command_channel.clone();
        assert!(matches!(
            config.validate(),
            Err(BridgeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_period() {
        let mut config = Config::default();
        config.simulation.period_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_dotenv() {
        let pairs = parse_dotenv(
            "# comment\n\nLIGHT_EVENT_CHANNEL = \"my app/light\"\nLIGHT_SIM_BASE_LUX=10\nbroken line\n",
        );
        assert_eq!(
            pairs,
            vec![
                ("LIGHT_EVENT_CHANNEL", "my app/light"),
                ("LIGHT_SIM_BASE_LUX", "10")
            ]
        );
    }
}
