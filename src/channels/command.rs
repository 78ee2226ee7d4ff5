//! Request/reply control channel for the light sensor.

use crate::bridge::LightSensorBridge;
use crate::error::{BridgeError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumString};

/// Commands understood by the command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, Display)]
pub enum SensorCommand {
    #[strum(serialize = "startLightSensor")]
    StartLightSensor,
    #[strum(serialize = "stopLightSensor")]
    StopLightSensor,
}

impl SensorCommand {
    pub fn parse(method: &str) -> Result<Self> {
        Self::from_str(method).map_err(|_| BridgeError::UnknownCommand(method.to_string()))
    }
}

/// An incoming method invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Value::Null,
        }
    }
}

/// Reply to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResponse {
    Success {
        #[serde(default)]
        result: Value,
    },
    NotImplemented,
    Error {
        code: String,
        message: String,
    },
}

impl MethodResponse {
    pub fn success() -> Self {
        MethodResponse::Success {
            result: Value::Null,
        }
    }
}

pub struct CommandChannel {
    bridge: Arc<LightSensorBridge>,
}

impl CommandChannel {
    pub fn new(bridge: Arc<LightSensorBridge>) -> Self {
        Self { bridge }
    }

    /// Dispatch a method call to the bridge.
    ///
    /// A missing sensor still replies success; the caller simply never sees
    /// readings.
    pub fn handle(&self, call: &MethodCall) -> MethodResponse {
        let command = match SensorCommand::parse(&call.method) {
            Ok(c) => c,
            Err(e) => {
                debug!("{}", e);
                return MethodResponse::NotImplemented;
            }
        };

        match command {
            SensorCommand::StartLightSensor => {
                if let Err(e) = self.bridge.start() {
                    warn!("{}: {}", command, e);
                }
            }
            SensorCommand::StopLightSensor => self.bridge.stop(),
        }
        MethodResponse::success()
    }

    /// Decode a JSON [`MethodCall`], dispatch it, and encode the reply.
    ///
    /// Malformed envelopes produce an `error` reply rather than a failure.
    pub fn handle_json(&self, raw: &str) -> Result<String> {
        let response = match serde_json::from_str::<MethodCall>(raw) {
            Ok(call) => self.handle(&call),
            Err(e) => MethodResponse::Error {
                code: "BAD_ENVELOPE".to_string(),
                message: e.to_string(),
            },
        };
        Ok(serde_json::to_string(&response)?)
    }
}
