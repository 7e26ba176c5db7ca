use std::fmt;

pub const DEFAULT_HOST: &str = "mediation.tydom.com";

/// Login material for the mediation server. The identity is the Tydom
/// gateway MAC address, the secret its password.
#[derive(Clone)]
pub struct Credentials {
    pub mac: String,
    pub password: String,
    pub host: String,
}

impl Credentials {
    pub fn new(mac: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            password: password.into(),
            host: DEFAULT_HOST.to_string(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Path and query of the mediation resource, shared by the challenge
    /// request, the socket upgrade and the digest `uri` field.
    pub fn resource(&self) -> String {
        format!("/mediation/client?mac={}&appli=1", self.mac)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("mac", &self.mac)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

/// Attributes the thermostat accepts writes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Setpoint,
    Authorization,
}

impl Attribute {
    pub fn as_tydom_str(&self) -> &'static str {
        match self {
            Attribute::Setpoint => "setpoint",
            Attribute::Authorization => "authorization",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tydom_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stop,
    Heating,
}

impl RunState {
    pub fn as_tydom_str(&self) -> &'static str {
        match self {
            RunState::Stop => "STOP",
            RunState::Heating => "HEATING",
        }
    }

    pub fn from_tydom_str(s: &str) -> Option<Self> {
        match s {
            "STOP" => Some(RunState::Stop),
            "HEATING" => Some(RunState::Heating),
            _ => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tydom_str())
    }
}

/// Flattened view of the `/devices/data` response.
///
/// Only the last endpoint that carried a tracked attribute contributes its
/// id. Devices exposing several endpoints therefore report attributes from
/// all of them under a single id; see `protocol::parse_devices_data`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSnapshot {
    pub endpoint_id: Option<String>,
    pub temperature: Option<f64>,
    pub setpoint: Option<f64>,
    pub authorization: Option<String>,
    pub hvac_mode: Option<String>,
}

impl DeviceSnapshot {
    pub fn is_empty(&self) -> bool {
        self.endpoint_id.is_none()
            && self.temperature.is_none()
            && self.setpoint.is_none()
            && self.authorization.is_none()
            && self.hvac_mode.is_none()
    }

    pub fn run_state(&self) -> Option<RunState> {
        self.authorization.as_deref().and_then(RunState::from_tydom_str)
    }
}

/// One attribute write, alive for the duration of a single exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCommand {
    pub endpoint_id: String,
    pub attribute: Attribute,
    pub value: String,
}

impl DeviceCommand {
    pub fn new(endpoint_id: impl Into<String>, attribute: Attribute, value: impl fmt::Display) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            attribute,
            value: value.to_string(),
        }
    }
}
