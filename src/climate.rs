use serde::Deserialize;
use tracing::{debug, error};

use crate::blocking;
use crate::types::{DeviceSnapshot, RunState};
use crate::{Error, Result};

pub const DEFAULT_NAME: &str = "DeltaDore";
pub const DEFAULT_COMFORT_TEMPERATURE: f64 = 22.0;
pub const DEFAULT_SAVING_TEMPERATURE: f64 = 18.0;
pub const DEFAULT_AWAY_TEMPERATURE: f64 = 14.0;
pub const MIN_TEMP: f64 = 14.0;
pub const MAX_TEMP: f64 = 28.0;

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_comfort() -> f64 {
    DEFAULT_COMFORT_TEMPERATURE
}

fn default_saving() -> f64 {
    DEFAULT_SAVING_TEMPERATURE
}

fn default_away() -> f64 {
    DEFAULT_AWAY_TEMPERATURE
}

#[derive(Clone, Deserialize)]
pub struct ClimateConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_comfort")]
    pub comfort_temperature: f64,
    #[serde(default = "default_saving")]
    pub saving_temperature: f64,
    #[serde(default = "default_away")]
    pub away_temperature: f64,
}

impl ClimateConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            username: username.into(),
            password: password.into(),
            comfort_temperature: DEFAULT_COMFORT_TEMPERATURE,
            saving_temperature: DEFAULT_SAVING_TEMPERATURE,
            away_temperature: DEFAULT_AWAY_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Comfort,
    Saving,
    Away,
    Fixed,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Away, Preset::Comfort, Preset::Fixed, Preset::Saving];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Comfort => "Confort",
            Preset::Saving => "Saving",
            Preset::Away => "Away",
            Preset::Fixed => "Fixed",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "Confort" | "Comfort" => Some(Preset::Comfort),
            "Saving" => Some(Preset::Saving),
            "Away" => Some(Preset::Away),
            "Fixed" => Some(Preset::Fixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacMode {
    Off,
    Heat,
}

impl HvacMode {
    pub fn run_state(&self) -> RunState {
        match self {
            HvacMode::Off => RunState::Stop,
            HvacMode::Heat => RunState::Heating,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacAction {
    Idle,
    Heating,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClimateState {
    pub target_temperature: f64,
    pub current_temperature: f64,
    pub run_state_label: &'static str,
    pub endpoint_id: Option<String>,
    pub preset: Option<Preset>,
}

impl ClimateState {
    pub fn hvac_action(&self) -> HvacAction {
        if self.target_temperature < self.current_temperature {
            HvacAction::Idle
        } else {
            HvacAction::Heating
        }
    }
}

fn run_state_label(authorization: Option<&str>) -> &'static str {
    match authorization.and_then(RunState::from_tydom_str) {
        Some(RunState::Stop) => "Off",
        Some(RunState::Heating) => "On",
        None => "Unknown",
    }
}

/// The device operations a [`Thermostat`] needs.
pub trait DeviceApi {
    fn fetch_snapshot(&mut self) -> Result<DeviceSnapshot>;
    fn set_setpoint(&mut self, endpoint_id: &str, temperature: f64) -> Result<()>;
    fn set_run_state(&mut self, endpoint_id: &str, state: RunState) -> Result<()>;
}

impl DeviceApi for blocking::TydomClient {
    fn fetch_snapshot(&mut self) -> Result<DeviceSnapshot> {
        blocking::TydomClient::fetch_snapshot(self)
    }

    fn set_setpoint(&mut self, endpoint_id: &str, temperature: f64) -> Result<()> {
        blocking::TydomClient::set_setpoint(self, endpoint_id, temperature)
    }

    fn set_run_state(&mut self, endpoint_id: &str, state: RunState) -> Result<()> {
        blocking::TydomClient::set_run_state(self, endpoint_id, state)
    }
}

/// Capability set a host adapter drives.
pub trait ClimateDevice {
    /// Refresh from the device. `Ok(false)` means nothing usable came back
    /// and the previous state was kept.
    fn update(&mut self) -> Result<bool>;
    fn state(&self) -> ClimateState;
    fn set_target_temperature(&mut self, value: f64) -> Result<()>;
    fn set_preset(&mut self, preset: Preset) -> Result<()>;
    fn set_run_mode(&mut self, mode: HvacMode) -> Result<()>;
}

pub struct Thermostat<A = blocking::TydomClient> {
    name: String,
    api: A,
    comfort_temperature: f64,
    saving_temperature: f64,
    away_temperature: f64,
    current_temperature: f64,
    target_temperature: f64,
    run_state_label: &'static str,
    endpoint_id: Option<String>,
    preset: Option<Preset>,
}

impl Thermostat<blocking::TydomClient> {
    pub fn from_config(config: ClimateConfig) -> Result<Self> {
        let api = blocking::TydomClient::builder(&config.username, &config.password).build()?;
        Ok(Self::new(config, api))
    }
}

impl<A: DeviceApi> Thermostat<A> {
    pub fn new(config: ClimateConfig, api: A) -> Self {
        Self {
            name: config.name,
            api,
            comfort_temperature: config.comfort_temperature,
            saving_temperature: config.saving_temperature,
            away_temperature: config.away_temperature,
            current_temperature: 0.0,
            target_temperature: 0.0,
            run_state_label: run_state_label(None),
            endpoint_id: None,
            preset: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> String {
        format!("{}_climate", self.name)
    }

    fn endpoint(&self) -> Result<String> {
        self.endpoint_id.clone().ok_or(Error::NoEndpoint)
    }

    fn send_temperature(&mut self, temperature: f64) -> Result<()> {
        if !(MIN_TEMP..=MAX_TEMP).contains(&temperature) {
            return Err(Error::InvalidTemperature {
                value: temperature,
                min: MIN_TEMP,
                max: MAX_TEMP,
            });
        }
        let endpoint = self.endpoint()?;
        self.api.set_setpoint(&endpoint, temperature)?;
        self.target_temperature = temperature;
        Ok(())
    }
}

impl<A: DeviceApi> ClimateDevice for Thermostat<A> {
    fn update(&mut self) -> Result<bool> {
        let snapshot = self.api.fetch_snapshot()?;
        let Some(current) = snapshot.temperature else {
            error!(name = %self.name, ?snapshot, "could not get data from Tydom");
            return Ok(false);
        };

        self.current_temperature = current;
        self.target_temperature = snapshot.setpoint.unwrap_or(current);
        self.run_state_label = run_state_label(snapshot.authorization.as_deref());
        if snapshot.endpoint_id.is_some() {
            self.endpoint_id = snapshot.endpoint_id;
        }
        debug!(
            target = self.target_temperature,
            current = self.current_temperature,
            "Delta Dore values"
        );
        Ok(true)
    }

    fn state(&self) -> ClimateState {
        ClimateState {
            target_temperature: self.target_temperature,
            current_temperature: self.current_temperature,
            run_state_label: self.run_state_label,
            endpoint_id: self.endpoint_id.clone(),
            preset: self.preset,
        }
    }

    fn set_target_temperature(&mut self, value: f64) -> Result<()> {
        self.send_temperature(value)
    }

    fn set_preset(&mut self, preset: Preset) -> Result<()> {
        let temperature = match preset {
            Preset::Comfort => self.comfort_temperature,
            Preset::Saving => self.saving_temperature,
            Preset::Away => self.away_temperature,
            Preset::Fixed => self.target_temperature,
        };
        self.send_temperature(temperature)?;
        self.preset = Some(preset);
        Ok(())
    }

    fn set_run_mode(&mut self, mode: HvacMode) -> Result<()> {
        let endpoint = self.endpoint()?;
        self.api.set_run_state(&endpoint, mode.run_state())
    }
}
