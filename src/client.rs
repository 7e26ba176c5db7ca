use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::codec::{Request, Response};
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{devices_data_request, parse_devices_data, put_data_request};
use crate::session::{Session, SessionConfig};
use crate::types::*;
use crate::Result;

pub struct TydomClientBuilder {
    credentials: Credentials,
    config: SessionConfig,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl TydomClientBuilder {
    pub fn new(mac: impl Into<String>, password: impl Into<String>) -> Self {
        Self::from_credentials(Credentials::new(mac, password))
    }

    pub fn from_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            config: SessionConfig::default(),
            log_mode: None,
            log_path: None,
        }
    }

    /// Mediation host, optionally with a port.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.credentials.host = host.into();
        self
    }

    /// Use `http`/`ws` instead of `https`/`wss`.
    pub fn tls(mut self, enabled: bool) -> Self {
        self.config.tls = enabled;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<TydomClient> {
        let http = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        Ok(TydomClient {
            http,
            credentials: self.credentials,
            config: self.config,
            logger,
        })
    }
}

/// Async client for one E-Thermostaat behind the Tydom mediation server.
///
/// Every operation opens its own authenticated session and performs exactly
/// one request/response exchange on it.
pub struct TydomClient {
    http: reqwest::Client,
    credentials: Credentials,
    config: SessionConfig,
    logger: Option<MessageLogger>,
}

impl fmt::Debug for TydomClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TydomClient")
            .field("credentials", &self.credentials)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TydomClient {
    pub fn builder(mac: impl Into<String>, password: impl Into<String>) -> TydomClientBuilder {
        TydomClientBuilder::new(mac, password)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Send one framed request on a fresh session and return the decoded reply.
    pub async fn exchange(&mut self, request: &Request) -> Result<Response> {
        if let Some(ref mut logger) = self.logger {
            logger.log_request(&request.method, &request.path, request.body.as_deref());
        }

        let response = Session::new(&self.http, &self.config, &self.credentials)
            .exchange(request)
            .await?;

        if let Some(ref mut logger) = self.logger {
            logger.log_response(&request.path, response.status, &response.body);
        }
        Ok(response)
    }

    /// Read temperature, setpoint and run state of the thermostat.
    pub async fn fetch_snapshot(&mut self) -> Result<DeviceSnapshot> {
        let response = self.exchange(&devices_data_request()).await?;
        let snapshot = parse_devices_data(&response.body)?;
        debug!(
            endpoint = ?snapshot.endpoint_id,
            temperature = ?snapshot.temperature,
            setpoint = ?snapshot.setpoint,
            "fetched snapshot"
        );
        Ok(snapshot)
    }

    /// Write one attribute. The reply only has to decode; its content is
    /// not inspected.
    pub async fn set_attribute(
        &mut self,
        endpoint_id: &str,
        attribute: Attribute,
        value: impl fmt::Display,
    ) -> Result<()> {
        let command = DeviceCommand::new(endpoint_id, attribute, value);
        debug!(endpoint = %command.endpoint_id, attribute = %command.attribute, value = %command.value, "setting attribute");
        self.exchange(&put_data_request(&command)?).await?;
        Ok(())
    }

    pub async fn set_setpoint(&mut self, endpoint_id: &str, temperature: f64) -> Result<()> {
        self.set_attribute(endpoint_id, Attribute::Setpoint, temperature)
            .await
    }

    pub async fn set_run_state(&mut self, endpoint_id: &str, state: RunState) -> Result<()> {
        self.set_attribute(endpoint_id, Attribute::Authorization, state)
            .await
    }
}
