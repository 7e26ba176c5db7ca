use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::client::{TydomClient as AsyncClient, TydomClientBuilder as AsyncBuilder};
use crate::codec::{Request, Response};
use crate::logger::MessageLogMode;
use crate::types::*;
use crate::Result;

static RUNTIME: Mutex<Option<Runtime>> = Mutex::new(None);

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let mut guard = RUNTIME.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let rt = match guard.take() {
        Some(rt) => rt,
        None => Builder::new_current_thread().enable_all().build()?,
    };
    let output = rt.block_on(future);
    *guard = Some(rt);
    Ok(output)
}

pub struct TydomClientBuilder {
    inner: AsyncBuilder,
}

impl TydomClientBuilder {
    pub fn new(mac: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            inner: AsyncBuilder::new(mac, password),
        }
    }

    pub fn from_credentials(credentials: Credentials) -> Self {
        Self {
            inner: AsyncBuilder::from_credentials(credentials),
        }
    }

    pub fn host(self, host: impl Into<String>) -> Self {
        Self {
            inner: self.inner.host(host),
        }
    }

    pub fn tls(self, enabled: bool) -> Self {
        Self {
            inner: self.inner.tls(enabled),
        }
    }

    pub fn connect_timeout(self, timeout: Duration) -> Self {
        Self {
            inner: self.inner.connect_timeout(timeout),
        }
    }

    pub fn message_log(self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        Self {
            inner: self.inner.message_log(mode, path),
        }
    }

    pub fn build(self) -> Result<TydomClient> {
        Ok(TydomClient {
            inner: self.inner.build()?,
        })
    }
}

/// Blocking counterpart of [`crate::TydomClient`].
///
/// All blocking clients share one current-thread runtime behind a mutex held
/// for the whole exchange, so concurrent callers are served one at a time.
/// Calling from inside an async runtime panics.
pub struct TydomClient {
    inner: AsyncClient,
}

impl fmt::Debug for TydomClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl TydomClient {
    pub fn builder(mac: impl Into<String>, password: impl Into<String>) -> TydomClientBuilder {
        TydomClientBuilder::new(mac, password)
    }

    pub fn credentials(&self) -> &Credentials {
        self.inner.credentials()
    }

    pub fn exchange(&mut self, request: &Request) -> Result<Response> {
        block_on(self.inner.exchange(request))?
    }

    pub fn fetch_snapshot(&mut self) -> Result<DeviceSnapshot> {
        block_on(self.inner.fetch_snapshot())?
    }

    pub fn set_attribute(
        &mut self,
        endpoint_id: &str,
        attribute: Attribute,
        value: impl fmt::Display,
    ) -> Result<()> {
        block_on(self.inner.set_attribute(endpoint_id, attribute, value))?
    }

    pub fn set_setpoint(&mut self, endpoint_id: &str, temperature: f64) -> Result<()> {
        block_on(self.inner.set_setpoint(endpoint_id, temperature))?
    }

    pub fn set_run_state(&mut self, endpoint_id: &str, state: RunState) -> Result<()> {
        block_on(self.inner.set_run_state(endpoint_id, state))?
    }
}
