use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{SinkExt, StreamExt};
use reqwest::header::WWW_AUTHENTICATE;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::Request as UpgradeRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};

use crate::auth;
use crate::codec::{self, CONTENT_TYPE, Request, Response};
use crate::types::Credentials;
use crate::{Error, Result};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Challenging,
    Authenticated,
    Connected,
    Sent,
    AwaitingResponse,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// `https`/`wss` when set, `http`/`ws` otherwise.
    pub tls: bool,
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tls: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl SessionConfig {
    fn http_scheme(&self) -> &'static str {
        if self.tls { "https" } else { "http" }
    }

    fn ws_scheme(&self) -> &'static str {
        if self.tls { "wss" } else { "ws" }
    }

    fn default_port(&self) -> u16 {
        if self.tls { 443 } else { 80 }
    }

    /// `host:port`, adding the scheme's default port when the host has none.
    fn authority(&self, host: &str) -> String {
        if host.contains(':') {
            host.to_string()
        } else {
            format!("{host}:{}", self.default_port())
        }
    }
}

/// A fresh random `Sec-WebSocket-Key`: base64 of 16 random bytes.
pub fn websocket_key() -> String {
    BASE64.encode(rand::random::<[u8; 16]>())
}

/// One authenticated request/response exchange. The digest challenge is
/// harvested over HTTP(S), answered on a websocket upgrade of the same
/// resource, then exactly one frame goes out and one comes back.
pub struct Session<'a> {
    http: &'a reqwest::Client,
    config: &'a SessionConfig,
    credentials: &'a Credentials,
    state: SessionState,
}

impl<'a> Session<'a> {
    pub fn new(
        http: &'a reqwest::Client,
        config: &'a SessionConfig,
        credentials: &'a Credentials,
    ) -> Self {
        Self {
            http,
            config,
            credentials,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the whole session for one request. Consumes the session: a new
    /// operation always authenticates from scratch.
    pub async fn exchange(mut self, request: &Request) -> Result<Response> {
        match self.run(request).await {
            Ok(response) => {
                self.transition(SessionState::Done);
                Ok(response)
            }
            Err(e) => {
                warn!(state = ?self.state, error = %e, path = %request.path, "session failed");
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    async fn run(&mut self, request: &Request) -> Result<Response> {
        let frame = request.encode()?;

        self.transition(SessionState::Challenging);
        let challenge = self.harvest_challenge().await?;
        let authorization = auth::authorization_header(&challenge, self.credentials)?;
        self.transition(SessionState::Authenticated);

        let mut socket = self.open_socket(&authorization).await?;
        self.transition(SessionState::Connected);

        let result = self.send_and_receive(&mut socket, frame).await;
        if let Err(e) = socket.close(None).await {
            trace!("close after exchange: {e}");
        }
        codec::decode_response(&result?)
    }

    async fn send_and_receive(&mut self, socket: &mut Socket, frame: Vec<u8>) -> Result<Vec<u8>> {
        socket
            .send(Message::Binary(frame))
            .await
            .map_err(|e| Error::Connect(format!("send failed: {e}")))?;
        self.transition(SessionState::Sent);
        self.transition(SessionState::AwaitingResponse);
        next_frame(socket).await
    }

    async fn harvest_challenge(&self) -> Result<String> {
        let url = format!(
            "{}://{}{}",
            self.config.http_scheme(),
            self.credentials.host,
            self.credentials.resource()
        );
        debug!(url = %url, "requesting digest challenge");

        let pending = self
            .http
            .get(&url)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Accept", "*/*")
            .header("Sec-WebSocket-Key", websocket_key())
            .header("Sec-WebSocket-Version", "13")
            .header("Content-Type", "application/json")
            .header("Transac-Id", "0")
            .send();

        let timeout = self.config.connect_timeout;
        let resp = match tokio::time::timeout(timeout, pending).await {
            Err(_) => {
                return Err(Error::Connect(format!(
                    "challenge request to {url} timed out after {timeout:?}"
                )));
            }
            Ok(result) => result
                .map_err(|e| Error::Connect(format!("challenge request to {url} failed: {e}")))?,
        };

        let status = resp.status();
        let header = resp
            .headers()
            .get(WWW_AUTHENTICATE)
            .ok_or_else(|| {
                Error::AuthChallenge(format!("no WWW-Authenticate header (status {status})"))
            })?
            .to_str()
            .map_err(|_| Error::AuthChallenge("WWW-Authenticate is not ASCII".to_string()))?;
        trace!(status = %status, "challenge received");
        Ok(header.to_string())
    }

    async fn open_socket(&self, authorization: &str) -> Result<Socket> {
        let authority = self.config.authority(&self.credentials.host);
        let url = format!(
            "{}://{authority}{}",
            self.config.ws_scheme(),
            self.credentials.resource()
        );
        debug!(url = %url, "opening mediation socket");

        let request = UpgradeRequest::builder()
            .method("GET")
            .uri(&url)
            .header("Host", &authority)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Accept", "*/*")
            .header("Sec-WebSocket-Key", websocket_key())
            .header("Sec-WebSocket-Version", "13")
            .header("Content-Type", CONTENT_TYPE)
            .header("Transac-Id", "0")
            .header("Authorization", authorization)
            .body(())
            .map_err(|e| Error::Connect(format!("invalid upgrade request: {e}")))?;

        let timeout = self.config.connect_timeout;
        let (socket, response) = match tokio::time::timeout(timeout, connect_async(request)).await {
            Err(_) => {
                return Err(Error::Connect(format!("upgrade timed out after {timeout:?}")));
            }
            Ok(Err(tungstenite::Error::Http(resp))) => {
                return Err(Error::Connect(format!("upgrade refused: {}", resp.status())));
            }
            Ok(Err(e)) => return Err(Error::Connect(format!("upgrade failed: {e}"))),
            Ok(Ok(pair)) => pair,
        };
        trace!(status = %response.status(), "socket upgraded");
        Ok(socket)
    }
}

/// Wait for the single response frame, skipping control messages.
async fn next_frame(socket: &mut Socket) -> Result<Vec<u8>> {
    while let Some(msg) = socket.next().await {
        match msg.map_err(|e| Error::Connect(format!("receive failed: {e}")))? {
            Message::Binary(data) => return Ok(data),
            Message::Text(text) => return Ok(text.into_bytes()),
            Message::Close(frame) => {
                debug!(reason = ?frame.map(|f| f.reason.to_string()), "server closed socket");
                return Err(Error::ConnectionClosed);
            }
            other => trace!(kind = ?other, "skipping control message"),
        }
    }
    Err(Error::ConnectionClosed)
}
