#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::Response as HttpResponse;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, accept_hdr_async};

pub const MAC: &str = "001A25FFFFFF";
pub const PASSWORD: &str = "hunter2";
pub const CHALLENGE: &str =
    r#"Digest realm="ServiceMedia", qop="auth", nonce="b3f1c9e2a4d7", opaque="ab12""#;

/// What the fake mediation server does once a client presents credentials.
#[derive(Clone)]
pub enum Behavior {
    Reply(Vec<u8>),
    /// Accept TCP but never answer the upgrade.
    Stall,
    RefuseUpgrade,
    /// 401 without `WWW-Authenticate`.
    NoChallenge,
    CloseWithoutReply,
}

#[derive(Clone, Default)]
pub struct Recorded {
    pub challenges: Arc<AtomicUsize>,
    pub authorizations: Arc<Mutex<Vec<String>>>,
    pub frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Recorded {
    pub fn challenge_count(&self) -> usize {
        self.challenges.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }

    pub fn authorizations(&self) -> Vec<String> {
        self.authorizations.lock().unwrap().clone()
    }
}

pub struct MockMediation {
    pub addr: SocketAddr,
    pub recorded: Recorded,
}

impl MockMediation {
    pub fn host(&self) -> String {
        format!("{}:{}", self.addr.ip(), self.addr.port())
    }
}

/// Build a response frame the way the mediation server sends it.
pub fn reply_frame(status_line: &str, body: &str) -> Vec<u8> {
    let mut out = vec![0x02];
    out.extend_from_slice(
        format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .as_bytes(),
    );
    out
}

pub fn chunked_reply_frame(body: &str) -> Vec<u8> {
    let (a, b) = body.split_at(body.len() / 2);
    let mut out = vec![0x02];
    out.extend_from_slice(
        format!(
            "HTTP/1.1 200 OK\r\nServer: Tydom-001A25\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n{a}\r\n{:x}\r\n{b}\r\n0\r\n\r\n",
            a.len(),
            b.len()
        )
        .as_bytes(),
    );
    out
}

/// Extract a parameter from a digest `Authorization` header.
pub fn digest_param(header: &str, name: &str) -> Option<String> {
    header
        .trim_start_matches("Digest ")
        .split(", ")
        .find_map(|kv| kv.strip_prefix(&format!("{name}=")))
        .map(|v| v.trim_matches('"').to_string())
}

/// Accept TCP connections and hold them open without ever answering.
pub async fn start_silent() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

pub fn start_silent_on_thread() -> SocketAddr {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            tx.send(start_silent().await).unwrap();
            std::future::pending::<()>().await;
        });
    });
    rx.recv().unwrap()
}

pub async fn start(behavior: Behavior) -> MockMediation {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Recorded::default();

    let server_recorded = recorded.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handle(stream, behavior.clone(), server_recorded.clone()));
        }
    });

    MockMediation { addr, recorded }
}

/// Run the mock on its own thread and runtime, for blocking clients.
pub fn start_on_thread(behavior: Behavior) -> MockMediation {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            tx.send(start(behavior).await).unwrap();
            std::future::pending::<()>().await;
        });
    });
    rx.recv().unwrap()
}

async fn peek_head(stream: &TcpStream) -> Option<String> {
    let mut buf = vec![0u8; 8192];
    for _ in 0..400 {
        let n = stream.peek(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        if let Some(pos) = buf[..n].windows(4).position(|w| w == b"\r\n\r\n") {
            return Some(String::from_utf8_lossy(&buf[..pos + 4]).into_owned());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    None
}

async fn handle(mut stream: TcpStream, behavior: Behavior, recorded: Recorded) {
    let Some(head) = peek_head(&stream).await else {
        return;
    };
    let authorization = head
        .lines()
        .find(|l| l.to_ascii_lowercase().starts_with("authorization:"))
        .map(|l| l["authorization:".len()..].trim().to_string());

    let Some(authorization) = authorization else {
        let mut consumed = vec![0u8; head.len()];
        if stream.read_exact(&mut consumed).await.is_err() {
            return;
        }
        recorded.challenges.fetch_add(1, Ordering::SeqCst);
        let reply = match behavior {
            Behavior::NoChallenge => {
                "HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    .to_string()
            }
            _ => format!(
                "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: {CHALLENGE}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            ),
        };
        let _ = stream.write_all(reply.as_bytes()).await;
        let _ = stream.shutdown().await;
        return;
    };
    recorded.authorizations.lock().unwrap().push(authorization);

    match behavior {
        Behavior::Stall => {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Behavior::RefuseUpgrade => {
            let refuse = |_req: &Request, _resp: Response| -> Result<Response, ErrorResponse> {
                Err(HttpResponse::builder().status(403).body(None).unwrap())
            };
            let _ = accept_hdr_async(stream, refuse).await;
        }
        Behavior::Reply(_) | Behavior::CloseWithoutReply | Behavior::NoChallenge => {
            let Ok(mut ws) = accept_async(stream).await else {
                return;
            };
            if let Some(Ok(msg)) = ws.next().await {
                recorded.frames.lock().unwrap().push(msg.into_data());
            }
            match behavior {
                Behavior::Reply(bytes) => {
                    let _ = ws.send(Message::Binary(bytes)).await;
                }
                _ => {
                    let _ = ws.close(None).await;
                }
            }
            while let Some(Ok(_)) = ws.next().await {}
        }
    }
}
