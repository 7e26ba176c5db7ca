use crate::{Error, Result};

pub const CONTROL_PREFIX: u8 = 0x02;
pub const CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const TRANSAC_ID: &str = "0";
const MAX_HEADERS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub body: Option<String>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            body: None,
        }
    }

    pub fn put(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: "PUT".to_string(),
            path: path.into(),
            body: Some(body.into()),
        }
    }

    /// Serialize to wire bytes. The frame must be pure ASCII.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = self.body.as_deref().unwrap_or("");
        let mut text = format!(
            "{} {} HTTP/1.1\r\nContent-Length: {}\r\nContent-Type: {CONTENT_TYPE}\r\nTransac-Id: {TRANSAC_ID}\r\n\r\n",
            self.method,
            self.path,
            body.len()
        );
        if self.body.is_some() {
            text.push_str(body);
            text.push_str("\r\n\r\n");
        }
        if !text.is_ascii() {
            return Err(Error::InvalidCommand(format!(
                "non-ASCII content in {} {}",
                self.method, self.path
            )));
        }

        let mut out = Vec::with_capacity(text.len() + 1);
        out.push(CONTROL_PREFIX);
        out.extend_from_slice(text.as_bytes());
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Decode one inbound frame into a response.
pub fn decode_response(frame: &[u8]) -> Result<Response> {
    let data = match frame.split_first() {
        Some((&CONTROL_PREFIX, rest)) => rest,
        Some((b, _)) => {
            return Err(Error::ProtocolDecode(format!(
                "expected control byte 0x02, got 0x{b:02x}"
            )));
        }
        None => return Err(Error::ProtocolDecode("empty frame".to_string())),
    };

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut resp = httparse::Response::new(&mut headers);
    let head_len = match resp.parse(data) {
        Ok(httparse::Status::Complete(n)) => n,
        Ok(httparse::Status::Partial) => {
            return Err(Error::ProtocolDecode("truncated response head".to_string()));
        }
        Err(e) => return Err(Error::ProtocolDecode(format!("malformed response head: {e}"))),
    };

    let status = resp
        .code
        .ok_or_else(|| Error::ProtocolDecode("missing status code".to_string()))?;
    let reason = resp.reason.unwrap_or("").to_string();
    let headers: Vec<(String, String)> = resp
        .headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).trim().to_string(),
            )
        })
        .collect();

    let raw_body = &data[head_len..];
    let chunked = headers.iter().any(|(k, v)| {
        k.eq_ignore_ascii_case("Transfer-Encoding") && v.to_ascii_lowercase().contains("chunked")
    });
    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        .map(|(_, v)| {
            v.parse::<usize>()
                .map_err(|_| Error::ProtocolDecode(format!("bad Content-Length: {v}")))
        })
        .transpose()?;

    let body = if chunked {
        dechunk(raw_body)?
    } else if let Some(len) = content_length {
        if raw_body.len() < len {
            return Err(Error::ProtocolDecode(format!(
                "truncated body: {} of {len} bytes",
                raw_body.len()
            )));
        }
        raw_body[..len].to_vec()
    } else {
        raw_body.to_vec()
    };

    let body = String::from_utf8(body)
        .map_err(|e| Error::ProtocolDecode(format!("body is not UTF-8: {e}")))?;

    Ok(Response {
        status,
        reason,
        headers,
        body,
    })
}

fn dechunk(mut data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let line_end = find_crlf(data)
            .ok_or_else(|| Error::ProtocolDecode("truncated chunk size".to_string()))?;
        let size_line = std::str::from_utf8(&data[..line_end])
            .map_err(|_| Error::ProtocolDecode("chunk size is not ASCII".to_string()))?;
        let size_hex = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| Error::ProtocolDecode(format!("bad chunk size: {size_hex:?}")))?;
        data = &data[line_end + 2..];

        if size == 0 {
            return Ok(out);
        }
        let end = size
            .checked_add(2)
            .ok_or_else(|| Error::ProtocolDecode(format!("bad chunk size: {size_hex:?}")))?;
        if data.len() < end {
            return Err(Error::ProtocolDecode("truncated chunk".to_string()));
        }
        out.extend_from_slice(&data[..size]);
        if &data[size..end] != b"\r\n" {
            return Err(Error::ProtocolDecode("chunk not terminated by CRLF".to_string()));
        }
        data = &data[end..];
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}
