use md5::{Digest, Md5};
use uuid::Uuid;

use crate::types::Credentials;
use crate::{Error, Result};

pub const MEDIATION_REALM: &str = "ServiceMedia";
const QOP_AUTH: &str = "auth";
const NONCE_COUNT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub nonce: String,
    pub realm: String,
    pub qop: String,
    pub opaque: Option<String>,
    pub nonce_count: u32,
}

impl Challenge {
    /// Parse a `WWW-Authenticate` value. Parameters may come in any order,
    /// quoted or bare.
    pub fn parse(header: &str) -> Result<Self> {
        let params = header
            .trim()
            .strip_prefix("Digest")
            .or_else(|| header.trim().strip_prefix("digest"))
            .unwrap_or(header);

        let mut nonce = None;
        let mut opaque = None;
        for (key, value) in split_params(params)? {
            match key.to_ascii_lowercase().as_str() {
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                _ => {}
            }
        }

        let nonce = nonce
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::AuthChallenge(format!("no nonce in challenge: {header}")))?;

        Ok(Self {
            nonce,
            realm: MEDIATION_REALM.to_string(),
            qop: QOP_AUTH.to_string(),
            opaque,
            nonce_count: NONCE_COUNT,
        })
    }
}

fn split_params(params: &str) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    let mut rest = params.trim();
    while !rest.is_empty() {
        let (key, after_key) = rest
            .split_once('=')
            .ok_or_else(|| Error::AuthChallenge(format!("malformed parameter: {rest}")))?;
        let key = key.trim().trim_start_matches(',').trim();
        let after_key = after_key.trim_start();

        let (value, remainder) = if let Some(quoted) = after_key.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or_else(|| Error::AuthChallenge(format!("unterminated quote in {key}")))?;
            (&quoted[..end], &quoted[end + 1..])
        } else {
            match after_key.find(',') {
                Some(end) => (after_key[..end].trim(), &after_key[end..]),
                None => (after_key.trim(), ""),
            }
        };

        if key.is_empty() {
            return Err(Error::AuthChallenge(format!("empty parameter name before {value}")));
        }
        out.push((key.to_string(), value.to_string()));
        rest = remainder.trim_start().trim_start_matches(',').trim_start();
    }
    Ok(out)
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Compute the `Authorization` value for `method uri` with a caller-chosen
/// client nonce. Pure: same inputs give the same header.
pub fn digest_header(
    challenge: &Challenge,
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    cnonce: &str,
) -> String {
    let ha1 = md5_hex(&format!("{username}:{}:{password}", challenge.realm));
    let ha2 = md5_hex(&format!("{method}:{uri}"));
    let nc = format!("{:08x}", challenge.nonce_count);
    let response = md5_hex(&format!(
        "{ha1}:{}:{nc}:{cnonce}:{}:{ha2}",
        challenge.nonce, challenge.qop
    ));

    let mut header = format!(
        "Digest username=\"{username}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", response=\"{response}\"",
        challenge.realm, challenge.nonce
    );
    if let Some(ref opaque) = challenge.opaque {
        header.push_str(&format!(", opaque=\"{opaque}\""));
    }
    header.push_str(&format!(
        ", qop=\"{}\", nc={nc}, cnonce=\"{cnonce}\"",
        challenge.qop
    ));
    header
}

/// Parse the server challenge and answer it for an implicit `GET` of the
/// mediation resource.
pub fn authorization_header(www_authenticate: &str, credentials: &Credentials) -> Result<String> {
    let challenge = Challenge::parse(www_authenticate)?;
    let cnonce = Uuid::new_v4().simple().to_string()[..16].to_string();
    Ok(digest_header(
        &challenge,
        &credentials.mac,
        &credentials.password,
        "GET",
        &credentials.resource(),
        &cnonce,
    ))
}
