use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    AuthChallenge(String),
    Connect(String),
    ConnectionClosed,
    ProtocolDecode(String),
    UnexpectedResponse(String),
    InvalidCommand(String),
    InvalidTemperature { value: f64, min: f64, max: f64 },
    NoEndpoint,
    Io(std::io::Error),
}

impl Error {
    /// The server's challenge could not be turned into credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::AuthChallenge(_))
    }

    /// The mediation host could not be reached or refused the upgrade.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Connect(_) | Error::ConnectionClosed | Error::Http(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::AuthChallenge(msg) => write!(f, "authentication challenge error: {msg}"),
            Error::Connect(msg) => write!(f, "connect error: {msg}"),
            Error::ConnectionClosed => write!(f, "connection closed before response"),
            Error::ProtocolDecode(msg) => write!(f, "protocol decode error: {msg}"),
            Error::UnexpectedResponse(msg) => write!(f, "unexpected response: {msg}"),
            Error::InvalidCommand(msg) => write!(f, "invalid command: {msg}"),
            Error::InvalidTemperature { value, min, max } => {
                write!(f, "temperature {value} outside {min}..={max}")
            }
            Error::NoEndpoint => write!(f, "no endpoint known (fetch a snapshot first)"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
