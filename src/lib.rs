pub mod auth;
pub mod blocking;
pub mod climate;
mod client;
pub mod codec;
mod diff;
mod error;
mod logger;
pub mod protocol;
pub mod session;
mod types;

pub use client::{TydomClient, TydomClientBuilder};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use session::{SessionConfig, SessionState};
pub use types::*;
