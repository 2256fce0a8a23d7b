//! Outbound message transports.
//!
//! # Responsibility
//! - Define the asynchronous `MessageTransport` capability the engine
//!   dispatches through.
//! - Ship the SMTP transport and a log-only dry-run transport.
//!
//! # Invariants
//! - `send` resolves to `Ok(())` only when the transport accepted the
//!   message; anything else is a failure the engine may retry later.
//! - Transports own their own timeouts.

use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod log_only;
pub mod smtp;

pub use log_only::LogTransport;
pub use smtp::SmtpTransport;

/// Transport-level delivery errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Recipient or sender address could not be parsed.
    InvalidAddress { address: String, message: String },
    /// The message could not be assembled.
    Compose(String),
    /// The remote side rejected or never acknowledged the message.
    Delivery(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAddress { address, message } => {
                write!(f, "invalid address `{address}`: {message}")
            }
            Self::Compose(message) => write!(f, "failed to compose message: {message}"),
            Self::Delivery(message) => write!(f, "delivery failed: {message}"),
        }
    }
}

impl Error for TransportError {}

/// Fire-and-forget delivery capability.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Stable transport identifier used in log events (e.g. `smtp`).
    fn transport_id(&self) -> &'static str;

    /// Delivers one message to `address`.
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: MessageTransport + ?Sized> MessageTransport for Box<T> {
    fn transport_id(&self) -> &'static str {
        (**self).transport_id()
    }

    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        (**self).send(address, subject, body).await
    }
}
