//! Dry-run transport that records deliveries in the log only.

use super::{MessageTransport, TransportError};
use async_trait::async_trait;
use log::info;

/// Transport that accepts every message without contacting any server.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl MessageTransport for LogTransport {
    fn transport_id(&self) -> &'static str {
        "log"
    }

    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        if address.trim().is_empty() {
            return Err(TransportError::InvalidAddress {
                address: address.to_string(),
                message: "address is empty".to_string(),
            });
        }

        info!(
            "event=transport_send module=transport status=ok transport=log address={} subject_chars={} body_chars={}",
            address,
            subject.chars().count(),
            body.chars().count()
        );
        Ok(())
    }
}
