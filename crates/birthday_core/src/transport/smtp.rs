//! SMTP transport over STARTTLS.
//!
//! # Responsibility
//! - Build plain-text messages from the engine's address/subject/body.
//! - Deliver through an authenticated relay (default: port 587, STARTTLS).
//!
//! # Invariants
//! - Credentials come from configuration only; nothing is embedded here.
//! - Each `send` is bounded by the configured SMTP timeout.

use super::{MessageTransport, TransportError};
use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{error, info};
use std::time::{Duration, Instant};

/// Authenticated STARTTLS SMTP transport.
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpTransport {
    /// Builds the transport from configuration.
    ///
    /// # Errors
    /// - `InvalidAddress` when `from_address` does not parse.
    /// - `Delivery` when the relay host cannot be configured for TLS.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, TransportError> {
        let from_address = config
            .from_address
            .trim()
            .parse::<Address>()
            .map_err(|err| TransportError::InvalidAddress {
                address: config.from_address.clone(),
                message: err.to_string(),
            })?;
        let from = Mailbox::new(Some(config.from_name.clone()), from_address);

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|err| TransportError::Delivery(err.to_string()))?
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));
        if let Some(password) = config.password.as_deref() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                password.to_string(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }

    fn compose(&self, address: &str, subject: &str, body: &str) -> Result<Message, TransportError> {
        let to = address
            .trim()
            .parse::<Mailbox>()
            .map_err(|err| TransportError::InvalidAddress {
                address: address.to_string(),
                message: err.to_string(),
            })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|err| TransportError::Compose(err.to_string()))
    }
}

#[async_trait]
impl MessageTransport for SmtpTransport {
    fn transport_id(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        let message = self.compose(address, subject, body)?;
        let started_at = Instant::now();

        match self.mailer.send(message).await {
            Ok(response) => {
                info!(
                    "event=transport_send module=transport status=ok transport=smtp address={} code={} duration_ms={}",
                    address,
                    response.code(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=transport_send module=transport status=error transport=smtp address={} duration_ms={} error={}",
                    address,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(TransportError::Delivery(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SmtpTransport;
    use crate::config::SmtpConfig;
    use crate::transport::TransportError;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer@example.com".to_string(),
            password: Some("secret".to_string()),
            from_address: "mailer@example.com".to_string(),
            from_name: "Birthday Manager".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn compose_rejects_malformed_recipient() {
        let transport = SmtpTransport::from_config(&config()).expect("transport builds");
        let err = transport
            .compose("not-an-address", "Happy Birthday!", "body")
            .expect_err("malformed address must be rejected");
        assert!(matches!(err, TransportError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn from_config_rejects_malformed_sender() {
        let mut config = config();
        config.from_address = "broken".to_string();
        let err = SmtpTransport::from_config(&config)
            .err()
            .expect("malformed sender must be rejected");
        assert!(matches!(err, TransportError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn compose_accepts_plain_address() {
        let transport = SmtpTransport::from_config(&config()).expect("transport builds");
        let message = transport
            .compose("friend@example.com", "Happy Birthday!", "Dear friend")
            .expect("message composes");
        let formatted = String::from_utf8(message.formatted()).expect("utf-8 message");
        assert!(formatted.contains("friend@example.com"));
        assert!(formatted.contains("Subject: Happy Birthday!"));
    }
}
