//! Core logic for the birthday notifier.
//! This crate is the single source of truth for the at-most-once greeting
//! invariant and the day-boundary reset.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod transport;

pub use config::{AppConfig, ConfigError, ScheduleConfig, SmtpConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::person::{PersonId, PersonRecord, PersonValidationError};
pub use repo::person_repo::{
    PersonRepository, RepoError, RepoResult, RosterView, SqliteRosterStore,
};
pub use repo::sent_gate::{ResetOutcome, SentGate, CLAIM_STALE_AFTER};
pub use service::daily_reset::{run_daily_reset, run_daily_reset_for};
pub use service::engine::{
    CheckReport, DispatchOutcome, EngineError, EngineResult, NotificationEngine,
};
pub use service::greeting::{Greeting, GreetingTemplate};
pub use service::matcher::{is_birthday, match_birthdays};
pub use service::roster_service::RosterService;
pub use transport::{LogTransport, MessageTransport, SmtpTransport, TransportError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
