//! Birthday notification engine.
//!
//! # Responsibility
//! - Run one "check": snapshot the roster, match today's birthdays, and
//!   dispatch one greeting per person not yet notified this day cycle.
//! - Expose the day-boundary reset next to the check.
//!
//! # Invariants
//! - A person is sent at most one greeting between two resets, also when
//!   several triggers run concurrently against the same store (claim CAS).
//! - One person's transport or gate failure never aborts the batch.
//! - A roster snapshot failure aborts the check before anything is sent.
//! - No store-wide lock is held while a send is awaited.

use crate::model::person::{PersonId, PersonRecord};
use crate::repo::person_repo::{RepoError, RepoResult, RosterView};
use crate::repo::sent_gate::{ResetOutcome, SentGate};
use crate::service::daily_reset::{run_daily_reset, run_daily_reset_for};
use crate::service::greeting::GreetingTemplate;
use crate::service::matcher::match_birthdays;
use crate::transport::{MessageTransport, TransportError};
use chrono::NaiveDate;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub type EngineResult<T> = Result<T, EngineError>;

/// Hard failures of a whole check invocation.
#[derive(Debug)]
pub enum EngineError {
    /// The roster snapshot could not be read; nothing was processed.
    RosterUnavailable(RepoError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RosterUnavailable(err) => write!(f, "roster unavailable: {err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::RosterUnavailable(err) => Some(err),
        }
    }
}

/// Per-person result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Greeting delivered and sent-flag recorded.
    Sent,
    /// Sent-flag was already set this cycle.
    AlreadySent,
    /// Another trigger holds the claim for this person.
    InFlight,
    /// The person was deleted from the roster after the snapshot was taken.
    Removed,
    /// Delivery failed; the person stays eligible for the next trigger.
    TransportFailed(TransportError),
    /// Delivered, but the sent-flag could not be persisted.
    SentButUnrecorded(String),
    /// Sent-flag state could not be read or claimed; nothing was sent.
    GateFailed(String),
    /// The check was cancelled before this person was processed.
    Cancelled,
}

/// Outcome envelope of one check invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub reference_date: NaiveDate,
    /// Every match, in roster order, regardless of dispatch outcome.
    pub matches: Vec<PersonRecord>,
    /// One entry per match, aligned with `matches`.
    pub outcomes: Vec<(PersonId, DispatchOutcome)>,
}

impl CheckReport {
    /// Number of greetings freshly delivered by this check.
    pub fn sent_count(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                DispatchOutcome::Sent | DispatchOutcome::SentButUnrecorded(_)
            )
        })
    }

    /// Number of matches that still need a greeting after this check.
    pub fn pending_count(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                DispatchOutcome::TransportFailed(_)
                    | DispatchOutcome::GateFailed(_)
                    | DispatchOutcome::Cancelled
            )
        })
    }

    /// Returns the outcome recorded for `id`.
    pub fn outcome_for(&self, id: &str) -> Option<&DispatchOutcome> {
        self.outcomes
            .iter()
            .find(|(person_id, _)| person_id == id)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, predicate: impl Fn(&DispatchOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

/// Orchestrates matcher, sent-gate and transport.
pub struct NotificationEngine<S, T> {
    store: S,
    transport: T,
    greeting: GreetingTemplate,
}

impl<S, T> NotificationEngine<S, T>
where
    S: RosterView + SentGate,
    T: MessageTransport,
{
    /// Creates an engine with the default greeting template.
    pub fn new(store: S, transport: T) -> Self {
        Self {
            store,
            transport,
            greeting: GreetingTemplate::default(),
        }
    }

    /// Replaces the greeting template.
    pub fn with_greeting(mut self, greeting: GreetingTemplate) -> Self {
        self.greeting = greeting;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Greets everyone whose birthday is `reference_date` and returns all
    /// matches for display.
    ///
    /// Already-greeted matches are returned too; inspect
    /// `check_and_notify_with_report` to tell fresh sends apart.
    pub async fn check_and_notify(
        &self,
        reference_date: NaiveDate,
    ) -> EngineResult<Vec<PersonRecord>> {
        let report = self
            .check_and_notify_with_report(reference_date, &CancellationToken::new())
            .await?;
        Ok(report.matches)
    }

    /// Runs one check and reports per-person outcomes.
    ///
    /// `cancel` is observed between people; a send already in progress
    /// completes and is recorded normally.
    pub async fn check_and_notify_with_report(
        &self,
        reference_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> EngineResult<CheckReport> {
        let started_at = Instant::now();
        let snapshot = match self.store.list_all() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(
                    "event=birthday_check module=engine status=error day={} error_code=roster_unavailable error={}",
                    reference_date, err
                );
                return Err(EngineError::RosterUnavailable(err));
            }
        };

        let matches = match_birthdays(&snapshot, reference_date);
        let mut outcomes = Vec::with_capacity(matches.len());

        for person in &matches {
            if cancel.is_cancelled() {
                outcomes.push((person.id.clone(), DispatchOutcome::Cancelled));
                continue;
            }
            let outcome = self.dispatch_once(person).await;
            outcomes.push((person.id.clone(), outcome));
        }

        let report = CheckReport {
            reference_date,
            matches,
            outcomes,
        };
        info!(
            "event=birthday_check module=engine status=ok day={} roster={} matches={} sent={} pending={} cancelled={} duration_ms={}",
            reference_date,
            snapshot.len(),
            report.matches.len(),
            report.sent_count(),
            report.pending_count(),
            cancel.is_cancelled(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Clears every sent-flag unconditionally.
    pub fn run_daily_reset(&self) -> RepoResult<usize> {
        run_daily_reset(&self.store)
    }

    /// Clears every sent-flag once for `today`.
    pub fn run_daily_reset_for(&self, today: NaiveDate) -> RepoResult<ResetOutcome> {
        run_daily_reset_for(&self.store, today)
    }

    async fn dispatch_once(&self, person: &PersonRecord) -> DispatchOutcome {
        let id = person.id.as_str();

        match self.store.has_sent(id) {
            Ok(true) => return DispatchOutcome::AlreadySent,
            Ok(false) => {}
            Err(err) => {
                warn!(
                    "event=sent_gate_read module=engine status=error person_id={} error={}",
                    id, err
                );
                return DispatchOutcome::GateFailed(err.to_string());
            }
        }

        match self.store.try_claim(id) {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    "event=sent_gate_claim module=engine status=skip person_id={} reason=claimed_or_sent",
                    id
                );
                return DispatchOutcome::InFlight;
            }
            Err(RepoError::NotFound(_)) => {
                info!(
                    "event=sent_gate_claim module=engine status=skip person_id={} reason=removed",
                    id
                );
                return DispatchOutcome::Removed;
            }
            Err(err) => {
                warn!(
                    "event=sent_gate_claim module=engine status=error person_id={} error={}",
                    id, err
                );
                return DispatchOutcome::GateFailed(err.to_string());
            }
        }

        let greeting = self.greeting.render(&person.name);
        if let Err(err) = self
            .transport
            .send(&person.contact_address, &greeting.subject, &greeting.body)
            .await
        {
            warn!(
                "event=greeting_send module=engine status=error person_id={} transport={} error={}",
                id,
                self.transport.transport_id(),
                err
            );
            if let Err(release_err) = self.store.release_claim(id) {
                warn!(
                    "event=sent_gate_release module=engine status=error person_id={} error={}",
                    id, release_err
                );
            }
            return DispatchOutcome::TransportFailed(err);
        }

        match self.store.mark_sent(id) {
            Ok(()) => {
                info!(
                    "event=greeting_send module=engine status=ok person_id={} transport={}",
                    id,
                    self.transport.transport_id()
                );
                DispatchOutcome::Sent
            }
            Err(err) => {
                // Delivered already; re-sending is not idempotent, so no retry.
                warn!(
                    "event=mark_sent module=engine status=error person_id={} error_code=sent_but_unrecorded error={}",
                    id, err
                );
                DispatchOutcome::SentButUnrecorded(err.to_string())
            }
        }
    }
}
