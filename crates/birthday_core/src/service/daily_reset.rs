//! Day-boundary reset of sent-flags.
//!
//! # Responsibility
//! - Re-arm every roster entry for the next day's occurrences.
//!
//! # Invariants
//! - `run_daily_reset` is unconditional and clears every record.
//! - `run_daily_reset_for` clears at most once per calendar day; a second
//!   call for the same day leaves already-notified flags in place.

use crate::repo::person_repo::RepoResult;
use crate::repo::sent_gate::{ResetOutcome, SentGate};
use chrono::NaiveDate;
use log::{error, info};

/// Clears `notified_today` for every record and returns the count touched.
///
/// Calling this more than once per day re-arms people who were already
/// greeted; schedulers should prefer `run_daily_reset_for`.
pub fn run_daily_reset<G: SentGate + ?Sized>(gate: &G) -> RepoResult<usize> {
    match gate.reset_all() {
        Ok(count) => {
            info!("event=daily_reset module=service status=ok mode=force count={count}");
            Ok(count)
        }
        Err(err) => {
            error!("event=daily_reset module=service status=error mode=force error={err}");
            Err(err)
        }
    }
}

/// Clears all flags unless a reset was already recorded for `today`.
pub fn run_daily_reset_for<G: SentGate + ?Sized>(
    gate: &G,
    today: NaiveDate,
) -> RepoResult<ResetOutcome> {
    match gate.reset_all_once_for(today) {
        Ok(ResetOutcome::Reset(count)) => {
            info!(
                "event=daily_reset module=service status=ok mode=guarded day={today} count={count}"
            );
            Ok(ResetOutcome::Reset(count))
        }
        Ok(ResetOutcome::AlreadyResetToday) => {
            info!("event=daily_reset module=service status=skip mode=guarded day={today} reason=already_reset");
            Ok(ResetOutcome::AlreadyResetToday)
        }
        Err(err) => {
            error!(
                "event=daily_reset module=service status=error mode=guarded day={today} error={err}"
            );
            Err(err)
        }
    }
}
