//! Sent-flag idempotency gate.
//!
//! # Responsibility
//! - Answer "was this person already notified in the current day cycle?".
//! - Record successful dispatches and clear all flags at the day boundary.
//! - Serialise concurrent triggers per person with a claim compare-and-set.
//!
//! # Invariants
//! - No component outside `SentGate` implementations writes
//!   `notified_today` or `claimed_at`.
//! - `try_claim` succeeds for at most one caller per person until the claim
//!   is released, converted by `mark_sent`, goes stale, or is reset.
//! - `reset_all` clears every row, matched or not.

use super::person_repo::{
    format_birth_date, RepoError, RepoResult, SqliteRosterStore, BIRTH_DATE_FORMAT,
};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};
use std::time::Duration;

/// Claims older than this are treated as abandoned (crashed sender).
pub const CLAIM_STALE_AFTER: Duration = Duration::from_secs(10 * 60);

/// Result of the day-guarded reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Flags were cleared for this many records.
    Reset(usize),
    /// A reset was already recorded for the requested day; nothing changed.
    AlreadyResetToday,
}

/// Per-person, per-day idempotency state.
pub trait SentGate {
    /// Returns whether the person's sent-flag is set. Unknown ids are `false`.
    fn has_sent(&self, id: &str) -> RepoResult<bool>;

    /// Sets the sent-flag and drops any claim.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when the id does not exist.
    fn mark_sent(&self, id: &str) -> RepoResult<()>;

    /// Atomically claims the person for one dispatch attempt.
    ///
    /// Returns `false` when the flag is already set or another fresh claim
    /// is held.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when the id does not exist (removed mid-check).
    fn try_claim(&self, id: &str) -> RepoResult<bool>;

    /// Drops a claim after a failed dispatch so a later trigger can retry.
    fn release_claim(&self, id: &str) -> RepoResult<()>;

    /// Clears flags and claims for every record; returns the count touched.
    fn reset_all(&self) -> RepoResult<usize>;

    /// Clears all flags unless a reset was already recorded for `day`.
    fn reset_all_once_for(&self, day: NaiveDate) -> RepoResult<ResetOutcome>;

    /// Returns the day of the last recorded guarded reset.
    fn last_reset_date(&self) -> RepoResult<Option<NaiveDate>>;
}

impl SentGate for SqliteRosterStore<'_> {
    fn has_sent(&self, id: &str) -> RepoResult<bool> {
        let flag = self
            .conn
            .query_row(
                "SELECT notified_today FROM people WHERE id = ?1;",
                [id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        Ok(flag == Some(1))
    }

    fn mark_sent(&self, id: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE people SET notified_today = 1, claimed_at = NULL WHERE id = ?1;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn try_claim(&self, id: &str) -> RepoResult<bool> {
        let now_ms = Utc::now().timestamp_millis();
        let stale_before = now_ms - CLAIM_STALE_AFTER.as_millis() as i64;
        let changed = self.conn.execute(
            "UPDATE people
             SET claimed_at = ?1
             WHERE id = ?2
               AND notified_today = 0
               AND (claimed_at IS NULL OR claimed_at < ?3);",
            params![now_ms, id, stale_before],
        )?;
        if changed == 1 {
            return Ok(true);
        }

        let exists = self
            .conn
            .query_row("SELECT 1 FROM people WHERE id = ?1;", [id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(false)
    }

    fn release_claim(&self, id: &str) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE people SET claimed_at = NULL WHERE id = ?1 AND notified_today = 0;",
            [id],
        )?;
        Ok(())
    }

    fn reset_all(&self) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("UPDATE people SET notified_today = 0, claimed_at = NULL;", [])?;
        Ok(changed)
    }

    fn reset_all_once_for(&self, day: NaiveDate) -> RepoResult<ResetOutcome> {
        let day_text = format_birth_date(day);
        // IMMEDIATE takes the write lock up front so a racing reset waits on
        // the busy timeout instead of failing the read-to-write upgrade.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let last: Option<String> = tx
            .query_row(
                "SELECT last_reset_date FROM reset_state WHERE singleton = 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if last.as_deref() == Some(day_text.as_str()) {
            return Ok(ResetOutcome::AlreadyResetToday);
        }

        let count = tx.execute("UPDATE people SET notified_today = 0, claimed_at = NULL;", [])?;
        tx.execute(
            "INSERT INTO reset_state (singleton, last_reset_date, last_reset_count, reset_at)
             VALUES (1, ?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(singleton) DO UPDATE SET
                last_reset_date = excluded.last_reset_date,
                last_reset_count = excluded.last_reset_count,
                reset_at = excluded.reset_at;",
            params![day_text, count as i64],
        )?;
        tx.commit()?;

        Ok(ResetOutcome::Reset(count))
    }

    fn last_reset_date(&self) -> RepoResult<Option<NaiveDate>> {
        let last: Option<String> = self
            .conn
            .query_row(
                "SELECT last_reset_date FROM reset_state WHERE singleton = 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;

        last.map(|text| {
            NaiveDate::parse_from_str(&text, BIRTH_DATE_FORMAT).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid last_reset_date `{text}` in reset_state.last_reset_date"
                ))
            })
        })
        .transpose()
    }
}

