//! Roster domain model.
//!
//! # Responsibility
//! - Define the person record shared by the roster store, the matcher and
//!   the notification engine.
//!
//! # Invariants
//! - Every person is identified by a stable, caller-visible `PersonId`.
//! - The sent-flag lives on the record; only `SentGate` implementations
//!   write it.

pub mod person;
