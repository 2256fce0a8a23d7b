//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the roster and sent-gate contracts consumed by services.
//! - Isolate SQLite query details from notification orchestration.
//!
//! # Invariants
//! - Repository writes enforce `PersonRecord::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateId`) in
//!   addition to DB transport errors.

pub mod person_repo;
pub mod sent_gate;
