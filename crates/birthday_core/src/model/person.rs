//! Person record model.
//!
//! # Responsibility
//! - Define the canonical roster record and its presence validation.
//! - Expose the month/day projection used for year-independent matching.
//!
//! # Invariants
//! - `id` is stable and never reused for another person.
//! - `birth_date` year is stored but never compared.
//! - `notified_today` is set only after a successful dispatch since the
//!   last reset.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a roster entry.
///
/// Opaque string: the roster store accepts user-chosen ids (e.g. "17")
/// as well as generated UUIDs.
pub type PersonId = String;

/// Presence validation errors for person writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonValidationError {
    /// A required field is empty or whitespace only.
    MissingField(&'static str),
    /// Birth date is required on write paths.
    MissingBirthDate,
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is empty"),
            Self::MissingBirthDate => write!(f, "required field `birth_date` is missing"),
        }
    }
}

impl Error for PersonValidationError {}

/// Canonical roster record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: PersonId,
    pub name: String,
    /// `None` when the stored value is absent or unparsable. Such records
    /// never match a reference date.
    pub birth_date: Option<NaiveDate>,
    /// Carried for display; not used by the engine.
    pub phone: String,
    /// Notification destination (e-mail address).
    pub contact_address: String,
    /// Persisted sent-flag for the current day cycle.
    pub notified_today: bool,
}

impl PersonRecord {
    /// Creates a record with a generated UUID identity.
    pub fn new(
        name: impl Into<String>,
        birth_date: NaiveDate,
        contact_address: impl Into<String>,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4().to_string(),
            name,
            birth_date,
            contact_address,
        )
    }

    /// Creates a record with a caller-provided identity.
    ///
    /// `notified_today` always starts `false`; `phone` starts empty.
    pub fn with_id(
        id: impl Into<PersonId>,
        name: impl Into<String>,
        birth_date: NaiveDate,
        contact_address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            birth_date: Some(birth_date),
            phone: String::new(),
            contact_address: contact_address.into(),
            notified_today: false,
        }
    }

    /// Builder-style phone setter.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    /// Validates field presence for roster writes.
    ///
    /// Only presence is checked; address syntax is the transport's concern.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        if self.id.trim().is_empty() {
            return Err(PersonValidationError::MissingField("id"));
        }
        if self.name.trim().is_empty() {
            return Err(PersonValidationError::MissingField("name"));
        }
        if self.birth_date.is_none() {
            return Err(PersonValidationError::MissingBirthDate);
        }
        if self.contact_address.trim().is_empty() {
            return Err(PersonValidationError::MissingField("contact_address"));
        }
        Ok(())
    }

    /// Returns `(month, day)` of the birth date, ignoring the year.
    pub fn birthday(&self) -> Option<(u32, u32)> {
        self.birth_date.map(|date| (date.month(), date.day()))
    }
}
