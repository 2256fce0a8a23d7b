//! Roster repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `people` rows for the roster front-end.
//! - Provide the read-only `RosterView` snapshot consumed by the engine.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `PersonRecord::validate()` before SQL mutations.
//! - CRUD writes never touch `notified_today` except to initialise it.
//! - A stored birth date that cannot be parsed loads as `None` instead of
//!   failing the whole snapshot.

use crate::db::DbError;
use crate::model::person::{PersonId, PersonRecord, PersonValidationError};
use chrono::NaiveDate;
use log::warn;
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub(crate) const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

const PERSON_SELECT_SQL: &str = "SELECT
    id,
    name,
    birth_date,
    phone,
    email,
    notified_today
FROM people";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for roster persistence and sent-flag operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(PersonValidationError),
    Db(DbError),
    NotFound(PersonId),
    DuplicateId(PersonId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::DuplicateId(id) => write!(f, "person id already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::DuplicateId(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<PersonValidationError> for RepoError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read-only roster access used by the notification engine.
pub trait RosterView {
    /// Returns every person in stable roster order.
    fn list_all(&self) -> RepoResult<Vec<PersonRecord>>;
}

/// CRUD contract for the roster store.
pub trait PersonRepository: RosterView {
    fn create_person(&self, person: &PersonRecord) -> RepoResult<PersonId>;
    /// Replaces identity-independent fields; leaves the sent-flag alone.
    fn update_person(&self, person: &PersonRecord) -> RepoResult<()>;
    fn get_person(&self, id: &str) -> RepoResult<Option<PersonRecord>>;
    fn delete_person(&self, id: &str) -> RepoResult<()>;
}

/// SQLite-backed roster store.
///
/// Implements `PersonRepository`, `RosterView` and (in `sent_gate`)
/// `SentGate` over one borrowed connection.
pub struct SqliteRosterStore<'conn> {
    pub(crate) conn: &'conn Connection,
}

impl<'conn> SqliteRosterStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RosterView for SqliteRosterStore<'_> {
    fn list_all(&self) -> RepoResult<Vec<PersonRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut people = Vec::new();

        while let Some(row) = rows.next()? {
            people.push(parse_person_row(row)?);
        }

        Ok(people)
    }
}

impl PersonRepository for SqliteRosterStore<'_> {
    fn create_person(&self, person: &PersonRecord) -> RepoResult<PersonId> {
        person.validate()?;

        let result = self.conn.execute(
            "INSERT INTO people (
                id,
                name,
                birth_date,
                phone,
                email,
                notified_today
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0);",
            params![
                person.id.as_str(),
                person.name.as_str(),
                person.birth_date.map(format_birth_date),
                person.phone.as_str(),
                person.contact_address.as_str(),
            ],
        );

        match result {
            Ok(_) => Ok(person.id.clone()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(RepoError::DuplicateId(person.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_person(&self, person: &PersonRecord) -> RepoResult<()> {
        person.validate()?;

        let changed = self.conn.execute(
            "UPDATE people
             SET
                name = ?1,
                birth_date = ?2,
                phone = ?3,
                email = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?5;",
            params![
                person.name.as_str(),
                person.birth_date.map(format_birth_date),
                person.phone.as_str(),
                person.contact_address.as_str(),
                person.id.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(person.id.clone()));
        }

        Ok(())
    }

    fn get_person(&self, id: &str) -> RepoResult<Option<PersonRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(row)?));
        }

        Ok(None)
    }

    fn delete_person(&self, id: &str) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM people WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }

        Ok(())
    }
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<PersonRecord> {
    let id: String = row.get("id")?;

    let birth_date = match row.get::<_, Option<String>>("birth_date")? {
        Some(text) => match NaiveDate::parse_from_str(text.trim(), BIRTH_DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(err) => {
                warn!(
                    "event=roster_read module=repo status=skip person_id={} reason=invalid_birth_date error={}",
                    id, err
                );
                None
            }
        },
        None => None,
    };

    let notified_today = match row.get::<_, i64>("notified_today")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid notified_today value `{other}` in people.notified_today"
            )));
        }
    };

    Ok(PersonRecord {
        id,
        name: row.get("name")?,
        birth_date,
        phone: row.get("phone")?,
        contact_address: row.get("email")?,
        notified_today,
    })
}

pub(crate) fn format_birth_date(date: NaiveDate) -> String {
    date.format(BIRTH_DATE_FORMAT).to_string()
}
