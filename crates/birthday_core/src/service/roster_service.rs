//! Roster use-case service.
//!
//! # Responsibility
//! - Provide add/update/delete/get/list entry points for front-ends.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - The service never writes sent-flags.

use crate::model::person::{PersonId, PersonRecord};
use crate::repo::person_repo::{PersonRepository, RepoResult};
use log::info;

/// Use-case wrapper for roster CRUD.
pub struct RosterService<R: PersonRepository> {
    repo: R,
}

impl<R: PersonRepository> RosterService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds a person; `notified_today` on the input is ignored.
    pub fn add_person(&self, person: &PersonRecord) -> RepoResult<PersonId> {
        let id = self.repo.create_person(person)?;
        info!("event=roster_add module=service status=ok person_id={id}");
        Ok(id)
    }

    /// Replaces name, birth date, phone and address for an existing id.
    pub fn update_person(&self, person: &PersonRecord) -> RepoResult<()> {
        self.repo.update_person(person)?;
        info!(
            "event=roster_update module=service status=ok person_id={}",
            person.id
        );
        Ok(())
    }

    pub fn delete_person(&self, id: &str) -> RepoResult<()> {
        self.repo.delete_person(id)?;
        info!("event=roster_delete module=service status=ok person_id={id}");
        Ok(())
    }

    pub fn get_person(&self, id: &str) -> RepoResult<Option<PersonRecord>> {
        self.repo.get_person(id)
    }

    /// Lists the roster in insertion order.
    pub fn list_people(&self) -> RepoResult<Vec<PersonRecord>> {
        self.repo.list_all()
    }
}
