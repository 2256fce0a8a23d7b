use birthday_core::db::open_db_in_memory;
use birthday_core::{
    PersonRecord, PersonRepository, PersonValidationError, RepoError, RosterService, RosterView,
    SentGate, SqliteRosterStore,
};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn add_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let service = RosterService::new(SqliteRosterStore::new(&conn));

    let person = PersonRecord::with_id("1", "Rahim", date(1990, 5, 3), "rahim@example.com")
        .with_phone("01700000000");
    let id = service.add_person(&person).unwrap();
    assert_eq!(id, "1");

    let loaded = service.get_person("1").unwrap().unwrap();
    assert_eq!(loaded, person);
}

#[test]
fn add_ignores_incoming_sent_flag() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRosterStore::new(&conn);

    let mut person = PersonRecord::with_id("1", "Rahim", date(1990, 5, 3), "r@example.com");
    person.notified_today = true;
    store.create_person(&person).unwrap();

    assert!(!store.has_sent("1").unwrap());
}

#[test]
fn duplicate_id_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRosterStore::new(&conn);

    let person = PersonRecord::with_id("1", "Rahim", date(1990, 5, 3), "r@example.com");
    store.create_person(&person).unwrap();
    let err = store.create_person(&person).unwrap_err();
    assert!(matches!(err, RepoError::DuplicateId(id) if id == "1"));
}

#[test]
fn missing_fields_fail_validation() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRosterStore::new(&conn);

    let person = PersonRecord::with_id("1", "Rahim", date(1990, 5, 3), " ");
    let err = store.create_person(&person).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(PersonValidationError::MissingField("contact_address"))
    ));
    assert!(store.list_all().unwrap().is_empty());
}

#[test]
fn update_replaces_fields_but_keeps_sent_flag() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRosterStore::new(&conn);

    let mut person = PersonRecord::with_id("1", "Rahim", date(1990, 5, 3), "r@example.com");
    store.create_person(&person).unwrap();
    store.mark_sent("1").unwrap();

    person.name = "Rahim Uddin".to_string();
    person.birth_date = Some(date(1990, 5, 4));
    person.notified_today = false;
    store.update_person(&person).unwrap();

    let loaded = store.get_person("1").unwrap().unwrap();
    assert_eq!(loaded.name, "Rahim Uddin");
    assert_eq!(loaded.birth_date, Some(date(1990, 5, 4)));
    assert!(loaded.notified_today);
}

#[test]
fn update_and_delete_unknown_id_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = RosterService::new(SqliteRosterStore::new(&conn));

    let ghost = PersonRecord::with_id("404", "Nobody", date(1990, 1, 1), "n@example.com");
    assert!(matches!(
        service.update_person(&ghost).unwrap_err(),
        RepoError::NotFound(id) if id == "404"
    ));
    assert!(matches!(
        service.delete_person("404").unwrap_err(),
        RepoError::NotFound(id) if id == "404"
    ));
}

#[test]
fn delete_removes_person_from_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let service = RosterService::new(SqliteRosterStore::new(&conn));

    for (id, name) in [("1", "Rahim"), ("2", "Karim")] {
        let person = PersonRecord::with_id(id, name, date(1990, 5, 3), "x@example.com");
        service.add_person(&person).unwrap();
    }
    service.delete_person("1").unwrap();

    let ids: Vec<_> = service
        .list_people()
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec!["2"]);
}

#[test]
fn list_preserves_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRosterStore::new(&conn);

    for id in ["b", "a", "c"] {
        let person = PersonRecord::with_id(id, id, date(2000, 1, 1), "x@example.com");
        store.create_person(&person).unwrap();
    }

    let ids: Vec<_> = store.list_all().unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
}

#[test]
fn unparsable_or_missing_birth_date_loads_as_none() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO people (id, name, birth_date, email) VALUES ('1', 'Bad', '03/05/1990', 'b@example.com');
         INSERT INTO people (id, name, birth_date, email) VALUES ('2', 'None', NULL, 'n@example.com');",
    )
    .unwrap();
    let store = SqliteRosterStore::new(&conn);

    let people = store.list_all().unwrap();
    assert_eq!(people.len(), 2);
    assert!(people.iter().all(|p| p.birth_date.is_none()));
}
