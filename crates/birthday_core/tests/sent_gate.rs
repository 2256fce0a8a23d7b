use birthday_core::db::{open_db, open_db_in_memory};
use birthday_core::{
    run_daily_reset, run_daily_reset_for, PersonRecord, PersonRepository, RepoError,
    ResetOutcome, SentGate, SqliteRosterStore, CLAIM_STALE_AFTER,
};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use std::sync::{Arc, Barrier};
use std::thread;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed(conn: &Connection, ids: &[&str]) {
    let store = SqliteRosterStore::new(conn);
    for id in ids {
        let person = PersonRecord::with_id(*id, format!("person {id}"), date(1990, 5, 3), "x@example.com");
        store.create_person(&person).unwrap();
    }
}

#[test]
fn mark_sent_sets_flag_and_unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &["1"]);
    let gate = SqliteRosterStore::new(&conn);

    assert!(!gate.has_sent("1").unwrap());
    gate.mark_sent("1").unwrap();
    assert!(gate.has_sent("1").unwrap());

    assert!(!gate.has_sent("missing").unwrap());
    assert!(matches!(
        gate.mark_sent("missing").unwrap_err(),
        RepoError::NotFound(id) if id == "missing"
    ));
}

#[test]
fn reset_clears_every_record_and_counts_all_rows() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &["1", "2", "3"]);
    let gate = SqliteRosterStore::new(&conn);
    gate.mark_sent("1").unwrap();
    gate.mark_sent("2").unwrap();

    assert_eq!(run_daily_reset(&gate).unwrap(), 3);
    for id in ["1", "2", "3"] {
        assert!(!gate.has_sent(id).unwrap(), "{id} still flagged");
    }
}

#[test]
fn claim_is_exclusive_until_released() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &["1"]);
    let gate = SqliteRosterStore::new(&conn);

    assert!(gate.try_claim("1").unwrap());
    assert!(!gate.try_claim("1").unwrap());
    gate.release_claim("1").unwrap();
    assert!(gate.try_claim("1").unwrap());
}

#[test]
fn claim_fails_once_sent_and_for_unknown_ids() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &["1"]);
    let gate = SqliteRosterStore::new(&conn);

    assert!(gate.try_claim("1").unwrap());
    gate.mark_sent("1").unwrap();
    gate.release_claim("1").unwrap();
    assert!(!gate.try_claim("1").unwrap());
    assert!(matches!(
        gate.try_claim("missing").unwrap_err(),
        RepoError::NotFound(id) if id == "missing"
    ));
}

#[test]
fn stale_claim_can_be_taken_over() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &["1"]);
    let gate = SqliteRosterStore::new(&conn);

    let stale = Utc::now().timestamp_millis() - CLAIM_STALE_AFTER.as_millis() as i64 - 1_000;
    conn.execute("UPDATE people SET claimed_at = ?1 WHERE id = '1';", [stale])
        .unwrap();
    assert!(gate.try_claim("1").unwrap());
}

#[test]
fn reset_drops_outstanding_claims() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &["1"]);
    let gate = SqliteRosterStore::new(&conn);

    assert!(gate.try_claim("1").unwrap());
    gate.reset_all().unwrap();
    assert!(gate.try_claim("1").unwrap());
}

#[test]
fn guarded_reset_runs_once_per_day() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &["1", "2"]);
    let gate = SqliteRosterStore::new(&conn);
    assert_eq!(gate.last_reset_date().unwrap(), None);

    let today = date(2026, 5, 3);
    assert_eq!(
        run_daily_reset_for(&gate, today).unwrap(),
        ResetOutcome::Reset(2)
    );
    assert_eq!(gate.last_reset_date().unwrap(), Some(today));

    gate.mark_sent("1").unwrap();
    assert_eq!(
        run_daily_reset_for(&gate, today).unwrap(),
        ResetOutcome::AlreadyResetToday
    );
    assert!(gate.has_sent("1").unwrap());

    let tomorrow = date(2026, 5, 4);
    assert_eq!(
        run_daily_reset_for(&gate, tomorrow).unwrap(),
        ResetOutcome::Reset(2)
    );
    assert!(!gate.has_sent("1").unwrap());
    assert_eq!(gate.last_reset_date().unwrap(), Some(tomorrow));
}

#[test]
fn forced_reset_does_not_touch_guard_date() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, &["1"]);
    let gate = SqliteRosterStore::new(&conn);

    let today = date(2026, 5, 3);
    run_daily_reset_for(&gate, today).unwrap();
    gate.mark_sent("1").unwrap();

    assert_eq!(run_daily_reset(&gate).unwrap(), 1);
    assert!(!gate.has_sent("1").unwrap());
    assert_eq!(gate.last_reset_date().unwrap(), Some(today));
}

#[test]
fn concurrent_guarded_resets_serialize_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("birthdays.sqlite3");
    seed(&open_db(&path).unwrap(), &["1", "2"]);

    const DAYS: u32 = 60;
    let barrier = Arc::new(Barrier::new(2));
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let gate = SqliteRosterStore::new(&conn);
                let start = date(2026, 1, 1);
                (0..DAYS)
                    .map(|offset| {
                        barrier.wait();
                        gate.reset_all_once_for(start + chrono::Days::new(offset.into()))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let outcomes: Vec<_> = workers
        .into_iter()
        .flat_map(|worker| worker.join().unwrap())
        .map(|outcome| outcome.expect("racing reset waits instead of failing"))
        .collect();

    let resets = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, ResetOutcome::Reset(2)))
        .count();
    let skipped = outcomes
        .iter()
        .filter(|outcome| **outcome == ResetOutcome::AlreadyResetToday)
        .count();
    assert_eq!(resets, DAYS as usize);
    assert_eq!(skipped, DAYS as usize);
}
