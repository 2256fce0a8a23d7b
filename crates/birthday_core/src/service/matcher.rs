//! Year-independent birthday matching.
//!
//! # Invariants
//! - Only `(month, day)` is compared; the birth year never participates.
//! - Output preserves roster order.
//! - Feb 29 is compared literally: such birthdays match only in leap years.

use crate::model::person::PersonRecord;
use chrono::{Datelike, NaiveDate};

/// Returns the records whose birthday falls on `reference`'s month/day.
///
/// Records without a birth date are skipped.
pub fn match_birthdays(records: &[PersonRecord], reference: NaiveDate) -> Vec<PersonRecord> {
    records
        .iter()
        .filter(|person| is_birthday(person, reference))
        .cloned()
        .collect()
}

/// Returns whether `person` has a birthday on `reference`.
pub fn is_birthday(person: &PersonRecord, reference: NaiveDate) -> bool {
    person.birthday() == Some((reference.month(), reference.day()))
}

#[cfg(test)]
mod tests {
    use super::{is_birthday, match_birthdays};
    use crate::model::person::PersonRecord;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn person(id: &str, birth: NaiveDate) -> PersonRecord {
        PersonRecord::with_id(id, format!("person {id}"), birth, format!("{id}@example.com"))
    }

    #[test]
    fn matches_month_and_day_across_years_in_roster_order() {
        let roster = vec![
            person("1", date(1990, 5, 3)),
            person("3", date(2000, 6, 1)),
            person("2", date(1985, 5, 3)),
        ];
        let ids: Vec<_> = match_birthdays(&roster, date(2026, 5, 3))
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn same_day_other_month_does_not_match() {
        assert!(!is_birthday(&person("1", date(1990, 4, 3)), date(2026, 5, 3)));
    }

    #[test]
    fn undated_records_are_excluded() {
        let mut undated = person("1", date(1990, 5, 3));
        undated.birth_date = None;
        assert!(match_birthdays(&[undated], date(2026, 5, 3)).is_empty());
    }

    #[test]
    fn leap_day_birthday_only_matches_on_leap_years() {
        let leapling = person("29", date(2000, 2, 29));
        assert!(!is_birthday(&leapling, date(2026, 2, 28)));
        assert!(!is_birthday(&leapling, date(2026, 3, 1)));
        assert!(is_birthday(&leapling, date(2028, 2, 29)));
    }
}
