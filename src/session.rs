// Session keys, packed records and the grid-to-record packer.
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cells::{Cell, coerce_reps, coerce_weight};
use crate::grid::SessionGrid;
use crate::plan::Split;

/// Which set of key fields identifies a session.
///
/// The legacy tables disagree on this; one engine serves all three layouts
/// by carrying the schema as data instead of hardcoding a column list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum KeySchema {
    /// `date, phase, split, day`; the person selects the table itself.
    DatePhase,
    /// `person, week, split, day`; one shared table, person is a column.
    PersonWeek,
    /// `week, split, day`; the person selects the table itself.
    Week,
}

impl KeySchema {
    /// Key column names, in table order.
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            KeySchema::DatePhase => &["date", "phase", "split", "day"],
            KeySchema::PersonWeek => &["person", "week", "split", "day"],
            KeySchema::Week => &["week", "split", "day"],
        }
    }
}

/// Session-identifying fields, one variant per [`KeySchema`].
///
/// Together with the exercise name this is the composite key that makes a
/// history record unique; derived `Eq`/`Hash` carry that contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKey {
    DatePhase {
        date: NaiveDate,
        phase: u8,
        split: Split,
        day: u8,
    },
    PersonWeek {
        person: String,
        week: u32,
        split: Split,
        day: u8,
    },
    Week {
        week: u32,
        split: Split,
        day: u8,
    },
}

/// How recent a session is, for picking the latest one per selection.
/// Comparable only within one schema; a log never mixes schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Recency {
    Week(u32),
    Date(NaiveDate),
}

impl SessionKey {
    pub fn schema(&self) -> KeySchema {
        match self {
            SessionKey::DatePhase { .. } => KeySchema::DatePhase,
            SessionKey::PersonWeek { .. } => KeySchema::PersonWeek,
            SessionKey::Week { .. } => KeySchema::Week,
        }
    }

    pub fn split(&self) -> Split {
        match self {
            SessionKey::DatePhase { split, .. }
            | SessionKey::PersonWeek { split, .. }
            | SessionKey::Week { split, .. } => *split,
        }
    }

    pub fn day(&self) -> u8 {
        match self {
            SessionKey::DatePhase { day, .. }
            | SessionKey::PersonWeek { day, .. }
            | SessionKey::Week { day, .. } => *day,
        }
    }

    pub fn recency(&self) -> Recency {
        match self {
            SessionKey::DatePhase { date, .. } => Recency::Date(*date),
            SessionKey::PersonWeek { week, .. } | SessionKey::Week { week, .. } => {
                Recency::Week(*week)
            }
        }
    }
}

/// One packed exercise entry of a saved session.
///
/// `weights` and `reps` always hold exactly the session's set-count ceiling
/// worth of slots; unset slots are `Cell::Empty`, never omitted. Records are
/// immutable once packed; a re-save supersedes the old record during merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub key: SessionKey,
    pub exercise: String,
    pub weights: Vec<Cell>,
    pub reps: Vec<Cell>,
}

/// Pack an edited grid into session records.
///
/// Rows without an exercise name were skipped by the user and are dropped;
/// the remaining rows coerce cell by cell into fixed-length set sequences.
pub fn pack_session(grid: &SessionGrid, key: &SessionKey) -> Vec<SessionRecord> {
    grid.rows
        .iter()
        .filter_map(|row| {
            let exercise = row.exercise.as_deref()?.trim();
            if exercise.is_empty() {
                return None;
            }
            let weights = (0..grid.max_sets)
                .map(|n| row.weights.get(n).map_or(Cell::Empty, |raw| coerce_weight(raw)))
                .collect();
            let reps = (0..grid.max_sets)
                .map(|n| row.reps.get(n).map_or(Cell::Empty, |raw| coerce_reps(raw)))
                .collect();
            Some(SessionRecord {
                key: key.clone(),
                exercise: exercise.to_string(),
                weights,
                reps,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridRow;

    fn key() -> SessionKey {
        SessionKey::DatePhase {
            date: NaiveDate::from_ymd_opt(2024, 5, 14).unwrap(),
            phase: 1,
            split: Split::Push,
            day: 1,
        }
    }

    fn grid(rows: Vec<GridRow>) -> SessionGrid {
        SessionGrid { max_sets: 3, rows }
    }

    fn row(exercise: Option<&str>, weights: [&str; 3], reps: [&str; 3]) -> GridRow {
        GridRow {
            exercise: exercise.map(Into::into),
            weights: weights.iter().map(|s| s.to_string()).collect(),
            reps: reps.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn pack_drops_unnamed_rows() {
        let g = grid(vec![
            row(Some("Bench Press"), ["100", "", ""], ["8", "", ""]),
            row(None, ["50", "", ""], ["5", "", ""]),
            row(Some("  "), ["", "", ""], ["", "", ""]),
        ]);
        let records = pack_session(&g, &key());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].exercise, "Bench Press");
    }

    #[test]
    fn pack_coerces_and_keeps_fixed_length() {
        let g = grid(vec![row(
            Some("Bench Press"),
            ["100", "102.5", ""],
            ["8", "8", "oops"],
        )]);
        let records = pack_session(&g, &key());
        let rec = &records[0];
        assert_eq!(
            rec.weights,
            vec![Cell::Int(100), Cell::Float(102.5), Cell::Empty]
        );
        assert_eq!(
            rec.reps,
            vec![Cell::Int(8), Cell::Int(8), Cell::Text("oops".into())]
        );
    }

    #[test]
    fn pack_untouched_grid_is_all_empty() {
        let g = grid(vec![row(Some("Bench Press"), ["", "", ""], ["", "", ""])]);
        let records = pack_session(&g, &key());
        let rec = &records[0];
        assert_eq!(rec.weights.len(), 3);
        assert_eq!(rec.reps.len(), 3);
        assert!(rec.weights.iter().all(Cell::is_empty));
        assert!(rec.reps.iter().all(Cell::is_empty));
    }

    #[test]
    fn pack_attaches_key_to_every_record() {
        let g = grid(vec![
            row(Some("Bench Press"), ["", "", ""], ["", "", ""]),
            row(Some("Overhead Press"), ["", "", ""], ["", "", ""]),
        ]);
        let records = pack_session(&g, &key());
        assert!(records.iter().all(|r| r.key == key()));
    }

    #[test]
    fn recency_orders_dates_and_weeks() {
        let d1 = Recency::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let d2 = Recency::Date(NaiveDate::from_ymd_opt(2024, 5, 8).unwrap());
        assert!(d1 < d2);
        assert!(Recency::Week(3) < Recency::Week(4));
    }

    #[test]
    fn key_columns_match_schema() {
        assert_eq!(
            KeySchema::DatePhase.key_columns(),
            ["date", "phase", "split", "day"]
        );
        assert_eq!(
            KeySchema::PersonWeek.key_columns(),
            ["person", "week", "split", "day"]
        );
        assert_eq!(KeySchema::Week.key_columns(), ["week", "split", "day"]);
    }
}
