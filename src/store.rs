//! CSV-backed storage for the plan table and per-person history logs.
//!
//! The store owns the boundary I/O: the plan is loaded once per run, history
//! logs are loaded lazily and cached per file, and saving replaces the whole
//! file. History persistence is read-modify-write with no isolation: two
//! overlapping saves resolve to whichever writes last, an accepted
//! limitation of the full-overwrite design.
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;

use crate::cells::Cell;
use crate::history::HistoryLog;
use crate::plan::{PlanEntry, parse_plan_csv};
use crate::session::{KeySchema, SessionKey, SessionRecord};

const PLAN_FILE: &str = "workoutplan.csv";
const SHARED_HISTORY_FILE: &str = "previous_workouts.csv";

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    /// A history table whose shape or values do not fit the key schema.
    Malformed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "{e}"),
            StoreError::Csv(e) => write!(f, "{e}"),
            StoreError::Json(e) => write!(f, "{e}"),
            StoreError::Malformed(detail) => write!(f, "malformed history data: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Csv(e) => Some(e),
            StoreError::Json(e) => Some(e),
            StoreError::Malformed(_) => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        StoreError::Csv(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

/// Lazily-loaded view over the data directory.
pub struct WorkoutStore {
    data_dir: PathBuf,
    schema: KeySchema,
    plan: Option<Vec<PlanEntry>>,
    history: HashMap<PathBuf, HistoryLog>,
}

impl WorkoutStore {
    pub fn new(data_dir: impl Into<PathBuf>, schema: KeySchema) -> Self {
        WorkoutStore {
            data_dir: data_dir.into(),
            schema,
            plan: None,
            history: HashMap::new(),
        }
    }

    /// The full plan table, loaded on first use.
    pub fn plan(&mut self) -> Result<&[PlanEntry], StoreError> {
        if self.plan.is_none() {
            let path = self.data_dir.join(PLAN_FILE);
            let file = File::open(&path)?;
            let entries = parse_plan_csv(file)?;
            info!("Loaded {} plan entries from {}", entries.len(), path.display());
            self.plan = Some(entries);
        }
        Ok(self.plan.as_deref().unwrap_or_default())
    }

    /// The history log backing `person`, loaded on first use.
    ///
    /// A missing file is an empty log, not an error: history is created
    /// lazily on the first save.
    pub fn history(&mut self, person: &str) -> Result<&HistoryLog, StoreError> {
        let path = self.history_path(person);
        if !self.history.contains_key(&path) {
            let log = self.load_history(&path)?;
            self.history.insert(path.clone(), log);
        }
        Ok(self.history.entry(path).or_default())
    }

    /// Drop all cached history so the next read refetches from disk.
    pub fn invalidate_history(&mut self) {
        self.history.clear();
    }

    /// Persist the complete log for `person`, replacing the previous file.
    ///
    /// Last write wins: there is no version check against concurrent saves.
    pub fn save_history(&mut self, person: &str, log: HistoryLog) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.history_path(person);
        let file = File::create(&path)?;
        write_history_csv(file, self.schema, &log)?;
        info!("Saved {} records to {}", log.len(), path.display());
        self.history.insert(path, log);
        Ok(())
    }

    /// Where `person`'s history lives. The person-keyed schemas use one file
    /// per person; the shared schema keeps the person inside the table.
    fn history_path(&self, person: &str) -> PathBuf {
        match self.schema {
            KeySchema::PersonWeek => self.data_dir.join(SHARED_HISTORY_FILE),
            KeySchema::DatePhase | KeySchema::Week => {
                self.data_dir.join(format!("{person}.csv"))
            }
        }
    }

    fn load_history(&self, path: &Path) -> Result<HistoryLog, StoreError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No previous workouts found at {}", path.display());
                return Ok(HistoryLog::default());
            }
            Err(e) => return Err(e.into()),
        };
        read_history_csv(file, self.schema, &path.display().to_string())
    }
}

/// Write a history log as CSV: key columns per schema, then `exercise` and
/// the JSON-encoded `weights`/`reps` sequences.
pub fn write_history_csv<W: Write>(
    writer: W,
    schema: KeySchema,
    log: &HistoryLog,
) -> Result<(), StoreError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = schema.key_columns().to_vec();
    header.extend(["exercise", "weights", "reps"]);
    wtr.write_record(&header)?;

    for record in log.records() {
        if record.key.schema() != schema {
            return Err(StoreError::Malformed(format!(
                "record for `{}` uses key schema {:?}, store uses {:?}",
                record.exercise,
                record.key.schema(),
                schema
            )));
        }
        let mut fields = key_fields(&record.key);
        fields.push(record.exercise.clone());
        fields.push(serde_json::to_string(&record.weights)?);
        fields.push(serde_json::to_string(&record.reps)?);
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a history log back. `source` names the file for error messages.
pub fn read_history_csv<R: Read>(
    reader: R,
    schema: KeySchema,
    source: &str,
) -> Result<HistoryLog, StoreError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut expected: Vec<&str> = schema.key_columns().to_vec();
    expected.extend(["exercise", "weights", "reps"]);
    if !headers.iter().eq(expected.iter().copied()) {
        return Err(StoreError::Malformed(format!(
            "{source}: expected columns {expected:?}, found {:?}",
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let key_len = schema.key_columns().len();
    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let key = match schema {
            KeySchema::DatePhase => SessionKey::DatePhase {
                date: parse_field(&record, 0, "date", source)?,
                phase: parse_field(&record, 1, "phase", source)?,
                split: parse_field(&record, 2, "split", source)?,
                day: parse_field(&record, 3, "day", source)?,
            },
            KeySchema::PersonWeek => SessionKey::PersonWeek {
                person: parse_field(&record, 0, "person", source)?,
                week: parse_field(&record, 1, "week", source)?,
                split: parse_field(&record, 2, "split", source)?,
                day: parse_field(&record, 3, "day", source)?,
            },
            KeySchema::Week => SessionKey::Week {
                week: parse_field(&record, 0, "week", source)?,
                split: parse_field(&record, 1, "split", source)?,
                day: parse_field(&record, 2, "day", source)?,
            },
        };
        let exercise: String = parse_field(&record, key_len, "exercise", source)?;
        let weights = parse_cells(&record, key_len + 1, "weights", source)?;
        let reps = parse_cells(&record, key_len + 2, "reps", source)?;
        records.push(SessionRecord {
            key,
            exercise,
            weights,
            reps,
        });
    }
    Ok(HistoryLog::new(records))
}

fn key_fields(key: &SessionKey) -> Vec<String> {
    match key {
        SessionKey::DatePhase {
            date,
            phase,
            split,
            day,
        } => vec![
            date.to_string(),
            phase.to_string(),
            split.to_string(),
            day.to_string(),
        ],
        SessionKey::PersonWeek {
            person,
            week,
            split,
            day,
        } => vec![
            person.clone(),
            week.to_string(),
            split.to_string(),
            day.to_string(),
        ],
        SessionKey::Week { week, split, day } => {
            vec![week.to_string(), split.to_string(), day.to_string()]
        }
    }
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    source: &str,
) -> Result<T, StoreError>
where
    T::Err: fmt::Display,
{
    let line = line_of(record);
    let raw = record.get(idx).ok_or_else(|| {
        StoreError::Malformed(format!("{source}:{line}: missing `{name}` column"))
    })?;
    raw.trim().parse::<T>().map_err(|e| {
        StoreError::Malformed(format!("{source}:{line}: bad `{name}` value `{raw}`: {e}"))
    })
}

fn parse_cells(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    source: &str,
) -> Result<Vec<Cell>, StoreError> {
    let line = line_of(record);
    let raw = record.get(idx).ok_or_else(|| {
        StoreError::Malformed(format!("{source}:{line}: missing `{name}` column"))
    })?;
    serde_json::from_str(raw).map_err(|e| {
        StoreError::Malformed(format!("{source}:{line}: bad `{name}` sequence: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Split;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn dated_record(day_of_month: u32, exercise: &str, first_weight: i64) -> SessionRecord {
        SessionRecord {
            key: SessionKey::DatePhase {
                date: NaiveDate::from_ymd_opt(2024, 5, day_of_month).unwrap(),
                phase: 1,
                split: Split::Push,
                day: 1,
            },
            exercise: exercise.into(),
            weights: vec![Cell::Int(first_weight), Cell::Float(72.5), Cell::Empty],
            reps: vec![Cell::Int(8), Cell::Text("8-10".into()), Cell::Empty],
        }
    }

    #[test]
    fn missing_history_reads_as_empty_log() {
        let dir = tempdir().unwrap();
        let mut store = WorkoutStore::new(dir.path(), KeySchema::DatePhase);
        let log = store.history("Tomas").unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn save_then_read_roundtrips_dated_schema() {
        let dir = tempdir().unwrap();
        let mut store = WorkoutStore::new(dir.path(), KeySchema::DatePhase);
        let log = HistoryLog::new(vec![
            dated_record(1, "Bench Press", 100),
            dated_record(1, "Overhead Press", 50),
        ]);
        store.save_history("Tomas", log.clone()).unwrap();

        store.invalidate_history();
        let loaded = store.history("Tomas").unwrap();
        assert_eq!(loaded, &log);
    }

    #[test]
    fn shared_schema_uses_one_file_for_all_people() {
        let dir = tempdir().unwrap();
        let mut store = WorkoutStore::new(dir.path(), KeySchema::PersonWeek);
        let record = SessionRecord {
            key: SessionKey::PersonWeek {
                person: "Tomas".into(),
                week: 3,
                split: Split::Pull,
                day: 2,
            },
            exercise: "Deadlift".into(),
            weights: vec![Cell::Int(140)],
            reps: vec![Cell::Int(5)],
        };
        store
            .save_history("Tomas", HistoryLog::new(vec![record.clone()]))
            .unwrap();

        // Reading through another person hits the same shared table.
        store.invalidate_history();
        let loaded = store.history("Sebko").unwrap();
        assert_eq!(loaded.records(), &[record]);
        assert!(dir.path().join("previous_workouts.csv").exists());
    }

    #[test]
    fn week_schema_roundtrip() {
        let dir = tempdir().unwrap();
        let mut store = WorkoutStore::new(dir.path(), KeySchema::Week);
        let record = SessionRecord {
            key: SessionKey::Week {
                week: 7,
                split: Split::Legs,
                day: 1,
            },
            exercise: "Squat".into(),
            weights: vec![Cell::Float(102.5), Cell::Empty],
            reps: vec![Cell::Int(5), Cell::Empty],
        };
        store
            .save_history("Sebko", HistoryLog::new(vec![record.clone()]))
            .unwrap();
        store.invalidate_history();
        let loaded = store.history("Sebko").unwrap();
        assert_eq!(loaded.records(), &[record]);
        assert!(dir.path().join("Sebko.csv").exists());
    }

    #[test]
    fn cached_history_needs_invalidation_to_see_external_writes() {
        let dir = tempdir().unwrap();
        let mut store = WorkoutStore::new(dir.path(), KeySchema::DatePhase);
        store
            .save_history("Tomas", HistoryLog::new(vec![dated_record(1, "Bench Press", 100)]))
            .unwrap();
        assert_eq!(store.history("Tomas").unwrap().len(), 1);

        // Another process rewrites the file behind the cache.
        let bigger = HistoryLog::new(vec![
            dated_record(1, "Bench Press", 100),
            dated_record(8, "Bench Press", 105),
        ]);
        let file = File::create(dir.path().join("Tomas.csv")).unwrap();
        write_history_csv(file, KeySchema::DatePhase, &bigger).unwrap();

        assert_eq!(store.history("Tomas").unwrap().len(), 1);
        store.invalidate_history();
        assert_eq!(store.history("Tomas").unwrap().len(), 2);
    }

    #[test]
    fn missing_plan_file_is_an_error() {
        let dir = tempdir().unwrap();
        let mut store = WorkoutStore::new(dir.path(), KeySchema::DatePhase);
        let err = store.plan().unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn plan_loads_and_caches() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("workoutplan.csv"),
            "phase,split,day,exercise,warm_up,sets,reps,rpe,alternative_1,alternative_2\n\
             1,Push,1,Bench Press,2 light sets,4,8-10,8,,\n",
        )
        .unwrap();
        let mut store = WorkoutStore::new(dir.path(), KeySchema::DatePhase);
        assert_eq!(store.plan().unwrap().len(), 1);

        // Cached after first load; deleting the file no longer matters.
        fs::remove_file(dir.path().join("workoutplan.csv")).unwrap();
        assert_eq!(store.plan().unwrap().len(), 1);
    }

    #[test]
    fn wrong_header_is_malformed() {
        let data = "date,split,day,exercise,weights,reps\n";
        let err = read_history_csv(data.as_bytes(), KeySchema::DatePhase, "t.csv").unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn schema_mismatch_on_write_is_malformed() {
        let record = SessionRecord {
            key: SessionKey::Week {
                week: 1,
                split: Split::Push,
                day: 1,
            },
            exercise: "Bench Press".into(),
            weights: vec![],
            reps: vec![],
        };
        let mut buf = Vec::new();
        let err = write_history_csv(
            &mut buf,
            KeySchema::DatePhase,
            &HistoryLog::new(vec![record]),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn malformed_row_reports_line() {
        let data = "date,phase,split,day,exercise,weights,reps\n\
                    2024-05-01,1,Push,1,Bench Press,[100],[8]\n\
                    not-a-date,1,Push,1,Bench Press,[100],[8]\n";
        let err = read_history_csv(data.as_bytes(), KeySchema::DatePhase, "t.csv").unwrap_err();
        match err {
            StoreError::Malformed(detail) => {
                assert!(detail.contains("t.csv:3"), "detail: {detail}");
                assert!(detail.contains("date"));
            }
            e => panic!("unexpected error: {e:?}"),
        }
    }
}
