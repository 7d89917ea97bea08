// Editable session grid: one row per planned exercise, one weight and one
// reps slot per set index up to the session's set-count ceiling.
use std::fmt;
use std::io::{Read, Write};

use crate::cells::is_missing;
use crate::plan::PlanView;

/// One editable row. Cells hold raw text until packing coerces them.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    /// Selected exercise name; `None` when the user cleared the row.
    pub exercise: Option<String>,
    pub weights: Vec<String>,
    pub reps: Vec<String>,
}

/// The editable surface for one session.
///
/// Built from a filtered plan and handed to the presentation collaborator
/// for editing; the edited grid travels back through the same CSV shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionGrid {
    pub max_sets: usize,
    pub rows: Vec<GridRow>,
}

#[derive(Debug)]
pub enum GridError {
    Csv(csv::Error),
    /// Header row does not follow `exercise, weight_1, reps_1, ...`.
    Header(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Csv(e) => write!(f, "{e}"),
            GridError::Header(detail) => write!(f, "bad grid header: {detail}"),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GridError::Csv(e) => Some(e),
            GridError::Header(_) => None,
        }
    }
}

impl From<csv::Error> for GridError {
    fn from(e: csv::Error) -> Self {
        GridError::Csv(e)
    }
}

impl SessionGrid {
    /// Build the empty grid for a filtered plan.
    ///
    /// Every row gets its exercise cell seeded from the plan, including the
    /// first row, and `max_sets` blank weight/reps slots.
    pub fn build(view: &PlanView) -> SessionGrid {
        let rows = view
            .entries
            .iter()
            .map(|entry| GridRow {
                exercise: Some(entry.exercise.clone()),
                weights: vec![String::new(); view.max_sets],
                reps: vec![String::new(); view.max_sets],
            })
            .collect();
        SessionGrid {
            max_sets: view.max_sets,
            rows,
        }
    }

    /// Column names for the edit round-trip: `exercise`, then interleaved
    /// `weight_<n>`, `reps_<n>` for each set index starting at 1.
    pub fn column_names(max_sets: usize) -> Vec<String> {
        let mut names = vec!["exercise".to_string()];
        for n in 1..=max_sets {
            names.push(format!("weight_{n}"));
            names.push(format!("reps_{n}"));
        }
        names
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(Self::column_names(self.max_sets))?;
        for row in &self.rows {
            let mut record = vec![row.exercise.clone().unwrap_or_default()];
            for n in 0..self.max_sets {
                record.push(row.weights.get(n).cloned().unwrap_or_default());
                record.push(row.reps.get(n).cloned().unwrap_or_default());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush().map_err(Into::into)
    }

    /// Read an edited grid back from CSV, deriving `max_sets` from the
    /// header width.
    pub fn read_csv<R: Read>(reader: R) -> Result<SessionGrid, GridError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();

        if headers.len() % 2 == 0 {
            return Err(GridError::Header(format!(
                "expected an exercise column plus weight/reps pairs, got {} columns",
                headers.len()
            )));
        }
        let max_sets = (headers.len() - 1) / 2;
        let expected = Self::column_names(max_sets);
        for (got, want) in headers.iter().zip(&expected) {
            if got != want {
                return Err(GridError::Header(format!(
                    "expected column `{want}`, got `{got}`"
                )));
            }
        }

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let exercise = record.get(0).unwrap_or_default();
            let exercise = if is_missing(exercise) {
                None
            } else {
                Some(exercise.to_string())
            };
            let mut weights = Vec::with_capacity(max_sets);
            let mut reps = Vec::with_capacity(max_sets);
            for n in 0..max_sets {
                weights.push(record.get(1 + 2 * n).unwrap_or_default().to_string());
                reps.push(record.get(2 + 2 * n).unwrap_or_default().to_string());
            }
            rows.push(GridRow {
                exercise,
                weights,
                reps,
            });
        }
        log::debug!("Read grid with {} rows, {} sets", rows.len(), max_sets);
        Ok(SessionGrid { max_sets, rows })
    }
}
