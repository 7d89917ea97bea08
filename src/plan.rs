// Exercise plan model, session selection and the exercise catalog.
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Muscle-group grouping for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Split {
    Push,
    Pull,
    Legs,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Split::Push => "Push",
            Split::Pull => "Pull",
            Split::Legs => "Legs",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" => Ok(Split::Push),
            "pull" => Ok(Split::Pull),
            "legs" => Ok(Split::Legs),
            other => Err(format!("unknown split: {other}")),
        }
    }
}

/// One row of the exercise plan table.
///
/// The plan is read-only input. Serde aliases normalize the header variants
/// found in the legacy tables (`Phase` vs `week`, capitalized names) onto
/// one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    #[serde(alias = "Phase", alias = "week")]
    pub phase: u8,
    #[serde(alias = "Split")]
    pub split: Split,
    #[serde(alias = "Day")]
    pub day: u8,
    #[serde(alias = "Exercise")]
    pub exercise: String,
    #[serde(alias = "Warm_up")]
    pub warm_up: String,
    #[serde(alias = "Sets")]
    pub sets: u32,
    #[serde(alias = "Reps")]
    pub reps: String,
    #[serde(alias = "RPE")]
    pub rpe: String,
    pub alternative_1: Option<String>,
    pub alternative_2: Option<String>,
}

#[derive(Debug)]
pub enum PlanError {
    /// No plan rows match the selection. Non-fatal; callers show nothing.
    NotFound { phase: u8, split: Split, day: u8 },
    /// Week number outside the planned 1..=13 range.
    WeekOutOfRange(u32),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::NotFound { phase, split, day } => {
                write!(f, "no workout plan for phase {phase}, {split}, day {day}")
            }
            PlanError::WeekOutOfRange(week) => {
                write!(f, "week {week} is outside the planned range (1-13)")
            }
        }
    }
}

impl std::error::Error for PlanError {}

/// A plan filtered down to one session, plus its set-count ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanView {
    pub entries: Vec<PlanEntry>,
    /// Maximum `sets` over the filtered rows; the width of the session grid.
    pub max_sets: usize,
}

/// Map a week number onto a training phase.
///
/// Weeks 1-6 are phase 1, 7-10 phase 2, 11-13 phase 3. Anything outside
/// that range has no planned phase and is an explicit error rather than a
/// clamp.
pub fn phase_for_week(week: u32) -> Result<u8, PlanError> {
    match week {
        1..=6 => Ok(1),
        7..=10 => Ok(2),
        11..=13 => Ok(3),
        _ => Err(PlanError::WeekOutOfRange(week)),
    }
}

/// Filter the plan to one (phase, split, day) session.
pub fn select_plan(
    plan: &[PlanEntry],
    phase: u8,
    split: Split,
    day: u8,
) -> Result<PlanView, PlanError> {
    let entries: Vec<PlanEntry> = plan
        .iter()
        .filter(|e| e.phase == phase && e.split == split && e.day == day)
        .cloned()
        .collect();

    if entries.is_empty() {
        return Err(PlanError::NotFound { phase, split, day });
    }

    let max_sets = entries.iter().map(|e| e.sets).max().unwrap_or(0) as usize;
    Ok(PlanView { entries, max_sets })
}

/// The selectable exercise names for a session: every primary exercise plus
/// all non-empty alternatives, deduplicated and sorted ascending.
pub fn exercise_catalog(entries: &[PlanEntry]) -> Vec<String> {
    let mut names: BTreeSet<String> = BTreeSet::new();
    for entry in entries {
        names.insert(entry.exercise.clone());
        for alt in [&entry.alternative_1, &entry.alternative_2] {
            if let Some(name) = alt {
                if !name.trim().is_empty() {
                    names.insert(name.clone());
                }
            }
        }
    }
    names.into_iter().collect()
}

/// Parse a plan table from CSV.
pub fn parse_plan_csv<R: std::io::Read>(reader: R) -> Result<Vec<PlanEntry>, csv::Error> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize().collect()
}
