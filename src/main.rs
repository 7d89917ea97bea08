//! Command-line front end and persistent user settings.
//!
//! The flow mirrors one tracked session: pick a (phase, split, day)
//! selection, show the plan, write out an editable grid, then save the
//! edited grid into the person's history log.

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use dirs_next as dirs;
use log::warn;
use serde::{Deserialize, Serialize};

mod cells;
mod grid;
mod history;
mod plan;
mod session;
mod store;

use cells::format_cells;
use grid::SessionGrid;
use history::{SessionSelector, previous_session};
use plan::{PlanError, PlanView, Split, exercise_catalog, phase_for_week, select_plan};
use session::{KeySchema, SessionKey, pack_session};
use store::WorkoutStore;

/// Persistent configuration: where the data lives, who may log sessions and
/// which history key schema the deployment uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
struct Settings {
    data_dir: PathBuf,
    people: Vec<String>,
    schema: KeySchema,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("data"),
            people: vec!["Tomas".into(), "Sebko".into()],
            schema: KeySchema::DatePhase,
        }
    }
}

impl Settings {
    const FILE: &'static str = "workout_tracker_settings.json";

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                if let Ok(cfg) = serde_json::from_str(&data) {
                    return cfg;
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(data) = serde_json::to_string_pretty(self) {
                let _ = std::fs::write(path, data);
            }
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan-driven strength session tracker", long_about = None)]
struct Cli {
    /// Data directory (transient override; `config` persists it)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Session selection shared by the plan-driven commands. The phase comes
/// either directly or derived from a week number.
#[derive(Args, Debug)]
struct Selection {
    /// Training phase (1-3)
    #[arg(long, conflicts_with = "week", required_unless_present = "week")]
    phase: Option<u8>,
    /// Week number, mapped onto a phase
    #[arg(long)]
    week: Option<u32>,
    /// Session split
    #[arg(long, value_enum)]
    split: Split,
    /// Session variation within the split
    #[arg(long)]
    day: u8,
}

impl Selection {
    fn phase(&self) -> Result<u8, Box<dyn Error>> {
        match (self.phase, self.week) {
            (Some(phase), _) => Ok(phase),
            (None, Some(week)) => Ok(phase_for_week(week)?),
            (None, None) => Err("either --phase or --week is required".into()),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the workout plan and selectable exercises for a session
    Plan {
        #[command(flatten)]
        selection: Selection,
    },
    /// Write an empty editable grid for a session to a CSV file
    Grid {
        #[command(flatten)]
        selection: Selection,
        /// Where to write the grid
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Pack an edited grid and merge it into the history log
    Save {
        #[command(flatten)]
        selection: Selection,
        /// Person whose history receives the session
        #[arg(short, long)]
        person: String,
        /// Edited grid CSV produced by `grid`
        #[arg(short, long)]
        grid: PathBuf,
        /// Session date; defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the most recent saved session matching a selection
    Last {
        /// Person whose history to search
        #[arg(short, long)]
        person: String,
        /// Session split
        #[arg(long, value_enum)]
        split: Split,
        /// Session variation within the split
        #[arg(long)]
        day: u8,
        /// Restrict to one training phase
        #[arg(long)]
        phase: Option<u8>,
    },
    /// Show or update the persistent configuration
    Config {
        /// Replace the list of people (comma separated)
        #[arg(long, value_delimiter = ',')]
        people: Option<Vec<String>>,
        /// Set the history key schema
        #[arg(long, value_enum)]
        schema: Option<KeySchema>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let Cli { data_dir, command } = cli;
    let mut settings = Settings::load();
    if let Some(dir) = &data_dir {
        settings.data_dir = dir.clone();
    }
    match command {
        Commands::Plan { selection } => cmd_plan(&settings, &selection),
        Commands::Grid { selection, out } => cmd_grid(&settings, &selection, &out),
        Commands::Save {
            selection,
            person,
            grid,
            date,
        } => cmd_save(&settings, &selection, &person, &grid, date),
        Commands::Last {
            person,
            split,
            day,
            phase,
        } => cmd_last(&settings, &person, split, day, phase),
        Commands::Config { people, schema } => cmd_config(data_dir, people, schema),
    }
}

/// Resolve the selection against the plan. A selection with no plan rows is
/// not fatal: warn, show nothing and skip the rest of the flow.
fn session_view(
    store: &mut WorkoutStore,
    selection: &Selection,
) -> Result<Option<PlanView>, Box<dyn Error>> {
    let phase = selection.phase()?;
    let plan = store.plan()?;
    match select_plan(plan, phase, selection.split, selection.day) {
        Ok(view) => Ok(Some(view)),
        Err(e @ PlanError::NotFound { .. }) => {
            warn!("{e}");
            println!("Workout plan not found");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn check_person(settings: &Settings, person: &str) -> Result<(), Box<dyn Error>> {
    if settings.people.iter().any(|p| p == person) {
        return Ok(());
    }
    Err(format!(
        "unknown person `{person}`; configured people: {}",
        settings.people.join(", ")
    )
    .into())
}

fn cmd_plan(settings: &Settings, selection: &Selection) -> Result<(), Box<dyn Error>> {
    let mut store = WorkoutStore::new(&settings.data_dir, settings.schema);
    let Some(view) = session_view(&mut store, selection)? else {
        return Ok(());
    };

    println!(
        "{:<28} {:<18} {:>4} {:>8} {:>5}  {}",
        "Exercise", "Warm-up", "Sets", "Reps", "RPE", "Alternatives"
    );
    for entry in &view.entries {
        let mut alternatives: Vec<&str> = Vec::new();
        for alt in [&entry.alternative_1, &entry.alternative_2] {
            if let Some(name) = alt {
                if !name.trim().is_empty() {
                    alternatives.push(name);
                }
            }
        }
        println!(
            "{:<28} {:<18} {:>4} {:>8} {:>5}  {}",
            entry.exercise,
            entry.warm_up,
            entry.sets,
            entry.reps,
            entry.rpe,
            alternatives.join(" / ")
        );
    }
    println!();
    println!("Selectable exercises:");
    for name in exercise_catalog(&view.entries) {
        println!("  {name}");
    }
    Ok(())
}

fn cmd_grid(
    settings: &Settings,
    selection: &Selection,
    out: &PathBuf,
) -> Result<(), Box<dyn Error>> {
    let mut store = WorkoutStore::new(&settings.data_dir, settings.schema);
    let Some(view) = session_view(&mut store, selection)? else {
        return Ok(());
    };

    let grid = SessionGrid::build(&view);
    let file = File::create(out)?;
    grid.write_csv(file)?;
    println!(
        "Wrote editable grid for {} exercises ({} sets) to {}",
        grid.rows.len(),
        grid.max_sets,
        out.display()
    );
    Ok(())
}

fn cmd_save(
    settings: &Settings,
    selection: &Selection,
    person: &str,
    grid_path: &PathBuf,
    date: Option<NaiveDate>,
) -> Result<(), Box<dyn Error>> {
    check_person(settings, person)?;
    let mut store = WorkoutStore::new(&settings.data_dir, settings.schema);
    let Some(view) = session_view(&mut store, selection)? else {
        return Ok(());
    };

    let file = File::open(grid_path)?;
    let edited = SessionGrid::read_csv(file)?;
    if edited.max_sets != view.max_sets {
        return Err(format!(
            "grid has {} set slots but the plan needs {}",
            edited.max_sets, view.max_sets
        )
        .into());
    }

    let catalog = exercise_catalog(&view.entries);
    for row in &edited.rows {
        if let Some(name) = &row.exercise {
            if !catalog.iter().any(|c| c == name) {
                return Err(format!(
                    "`{name}` is not selectable for this session; pick one of: {}",
                    catalog.join(", ")
                )
                .into());
            }
        }
    }

    let phase = selection.phase()?;
    let key = match settings.schema {
        KeySchema::DatePhase => SessionKey::DatePhase {
            date: date.unwrap_or_else(|| Local::now().date_naive()),
            phase,
            split: selection.split,
            day: selection.day,
        },
        KeySchema::PersonWeek => SessionKey::PersonWeek {
            person: person.to_string(),
            week: selection
                .week
                .ok_or("the person/week history schema needs --week")?,
            split: selection.split,
            day: selection.day,
        },
        KeySchema::Week => SessionKey::Week {
            week: selection.week.ok_or("the week history schema needs --week")?,
            split: selection.split,
            day: selection.day,
        },
    };

    let records = pack_session(&edited, &key);
    if records.is_empty() {
        println!("No exercises filled in; nothing saved");
        return Ok(());
    }
    let saved = records.len();

    // Refetch so the merge runs against the latest log on disk.
    store.invalidate_history();
    let log = store.history(person)?.clone();
    let merged = log.merge(records);
    let total = merged.len();
    store.save_history(person, merged)?;
    println!("Saved {saved} exercises for {person} ({total} records in history)");
    Ok(())
}

fn cmd_last(
    settings: &Settings,
    person: &str,
    split: Split,
    day: u8,
    phase: Option<u8>,
) -> Result<(), Box<dyn Error>> {
    check_person(settings, person)?;
    let mut store = WorkoutStore::new(&settings.data_dir, settings.schema);
    let log = store.history(person)?;

    let selector = SessionSelector {
        person: match settings.schema {
            KeySchema::PersonWeek => Some(person.to_string()),
            KeySchema::DatePhase | KeySchema::Week => None,
        },
        phase,
        split,
        day,
    };
    let previous = previous_session(log, &selector);
    if previous.is_empty() {
        println!("Previous workout not found");
        return Ok(());
    }

    println!("{:<28} {:<24} {}", "Exercise", "Weights", "Reps");
    for record in previous {
        println!(
            "{:<28} {:<24} {}",
            record.exercise,
            format_cells(&record.weights),
            format_cells(&record.reps)
        );
    }
    Ok(())
}

fn cmd_config(
    data_dir: Option<PathBuf>,
    people: Option<Vec<String>>,
    schema: Option<KeySchema>,
) -> Result<(), Box<dyn Error>> {
    let mut settings = Settings::load();
    let changed = data_dir.is_some() || people.is_some() || schema.is_some();
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    if let Some(people) = people {
        settings.people = people;
    }
    if let Some(schema) = schema {
        settings.schema = schema;
    }
    if changed {
        settings.save();
    }
    println!("data dir: {}", settings.data_dir.display());
    println!("people:   {}", settings.people.join(", "));
    println!("schema:   {:?}", settings.schema);
    Ok(())
}
