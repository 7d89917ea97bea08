// Historical session log and the last-write-wins merge.
use std::collections::HashSet;

use crate::plan::Split;
use crate::session::{SessionKey, SessionRecord};

/// The full historical table of packed session records.
///
/// Composite keys `(SessionKey, exercise)` are unique within a log; the only
/// write path is [`HistoryLog::merge`], which upholds that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryLog {
    records: Vec<SessionRecord>,
}

impl HistoryLog {
    pub fn new(records: Vec<SessionRecord>) -> Self {
        HistoryLog { records }
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Upsert `new_records` into the log.
    ///
    /// Old records come first, new records after; duplicates by composite
    /// key keep the last occurrence, so a re-saved session replaces the
    /// previous save while records under other keys stay untouched. Order
    /// is the stable order of kept occurrences.
    pub fn merge(self, new_records: Vec<SessionRecord>) -> HistoryLog {
        if self.records.is_empty() {
            return HistoryLog::new(new_records);
        }

        let mut all = self.records;
        all.extend(new_records);

        let mut seen: HashSet<(SessionKey, String)> = HashSet::new();
        let mut kept = Vec::with_capacity(all.len());
        for record in all.into_iter().rev() {
            if seen.insert((record.key.clone(), record.exercise.clone())) {
                kept.push(record);
            }
        }
        kept.reverse();
        HistoryLog::new(kept)
    }
}

/// Which previous session to look up: split and day always, person/phase
/// only where the key schema carries them.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSelector {
    pub person: Option<String>,
    pub phase: Option<u8>,
    pub split: Split,
    pub day: u8,
}

impl SessionSelector {
    fn matches(&self, key: &SessionKey) -> bool {
        if key.split() != self.split || key.day() != self.day {
            return false;
        }
        match key {
            SessionKey::DatePhase { phase, .. } => self.phase.is_none_or(|p| p == *phase),
            SessionKey::PersonWeek { person, .. } => {
                self.person.as_deref().is_none_or(|p| p == person.as_str())
            }
            SessionKey::Week { .. } => true,
        }
    }
}

/// The most recent session matching the selector.
///
/// Filters the log, then keeps only the records of the latest date/week.
/// Empty when nothing matches; the caller shows a warning and moves on.
pub fn previous_session<'a>(
    log: &'a HistoryLog,
    selector: &SessionSelector,
) -> Vec<&'a SessionRecord> {
    let matched: Vec<&SessionRecord> = log
        .records()
        .iter()
        .filter(|r| selector.matches(&r.key))
        .collect();

    let Some(latest) = matched.iter().map(|r| r.key.recency()).max() else {
        log::info!(
            "No previous {} day {} session in the log",
            selector.split,
            selector.day
        );
        return Vec::new();
    };
    matched
        .into_iter()
        .filter(|r| r.key.recency() == latest)
        .collect()
}
