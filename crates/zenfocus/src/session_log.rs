//! Append-only session log
//!
//! Records are kept in insertion order and persisted as one JSON array
//! under [`SESSIONS_KEY`]. Aggregates (streaks, totals, daily buckets)
//! are derived on demand in [`crate::stats`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::mode::Mode;
use crate::session::{FocusRating, SessionRecord};
use crate::store::{PersistenceError, SharedStore, SESSIONS_KEY};

/// Why a rating could not be attached
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateError {
    #[error("No session with id {0}")]
    UnknownSession(u64),

    #[error("Session {0} is a break; only focus sessions can be rated")]
    NotFocus(u64),

    #[error("Session {0} is already rated")]
    AlreadyRated(u64),
}

/// Ordered collection of completed sessions
pub struct SessionLog {
    records: Vec<SessionRecord>,
    store: Option<SharedStore>,
    last_id: u64,
}

impl SessionLog {
    /// A log that is never persisted
    pub fn in_memory() -> Self {
        Self::from_records(Vec::new())
    }

    /// A non-persisted log seeded with `records`
    pub fn from_records(records: Vec<SessionRecord>) -> Self {
        let last_id = records.iter().map(|r| r.id()).max().unwrap_or(0);
        Self {
            records,
            store: None,
            last_id,
        }
    }

    /// Load the log from `store`. A missing blob is an empty log; entries
    /// that fail to parse are skipped so one bad record cannot hide the rest.
    pub fn open(store: SharedStore) -> Self {
        let records = match store.load(SESSIONS_KEY) {
            Ok(Some(value)) => parse_records(value),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load session log, starting empty: {}", e);
                Vec::new()
            }
        };
        debug!("Loaded {} sessions", records.len());

        let mut log = Self::from_records(records);
        log.store = Some(store);
        log
    }

    /// Append a record at the end of the log
    pub fn append(&mut self, record: SessionRecord) {
        self.last_id = self.last_id.max(record.id());
        self.records.push(record);
    }

    /// Time-derived id for a record created at `at`, strictly greater than
    /// every id already in the log
    pub fn next_id(&self, at: DateTime<Utc>) -> u64 {
        let millis = at.timestamp_millis().max(0) as u64;
        millis.max(self.last_id.saturating_add(1))
    }

    /// Create and append the record for an interval that just finished
    pub fn record(&mut self, at: DateTime<Utc>, duration_minutes: u32, mode: Mode) -> SessionRecord {
        let record = SessionRecord::new(self.next_id(at), at, duration_minutes, mode);
        self.append(record.clone());
        record
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

    pub fn get(&self, id: u64) -> Option<&SessionRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Most recent focus session, if any
    pub fn last_focus(&self) -> Option<&SessionRecord> {
        self.records.iter().rev().find(|r| r.is_focus())
    }

    /// Records with `start <= timestamp < end`, in log order
    pub fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &SessionRecord> + '_ {
        self.records
            .iter()
            .filter(move |r| r.timestamp() >= start && r.timestamp() < end)
    }

    /// Attach a focus rating to a focus session that has none yet
    pub fn rate(&mut self, id: u64, rating: FocusRating) -> Result<&SessionRecord, RateError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(RateError::UnknownSession(id))?;

        if !record.is_focus() {
            return Err(RateError::NotFocus(id));
        }
        if record.focus_rating().is_some() {
            return Err(RateError::AlreadyRated(id));
        }

        record.attach_rating(rating);
        Ok(record)
    }

    /// Write the whole log back to its store (no-op for in-memory logs)
    pub fn flush(&self) -> Result<(), PersistenceError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let value = serde_json::to_value(&self.records)?;
        store.save(SESSIONS_KEY, &value)
    }
}

fn parse_records(value: Value) -> Vec<SessionRecord> {
    let Value::Array(items) = value else {
        warn!("Session log is not a JSON array, starting empty");
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<SessionRecord>(item) {
            // No id can follow u64::MAX, so such a record would block new ones
            Ok(record) if record.id() == u64::MAX => {
                warn!("Skipping session at index {}: id {} leaves no room", i, record.id());
                None
            }
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed session at index {}: {}", i, e);
                None
            }
        })
        .collect()
}
