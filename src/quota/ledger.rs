//! Durable, crash-tolerant storage for the quota ledger.
//!
//! The ledger is one JSON document: a config block plus a map from day key
//! to that day's usage record. Writes go through a temp-file-then-rename so
//! a crash mid-write cannot leave a half-written file; a missing or corrupt
//! file is reinitialized in place rather than surfaced as an error.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use super::day::DayKey;
use crate::Result;

/// Days of usage history kept across loads.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Usage recorded for a single day: per-operation unit counts plus their sum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayUsage {
    #[serde(default)]
    pub operations: HashMap<String, u64>,
    #[serde(default)]
    pub total: u64,
}

impl DayUsage {
    /// Charge `units` against `operation`, keeping `total` equal to the sum
    /// of all per-operation counts.
    pub fn record(&mut self, operation: &str, units: u64) {
        *self.operations.entry(operation.to_string()).or_insert(0) += units;
        self.total += units;
    }

    pub fn units_for(&self, operation: &str) -> u64 {
        self.operations.get(operation).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub daily_limit: u64,
    pub created_at: DateTime<Utc>,
}

/// Full persisted ledger document. Round-trips losslessly through
/// [`QuotaLedger::save`] and [`QuotaLedger::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub config: LedgerConfig,
    #[serde(default)]
    pub usage: BTreeMap<DayKey, DayUsage>,
}

impl LedgerState {
    pub fn new(daily_limit: u64) -> Self {
        Self {
            config: LedgerConfig {
                daily_limit,
                created_at: Utc::now(),
            },
            usage: BTreeMap::new(),
        }
    }

    pub fn used_on(&self, day: &DayKey) -> u64 {
        self.usage.get(day).map(|u| u.total).unwrap_or(0)
    }

    /// Drop entries strictly older than `today - retention_days`. Returns
    /// the number of removed day keys. No I/O; persisting the pruned state
    /// is the caller's job.
    pub fn prune(&mut self, retention_days: u32, today: DayKey) -> usize {
        let cutoff = today
            .date()
            .checked_sub_days(Days::new(u64::from(retention_days)))
            .unwrap_or(chrono::NaiveDate::MIN);
        let before = self.usage.len();
        self.usage.retain(|day, _| day.date() >= cutoff);
        before - self.usage.len()
    }
}

/// File-backed storage handle for a [`LedgerState`].
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    path: PathBuf,
}

impl QuotaLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the backing file. Missing or corrupt files are reinitialized to
    /// an empty state (with `daily_limit` from the caller) and persisted;
    /// this never fails, only logs.
    pub fn load(&self, daily_limit: u64) -> LedgerState {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "corrupt quota ledger, reinitializing"
                    );
                    self.reinitialize(daily_limit)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => self.reinitialize(daily_limit),
            Err(e) => {
                // Unreadable for another reason (permissions, etc.): start
                // empty in memory but leave the file alone.
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "unreadable quota ledger, starting with empty state"
                );
                LedgerState::new(daily_limit)
            }
        }
    }

    /// Write the full state atomically: serialize to `<path>.tmp` in the
    /// same directory, then rename over the target.
    pub fn save(&self, state: &LedgerState) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn reinitialize(&self, daily_limit: u64) -> LedgerState {
        let state = LedgerState::new(daily_limit);
        if let Err(e) = self.save(&state) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to persist reinitialized quota ledger"
            );
        }
        state
    }
}
