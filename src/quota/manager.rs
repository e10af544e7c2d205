//! Daily budget enforcement.
//!
//! One `QuotaManager` exclusively owns its ledger file within the process.
//! Every read-modify-write of the ledger happens under a single mutex
//! acquisition spanning the availability check, the increment, and the
//! persist, so concurrent consumers cannot jointly overshoot the limit.
//! The lock is never held across network I/O; that happens in the client.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{Days, FixedOffset};

use super::cost::CostTable;
use super::day::{DEFAULT_RESET_OFFSET_HOURS, DayKey, reset_offset};
use super::ledger::{DEFAULT_RETENTION_DAYS, DayUsage, LedgerState, QuotaLedger};
use crate::{Error, Result};

/// Default daily budget in quota units (the YouTube Data API default).
pub const DEFAULT_DAILY_LIMIT: u64 = 10_000;

/// Utilization at or above which `consume` logs a warning.
const WARNING_THRESHOLD: f64 = 0.8;

pub struct QuotaManager {
    ledger: QuotaLedger,
    costs: CostTable,
    reset_offset: FixedOffset,
    state: Mutex<LedgerState>,
}

impl QuotaManager {
    pub fn builder() -> QuotaManagerBuilder {
        QuotaManagerBuilder::default()
    }

    pub fn operation_cost(&self, operation: &str) -> u64 {
        self.costs.cost(operation)
    }

    pub fn daily_limit(&self) -> u64 {
        self.lock().config.daily_limit
    }

    /// Whether one call of `operation` fits in today's remaining budget.
    /// Read-only and advisory: [`QuotaManager::consume`] re-checks under the
    /// same lock that applies the increment.
    pub fn can_execute(&self, operation: &str) -> bool {
        self.can_execute_n(operation, 1)
    }

    /// Whether `count` calls of `operation` fit in today's remaining budget.
    pub fn can_execute_n(&self, operation: &str, count: u64) -> bool {
        let cost = self.costs.cost(operation).saturating_mul(count);
        let today = self.today();
        let state = self.lock();
        cost <= state.config.daily_limit.saturating_sub(state.used_on(&today))
    }

    /// Charge one call of `operation` against today's budget.
    pub fn consume(&self, operation: &str) -> Result<()> {
        self.consume_n(operation, 1)
    }

    /// Charge `count` calls of `operation` against today's budget.
    ///
    /// Check, increment, and persist run under one lock acquisition; either
    /// the whole charge is applied or none of it is. Fails with
    /// [`Error::QuotaExceeded`] when the cost does not fit.
    pub fn consume_n(&self, operation: &str, count: u64) -> Result<()> {
        let cost = self.costs.cost(operation).saturating_mul(count);
        let today = self.today();

        let mut state = self.lock();
        let limit = state.config.daily_limit;
        let remaining = limit.saturating_sub(state.used_on(&today));
        if cost > remaining {
            return Err(Error::QuotaExceeded {
                operation: operation.to_string(),
                cost,
                remaining,
            });
        }

        state.usage.entry(today).or_default().record(operation, cost);
        let used = state.used_on(&today);
        self.persist_best_effort(&state);
        drop(state);

        tracing::debug!(operation, cost, used, limit, "quota consumed");
        if limit > 0 && used as f64 / limit as f64 >= WARNING_THRESHOLD {
            tracing::warn!(
                operation,
                used,
                limit,
                "daily quota utilization at or above {}%",
                (WARNING_THRESHOLD * 100.0) as u32
            );
        }
        Ok(())
    }

    /// Like [`QuotaManager::consume`], but reports an exceeded budget as
    /// `false` instead of an error.
    pub fn check_and_consume(&self, operation: &str) -> bool {
        self.consume(operation).is_ok()
    }

    pub fn usage_today(&self) -> DayUsage {
        self.usage_for(&self.today())
    }

    /// Usage recorded for a specific day; zeros if nothing was recorded.
    pub fn usage_for(&self, day: &DayKey) -> DayUsage {
        self.lock().usage.get(day).cloned().unwrap_or_default()
    }

    /// Units still available today.
    pub fn remaining(&self) -> u64 {
        let today = self.today();
        let state = self.lock();
        state.config.daily_limit.saturating_sub(state.used_on(&today))
    }

    /// Today's utilization as a percentage of the daily limit.
    pub fn usage_percentage(&self) -> f64 {
        let today = self.today();
        let state = self.lock();
        let limit = state.config.daily_limit;
        if limit == 0 {
            return 0.0;
        }
        state.used_on(&today) as f64 / limit as f64 * 100.0
    }

    /// Per-day usage for the trailing `days`-day window ending today.
    pub fn usage_report(&self, days: u32) -> BTreeMap<DayKey, DayUsage> {
        if days == 0 {
            return BTreeMap::new();
        }
        let today = self.today();
        let cutoff = today
            .date()
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(chrono::NaiveDate::MIN);
        self.lock()
            .usage
            .iter()
            .filter(|(day, _)| day.date() >= cutoff && day.date() <= today.date())
            .map(|(day, usage)| (*day, usage.clone()))
            .collect()
    }

    /// Update the daily limit. Takes effect on the next check or consume;
    /// usage already recorded is never rewritten.
    pub fn set_daily_limit(&self, limit: u64) {
        let mut state = self.lock();
        state.config.daily_limit = limit;
        self.persist_best_effort(&state);
    }

    fn today(&self) -> DayKey {
        DayKey::today(self.reset_offset)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().expect("quota ledger lock poisoned")
    }

    fn persist_best_effort(&self, state: &LedgerState) {
        if let Err(e) = self.ledger.save(state) {
            tracing::warn!(
                path = %self.ledger.path().display(),
                error = %e,
                "failed to persist quota ledger"
            );
        }
    }
}

impl std::fmt::Debug for QuotaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaManager")
            .field("path", &self.ledger.path())
            .field("daily_limit", &self.daily_limit())
            .finish()
    }
}

/// Builder for [`QuotaManager`]. All dependencies are injected here: the
/// storage path, the cost table, the reset offset, and the retention window.
pub struct QuotaManagerBuilder {
    path: Option<PathBuf>,
    daily_limit: u64,
    costs: CostTable,
    retention_days: u32,
    reset_offset_hours: i32,
}

impl Default for QuotaManagerBuilder {
    fn default() -> Self {
        Self {
            path: None,
            daily_limit: DEFAULT_DAILY_LIMIT,
            costs: CostTable::default(),
            retention_days: DEFAULT_RETENTION_DAYS,
            reset_offset_hours: DEFAULT_RESET_OFFSET_HOURS,
        }
    }
}

impl QuotaManagerBuilder {
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn daily_limit(mut self, limit: u64) -> Self {
        self.daily_limit = limit;
        self
    }

    pub fn costs(mut self, costs: CostTable) -> Self {
        self.costs = costs;
        self
    }

    pub fn retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Whole-hour UTC offset of the provider's daily reset boundary.
    pub fn reset_offset_hours(mut self, hours: i32) -> Self {
        self.reset_offset_hours = hours;
        self
    }

    /// Load the ledger (self-healing), prune expired days, and persist.
    /// Construction never fails: storage faults are logged and healed.
    pub fn build(self) -> QuotaManager {
        let ledger = QuotaLedger::new(
            self.path
                .unwrap_or_else(|| PathBuf::from("quota_usage.json")),
        );
        let offset = reset_offset(self.reset_offset_hours);

        let mut state = ledger.load(self.daily_limit);
        // The configured limit wins over whatever the file recorded; the
        // file's copy exists for external readers of the ledger.
        state.config.daily_limit = self.daily_limit;
        let removed = state.prune(self.retention_days, DayKey::today(offset));
        if removed > 0 {
            tracing::debug!(removed, "pruned expired quota ledger entries");
        }

        let manager = QuotaManager {
            ledger,
            costs: self.costs,
            reset_offset: offset,
            state: Mutex::new(state),
        };
        manager.persist_best_effort(&manager.lock());
        manager
    }
}
