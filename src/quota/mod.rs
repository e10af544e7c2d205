//! Daily quota accounting: operation costs, day bucketing, the durable
//! ledger, and the budget-enforcing manager.

mod cost;
mod day;
mod ledger;
mod manager;

pub use cost::{CostTable, CostTableBuilder, DEFAULT_OPERATION_COST};
pub use day::{DEFAULT_RESET_OFFSET_HOURS, DayKey, reset_offset};
pub use ledger::{DEFAULT_RETENTION_DAYS, DayUsage, LedgerConfig, LedgerState, QuotaLedger};
pub use manager::{DEFAULT_DAILY_LIMIT, QuotaManager, QuotaManagerBuilder};
