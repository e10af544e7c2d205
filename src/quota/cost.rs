//! Per-operation quota costs.
//!
//! Providers charge a fixed number of quota units per operation name.
//! Costs can be customized programmatically via the builder.

use std::collections::HashMap;

/// Cost charged for operations not present in the table.
pub const DEFAULT_OPERATION_COST: u64 = 1;

/// Immutable mapping from operation name to cost in quota units.
#[derive(Debug, Clone)]
pub struct CostTable {
    operations: HashMap<String, u64>,
    default: u64,
}

impl CostTable {
    pub fn builder() -> CostTableBuilder {
        CostTableBuilder::new()
    }

    /// Cost table for the YouTube Data API v3 operations this crate's users
    /// call most often.
    pub fn youtube_defaults() -> Self {
        Self::builder()
            .operation("search.list", 100)
            .operation("videos.list", 1)
            .operation("videos.insert", 1600)
            .operation("channels.list", 1)
            .operation("playlistItems.list", 1)
            .operation("commentThreads.list", 1)
            .operation("captions.list", 50)
            .operation("captions.download", 200)
            .build()
    }

    pub fn cost(&self, operation: &str) -> u64 {
        self.operations
            .get(operation)
            .copied()
            .unwrap_or(self.default)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            operations: HashMap::new(),
            default: DEFAULT_OPERATION_COST,
        }
    }
}

#[derive(Debug, Default)]
pub struct CostTableBuilder {
    operations: HashMap<String, u64>,
    default: Option<u64>,
}

impl CostTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, name: impl Into<String>, units: u64) -> Self {
        self.operations.insert(name.into(), units);
        self
    }

    /// Cost charged for operations not listed explicitly.
    pub fn default_cost(mut self, units: u64) -> Self {
        self.default = Some(units);
        self
    }

    pub fn build(self) -> CostTable {
        CostTable {
            operations: self.operations,
            default: self.default.unwrap_or(DEFAULT_OPERATION_COST),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_operation_defaults_to_one() {
        let table = CostTable::default();
        assert_eq!(table.cost("anything.at.all"), 1);
    }

    #[test]
    fn test_builder_overrides() {
        let table = CostTable::builder()
            .operation("search.list", 100)
            .operation("videos.list", 1)
            .build();

        assert_eq!(table.cost("search.list"), 100);
        assert_eq!(table.cost("videos.list"), 1);
        assert_eq!(table.cost("channels.list"), 1); // default
    }

    #[test]
    fn test_custom_default_cost() {
        let table = CostTable::builder().default_cost(5).build();
        assert_eq!(table.cost("unlisted"), 5);
    }

    #[test]
    fn test_youtube_defaults() {
        let table = CostTable::youtube_defaults();
        assert_eq!(table.cost("search.list"), 100);
        assert_eq!(table.cost("videos.insert"), 1600);
        assert_eq!(table.cost("videos.list"), 1);
        assert!(!table.is_empty());
    }
}
