//! Engine configuration.

use crate::EngineResult;
use serde::{Deserialize, Serialize};

/// Engine configuration.
///
/// Deserialized from camelCase keys; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Run each top-level mutation inside one store transaction.
    pub wrap_mutations_in_transaction: bool,
    /// Sibling batch loads run concurrently up to this limit; 0 or 1 is sequential.
    pub max_eager_load_concurrency: usize,
    /// Pivot order column for many-to-many relations that declare none.
    pub default_pivot_order_column: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wrap_mutations_in_transaction: true,
            max_eager_load_concurrency: 4,
            default_pivot_order_column: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_wrap_mutations(mut self, wrap: bool) -> Self {
        self.wrap_mutations_in_transaction = wrap;
        self
    }

    pub fn with_max_eager_load_concurrency(mut self, limit: usize) -> Self {
        self.max_eager_load_concurrency = limit;
        self
    }

    pub fn with_default_pivot_order_column(mut self, column: impl Into<String>) -> Self {
        self.default_pivot_order_column = Some(column.into());
        self
    }

    /// Sequential loading, everything else default.
    pub fn sequential() -> Self {
        Self::default().with_max_eager_load_concurrency(1)
    }
}
