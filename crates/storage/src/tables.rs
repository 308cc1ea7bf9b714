use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use tracing::{info, warn};

use shared::domain::{Table, DEFAULT_CUSTOMER_NAME};

/// Read-only table directory, read from disk once at startup.
#[derive(Clone, Default)]
pub struct TableDirectory {
    tables: Arc<Vec<Table>>,
}

impl TableDirectory {
    pub fn from_tables(tables: Vec<Table>) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Loads the directory from a JSON array of tables. A missing or corrupt
    /// file leaves the directory empty so order creation keeps working with
    /// the generic customer name.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match read_tables(path) {
            Ok(tables) => {
                info!(path = %path.display(), count = tables.len(), "table directory loaded");
                Self::from_tables(tables)
            }
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = ?error,
                    "table directory unavailable; continuing with no known tables"
                );
                Self::default()
            }
        }
    }

    pub fn all(&self) -> Vec<Table> {
        self.tables.as_ref().clone()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn find_by_number(&self, table_number: i64) -> Option<&Table> {
        self.tables
            .iter()
            .find(|table| table.table_number == table_number)
    }

    /// Customer name for an order placed against `table`, which clients send
    /// as free text. Anything that doesn't name a known table with a
    /// non-empty customer gets the generic label.
    pub fn customer_name_for(&self, table: &str) -> String {
        table
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|number| self.find_by_number(number))
            .map(|table| table.customer_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_CUSTOMER_NAME)
            .to_string()
    }
}

fn read_tables(path: &Path) -> anyhow::Result<Vec<Table>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read table file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse table file '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/tables_tests.rs"]
mod tests;
