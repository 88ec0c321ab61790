use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Point-in-time snapshot of the managed schema.
///
/// Recomputed on every request; an unreachable server yields
/// [`SchemaStatus::disconnected`] rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchemaStatus {
    pub connected: bool,
    pub database_exists: bool,
    pub tables: BTreeSet<String>,
    pub views: BTreeSet<String>,
    pub procedures: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    #[serde(default)]
    pub triggers: BTreeSet<String>,
    /// Details for the known tables present in `tables`.
    #[serde(default)]
    pub tables_info: BTreeMap<String, TableInfo>,
}

impl SchemaStatus {
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Connected, but the named schema is absent.
    pub fn without_database() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains(name)
    }

    pub fn row_count(&self, table: &str) -> Option<i64> {
        self.tables_info.get(table).map(|info| info.row_count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TableInfo {
    pub row_count: i64,
    pub column_count: i64,
    /// Human readable, e.g. `"0.05 MB"` or `"< 0.01 MB"`.
    pub size: String,
    /// `YYYY-MM-DD HH:MM`, absent when the engine does not report it.
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_snapshot_serializes_empty_lists() {
        let value = serde_json::to_value(SchemaStatus::disconnected()).expect("serialize");
        assert_eq!(value["connected"], false);
        assert_eq!(value["database_exists"], false);
        assert_eq!(value["tables"], serde_json::json!([]));
        assert_eq!(value["views"], serde_json::json!([]));
        assert_eq!(value["procedures"], serde_json::json!([]));
        assert_eq!(value["functions"], serde_json::json!([]));
    }
}
