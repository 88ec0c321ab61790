use serde::{Deserialize, Serialize};

/// Catalog description of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TableStructure {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub indexes: Vec<IndexInfo>,
    pub row_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    /// Full column type as declared, e.g. `enum('info','warning')`.
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<i64>,
    pub numeric_precision: Option<i64>,
    pub numeric_scale: Option<i64>,
    /// `PRI`, `UNI`, `MUL` or empty.
    pub key: String,
    pub extra: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ForeignKeyInfo {
    pub constraint_name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub update_rule: String,
    pub delete_rule: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub column: String,
    pub seq_in_index: i64,
    pub unique: bool,
    pub index_type: String,
}
