//! Fixed catalogue of the SQL definition tree.
//!
//! Every list below is an ordering contract, not a discovery result: tables are listed so that
//! foreign-key targets exist before the tables that reference them.

use serde::{Deserialize, Serialize};

/// Top-level file creating the database itself.
pub const DATABASE_FILE: &str = "create_database.sql";

pub const TABLE_FILES: &[&str] = &[
    "users",
    "device_types",
    "locations",
    "devices",
    "deployments",
    "device_logs",
];

pub const VIEW_FILES: &[&str] = &[
    "v_device_overview",
    "v_active_deployments",
    "v_device_log_summary",
];

pub const FUNCTION_FILES: &[&str] = &["fn_device_health_score", "fn_days_since_deployment"];

pub const PROCEDURE_FILES: &[&str] = &["sp_device_report", "sp_resolve_log", "sp_location_summary"];

pub const INDEX_FILES: &[&str] = &["performance_indexes"];

pub const TRIGGER_FILES: &[&str] = &["trg_devices_audit"];

/// Reference rows, seeded in this order before synthetic logs.
pub const DEMO_DATA_FILES: &[&str] = &["users", "device_types", "locations", "devices", "deployments"];

/// Advanced objects, created after the tables in this order.
pub const ADVANCED_OBJECT_ORDER: &[DefinitionCategory] = &[
    DefinitionCategory::View,
    DefinitionCategory::Function,
    DefinitionCategory::Procedure,
    DefinitionCategory::Index,
    DefinitionCategory::Trigger,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionCategory {
    Database,
    Table,
    View,
    Procedure,
    Function,
    Index,
    Trigger,
    DemoData,
}

impl DefinitionCategory {
    /// Subdirectory under the SQL root; `None` for the top-level database file.
    pub fn directory(self) -> Option<&'static str> {
        match self {
            DefinitionCategory::Database => None,
            DefinitionCategory::Table => Some("tables"),
            DefinitionCategory::View => Some("views"),
            DefinitionCategory::Procedure => Some("procedures"),
            DefinitionCategory::Function => Some("functions"),
            DefinitionCategory::Index => Some("indexes"),
            DefinitionCategory::Trigger => Some("triggers"),
            DefinitionCategory::DemoData => Some("demo_data"),
        }
    }

    pub fn files(self) -> &'static [&'static str] {
        match self {
            DefinitionCategory::Database => &["create_database"],
            DefinitionCategory::Table => TABLE_FILES,
            DefinitionCategory::View => VIEW_FILES,
            DefinitionCategory::Procedure => PROCEDURE_FILES,
            DefinitionCategory::Function => FUNCTION_FILES,
            DefinitionCategory::Index => INDEX_FILES,
            DefinitionCategory::Trigger => TRIGGER_FILES,
            DefinitionCategory::DemoData => DEMO_DATA_FILES,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DefinitionCategory::Database => "database",
            DefinitionCategory::Table => "table",
            DefinitionCategory::View => "view",
            DefinitionCategory::Procedure => "procedure",
            DefinitionCategory::Function => "function",
            DefinitionCategory::Index => "index",
            DefinitionCategory::Trigger => "trigger",
            DefinitionCategory::DemoData => "demo data",
        }
    }

    /// Parses a URL segment; both singular and plural forms are accepted.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "database" | "databases" => Some(DefinitionCategory::Database),
            "table" | "tables" => Some(DefinitionCategory::Table),
            "view" | "views" => Some(DefinitionCategory::View),
            "procedure" | "procedures" => Some(DefinitionCategory::Procedure),
            "function" | "functions" => Some(DefinitionCategory::Function),
            "index" | "indexes" => Some(DefinitionCategory::Index),
            "trigger" | "triggers" => Some(DefinitionCategory::Trigger),
            "demo_data" | "demo-data" => Some(DefinitionCategory::DemoData),
            _ => None,
        }
    }

    /// Categories whose files are meant to be read back as one document.
    pub fn supports_bulk(self) -> bool {
        matches!(
            self,
            DefinitionCategory::Procedure
                | DefinitionCategory::Function
                | DefinitionCategory::Trigger
        )
    }

    /// Path of `name` relative to the SQL root, if `name` belongs to this category.
    pub fn relative_path(self, name: &str) -> Option<String> {
        if !self.files().contains(&name) {
            return None;
        }
        Some(match self.directory() {
            Some(dir) => format!("{dir}/{name}.sql"),
            None => DATABASE_FILE.to_string(),
        })
    }
}
