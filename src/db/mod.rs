//! Database module: bootstrap engine for the IoT device-manager schema.
//!
//! Layout:
//! - `connection.rs`: memoised MySQL handle with server-level fallback
//! - `delimiter.rs`: `DELIMITER`-aware statement splitter
//! - `definitions.rs`: fixed catalogue of SQL definition files
//! - `sql_file.rs`: reads, substitutes and executes definition files
//! - `orchestrator.rs`: ordered schema creation and reset
//! - `inspector.rs`: catalog snapshots and table structure
//! - `sample_data.rs` / `log_generator.rs`: transactional seeding
//! - `actor.rs`: serialises every operation through one owner

pub mod actor;
pub mod connection;
pub mod definitions;
pub mod delimiter;
pub mod inspector;
pub mod log_generator;
pub mod orchestrator;
pub mod sample_data;
pub mod sql_file;

pub use actor::{AdminHandle, spawn};
pub use connection::{ConnectionProvider, test_connection};
pub use definitions::DefinitionCategory;
pub use log_generator::{DeviceLogRecord, DeviceProfile, LogGenerator, LogType};
pub use orchestrator::SchemaOrchestrator;
pub use sql_file::{DB_NAME_PLACEHOLDER, ExecutionMode, ExecutionReport, SqlFileExecutor, SqlSink};

use crate::error::AdminError;

/// True for identifiers made only of ASCII letters, digits, `_` and `$`.
pub fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Back-quotes an identifier that cannot be bound as a parameter.
pub fn quote_identifier(name: &str) -> Result<String, AdminError> {
    if !is_plain_identifier(name) {
        return Err(AdminError::InvalidName(name.to_string()));
    }
    Ok(format!("`{name}`"))
}
