pub mod response;
pub mod status;
pub mod structure;

pub use response::{ApiResponse, ConnectionTestResult, OperationReport, SetupReport};
pub use status::{SchemaStatus, TableInfo};
pub use structure::{ColumnInfo, ForeignKeyInfo, IndexInfo, TableStructure};
