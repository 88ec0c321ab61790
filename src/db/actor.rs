use crate::config::{ConfigStore, ConnectionConfig, ConnectionPatch};
use crate::db::definitions::{DefinitionCategory, TABLE_FILES};
use crate::db::log_generator::LogGenerator;
use crate::db::orchestrator::SchemaOrchestrator;
use crate::db::sql_file::ExecutionReport;
use crate::db::test_connection;
use crate::error::AdminError;
use crate::utils::logging::debug_pretty_json;
use iot_admin_schema::{
    ConnectionTestResult, OperationReport, SchemaStatus, SetupReport, TableStructure,
};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug)]
pub enum AdminMessage {
    /// Catalog snapshot; never fails.
    GetStatus(RpcReplyPort<SchemaStatus>),

    TableStructure(String, RpcReplyPort<Result<TableStructure, AdminError>>),

    /// One stored definition with the database name substituted.
    Definition(
        DefinitionCategory,
        String,
        RpcReplyPort<Result<String, AdminError>>,
    ),

    /// All definitions of a category, banner separated.
    BulkDefinitions(DefinitionCategory, RpcReplyPort<Result<String, AdminError>>),

    CreateDatabase(RpcReplyPort<OperationReport>),
    CreateTables(RpcReplyPort<OperationReport>),
    InsertSampleData(RpcReplyPort<OperationReport>),

    /// Drop the database and start over with a fresh orchestrator.
    ResetDatabase(RpcReplyPort<OperationReport>),

    /// Run only the bootstrap steps the current status says are missing.
    SetupAll(RpcReplyPort<SetupReport>),

    /// Current connection record, password masked.
    GetConfig(RpcReplyPort<ConnectionConfig>),

    UpdateConfig(
        ConnectionPatch,
        RpcReplyPort<Result<ConnectionConfig, AdminError>>,
    ),

    /// Handshake with the patch applied over the current record; nothing is persisted.
    TestConnection(ConnectionPatch, RpcReplyPort<ConnectionTestResult>),
}

#[derive(Clone)]
pub struct AdminHandle {
    actor: ActorRef<AdminMessage>,
}

impl AdminHandle {
    pub async fn status(&self) -> Result<SchemaStatus, AdminError> {
        ractor::call!(self.actor, AdminMessage::GetStatus)
            .map_err(|e| AdminError::Actor(format!("AdminActor GetStatus RPC failed: {e}")))
    }

    pub async fn table_structure(&self, table: String) -> Result<TableStructure, AdminError> {
        ractor::call!(self.actor, AdminMessage::TableStructure, table).map_err(|e| {
            AdminError::Actor(format!("AdminActor TableStructure RPC failed: {e}"))
        })?
    }

    pub async fn definition(
        &self,
        category: DefinitionCategory,
        name: String,
    ) -> Result<String, AdminError> {
        ractor::call!(self.actor, AdminMessage::Definition, category, name)
            .map_err(|e| AdminError::Actor(format!("AdminActor Definition RPC failed: {e}")))?
    }

    pub async fn bulk_definitions(&self, category: DefinitionCategory) -> Result<String, AdminError> {
        ractor::call!(self.actor, AdminMessage::BulkDefinitions, category).map_err(|e| {
            AdminError::Actor(format!("AdminActor BulkDefinitions RPC failed: {e}"))
        })?
    }

    pub async fn create_database(&self) -> Result<OperationReport, AdminError> {
        ractor::call!(self.actor, AdminMessage::CreateDatabase)
            .map_err(|e| AdminError::Actor(format!("AdminActor CreateDatabase RPC failed: {e}")))
    }

    pub async fn create_tables(&self) -> Result<OperationReport, AdminError> {
        ractor::call!(self.actor, AdminMessage::CreateTables)
            .map_err(|e| AdminError::Actor(format!("AdminActor CreateTables RPC failed: {e}")))
    }

    pub async fn insert_sample_data(&self) -> Result<OperationReport, AdminError> {
        ractor::call!(self.actor, AdminMessage::InsertSampleData).map_err(|e| {
            AdminError::Actor(format!("AdminActor InsertSampleData RPC failed: {e}"))
        })
    }

    pub async fn reset_database(&self) -> Result<OperationReport, AdminError> {
        ractor::call!(self.actor, AdminMessage::ResetDatabase)
            .map_err(|e| AdminError::Actor(format!("AdminActor ResetDatabase RPC failed: {e}")))
    }

    pub async fn setup_all(&self) -> Result<SetupReport, AdminError> {
        ractor::call!(self.actor, AdminMessage::SetupAll)
            .map_err(|e| AdminError::Actor(format!("AdminActor SetupAll RPC failed: {e}")))
    }

    pub async fn config(&self) -> Result<ConnectionConfig, AdminError> {
        ractor::call!(self.actor, AdminMessage::GetConfig)
            .map_err(|e| AdminError::Actor(format!("AdminActor GetConfig RPC failed: {e}")))
    }

    pub async fn update_config(&self, patch: ConnectionPatch) -> Result<ConnectionConfig, AdminError> {
        ractor::call!(self.actor, AdminMessage::UpdateConfig, patch)
            .map_err(|e| AdminError::Actor(format!("AdminActor UpdateConfig RPC failed: {e}")))?
    }

    pub async fn test_connection(
        &self,
        patch: ConnectionPatch,
    ) -> Result<ConnectionTestResult, AdminError> {
        ractor::call!(self.actor, AdminMessage::TestConnection, patch)
            .map_err(|e| AdminError::Actor(format!("AdminActor TestConnection RPC failed: {e}")))
    }
}

struct AdminState {
    store: ConfigStore,
    sql_root: PathBuf,
    orchestrator: SchemaOrchestrator,
    generator: LogGenerator,
}

struct AdminActor;

#[ractor::async_trait]
impl Actor for AdminActor {
    type Msg = AdminMessage;
    type State = AdminState;
    type Arguments = (ConfigStore, PathBuf);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let (store, sql_root) = args;
        let config = store
            .load()
            .map_err(|e| ActorProcessingErr::from(format!("connection record: {e}")))?;

        info!(
            host = %config.host,
            port = config.port,
            db_name = %config.db_name,
            sql_root = %sql_root.display(),
            record = %store.path().display(),
            "AdminActor initialized"
        );
        Ok(AdminState {
            orchestrator: SchemaOrchestrator::new(config, sql_root.clone()),
            store,
            sql_root,
            generator: LogGenerator::default(),
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.orchestrator.close().await;
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            AdminMessage::GetStatus(reply) => {
                let status = state.orchestrator.status().await;
                debug_pretty_json("schema status", &status);
                let _ = reply.send(status);
            }
            AdminMessage::TableStructure(table, reply) => {
                let res = state.orchestrator.table_structure(&table).await;
                let _ = reply.send(res);
            }
            AdminMessage::Definition(category, name, reply) => {
                let res = state.orchestrator.definition(category, &name).await;
                let _ = reply.send(res);
            }
            AdminMessage::BulkDefinitions(category, reply) => {
                let res = state.orchestrator.bulk_definitions(category).await;
                let _ = reply.send(res);
            }
            AdminMessage::CreateDatabase(reply) => {
                let res = state.create_database(&mut Vec::new()).await;
                let _ = reply.send(res);
            }
            AdminMessage::CreateTables(reply) => {
                let res = state.create_tables(&mut Vec::new()).await;
                let _ = reply.send(res);
            }
            AdminMessage::InsertSampleData(reply) => {
                let res = state.insert_sample_data(&mut Vec::new()).await;
                let _ = reply.send(res);
            }
            AdminMessage::ResetDatabase(reply) => {
                let res = state.reset_database().await;
                let _ = reply.send(res);
            }
            AdminMessage::SetupAll(reply) => {
                let res = state.setup_all().await;
                let _ = reply.send(res);
            }
            AdminMessage::GetConfig(reply) => {
                let _ = reply.send(state.orchestrator.config().masked());
            }
            AdminMessage::UpdateConfig(patch, reply) => {
                let res = state.update_config(patch).await;
                let _ = reply.send(res);
            }
            AdminMessage::TestConnection(patch, reply) => {
                let res = state.test_connection(patch).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl AdminState {
    fn db_name(&self) -> &str {
        &self.orchestrator.config().db_name
    }

    async fn create_database(&mut self, logs: &mut Vec<String>) -> OperationReport {
        match self.orchestrator.create_database().await {
            Ok(reports) => {
                logs.extend(report_lines(&reports));
                logs.push(format!("Database `{}` created", self.db_name()));
                OperationReport::succeeded("Database created successfully", std::mem::take(logs))
            }
            Err(e) => failed_step("Failed to create database", e, logs),
        }
    }

    async fn create_tables(&mut self, logs: &mut Vec<String>) -> OperationReport {
        match self.orchestrator.create_tables().await {
            Ok(reports) => {
                logs.extend(report_lines(&reports));
                logs.push("Tables and advanced objects created".to_string());
                OperationReport::succeeded("Tables created successfully", std::mem::take(logs))
            }
            Err(e) => failed_step("Failed to create tables", e, logs),
        }
    }

    async fn create_advanced_objects(&mut self, logs: &mut Vec<String>) -> OperationReport {
        match self.orchestrator.create_advanced_objects().await {
            Ok(reports) => {
                logs.extend(report_lines(&reports));
                logs.push("Views, routines, indexes and triggers created".to_string());
                OperationReport::succeeded("Advanced objects created", std::mem::take(logs))
            }
            Err(e) => failed_step("Failed to create advanced objects", e, logs),
        }
    }

    async fn insert_sample_data(&mut self, logs: &mut Vec<String>) -> OperationReport {
        match self.orchestrator.insert_sample_data(&self.generator).await {
            Ok(summary) => {
                logs.extend(summary.log_lines());
                OperationReport::succeeded("Sample data inserted successfully", std::mem::take(logs))
            }
            Err(e) => failed_step("Failed to insert sample data", e, logs),
        }
    }

    async fn reset_database(&mut self) -> OperationReport {
        let mut logs = Vec::new();
        let db_name = self.db_name().to_string();
        let dropped = self.orchestrator.drop_database().await;

        // the old handle and config are discarded whether or not the drop worked
        let config = match self.store.load() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "reloading connection record failed; keeping current values");
                logs.push(format!("Could not reload configuration: {e}"));
                self.orchestrator.config().clone()
            }
        };
        self.orchestrator.close().await;
        self.orchestrator = SchemaOrchestrator::new(config, self.sql_root.clone());

        match dropped {
            Ok(()) => {
                logs.push(format!("Database `{db_name}` dropped"));
                OperationReport::succeeded("Database reset successfully", logs)
            }
            Err(e) => failed_step("Failed to reset database", e, &mut logs),
        }
    }

    async fn setup_all(&mut self) -> SetupReport {
        let mut logs = Vec::new();

        let status = self.orchestrator.status().await;
        if !status.connected {
            logs.push("Cannot connect to the MySQL server; check the connection settings".to_string());
            return SetupReport { success: false, logs };
        }

        if status.database_exists {
            logs.push(format!("Database `{}` already exists, skipping", self.db_name()));
        } else {
            let report = self.create_database(&mut logs).await;
            logs = report.logs;
            if !report.success {
                return SetupReport { success: false, logs };
            }
        }

        let status = self.orchestrator.status().await;
        let missing: Vec<&str> = TABLE_FILES
            .iter()
            .copied()
            .filter(|t| !status.has_table(t))
            .collect();

        if !missing.is_empty() {
            logs.push(format!("Missing tables: {}", missing.join(", ")));
            let report = self.create_tables(&mut logs).await;
            logs = report.logs;
            if !report.success {
                return SetupReport { success: false, logs };
            }
        } else if status.views.is_empty() {
            logs.push("All tables exist but no views were found".to_string());
            let report = self.create_advanced_objects(&mut logs).await;
            logs = report.logs;
            if !report.success {
                return SetupReport { success: false, logs };
            }
        } else {
            logs.push("All tables already exist, skipping".to_string());
        }

        let status = self.orchestrator.status().await;
        let empty = |table: &str| status.row_count(table).unwrap_or(0) == 0;
        if empty("users") && empty("device_logs") {
            let report = self.insert_sample_data(&mut logs).await;
            logs = report.logs;
            if !report.success {
                return SetupReport { success: false, logs };
            }
        } else {
            logs.push("Tables already contain data, skipping sample data".to_string());
        }

        logs.push("Setup completed".to_string());
        info!(db_name = %self.db_name(), "setup completed");
        SetupReport { success: true, logs }
    }

    async fn update_config(&mut self, patch: ConnectionPatch) -> Result<ConnectionConfig, AdminError> {
        let config = self.store.update(patch)?;
        self.orchestrator.close().await;
        self.orchestrator = SchemaOrchestrator::new(config.clone(), self.sql_root.clone());
        Ok(config.masked())
    }

    async fn test_connection(&self, patch: ConnectionPatch) -> ConnectionTestResult {
        let (candidate, mut violations) = self.orchestrator.config().with_patch(patch);
        violations.extend(candidate.validate().errors);
        if !violations.is_empty() {
            return ConnectionTestResult {
                success: false,
                message: format!("Invalid connection parameters: {}", violations.join("; ")),
            };
        }
        test_connection(&candidate).await
    }
}

fn report_lines(reports: &[ExecutionReport]) -> Vec<String> {
    reports.iter().flat_map(ExecutionReport::log_lines).collect()
}

fn failed_step(what: &str, err: AdminError, logs: &mut Vec<String>) -> OperationReport {
    warn!(error = %err, "{what}");
    logs.push(format!("{what}: {err}"));
    OperationReport::failed(format!("{what}: {err}"), std::mem::take(logs))
}

/// Spawn the admin actor and return a cloneable handle.
pub async fn spawn(store: ConfigStore, sql_root: PathBuf) -> Result<AdminHandle, AdminError> {
    let (actor, _jh) = Actor::spawn(None, AdminActor, (store, sql_root))
        .await
        .map_err(|e| AdminError::Actor(format!("failed to spawn AdminActor: {e}")))?;

    Ok(AdminHandle { actor })
}
