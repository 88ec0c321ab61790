use serde::{Deserialize, Serialize};

/// Uniform envelope returned by every HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(default = "none")]
    pub data: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Outcome of one bootstrap step (create database, create tables, seed, reset).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OperationReport {
    pub success: bool,
    pub message: String,
    pub logs: Vec<String>,
}

impl OperationReport {
    pub fn succeeded(message: impl Into<String>, logs: Vec<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            logs,
        }
    }

    pub fn failed(message: impl Into<String>, logs: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            logs,
        }
    }
}

/// Result of the conditional full bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SetupReport {
    pub success: bool,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}
