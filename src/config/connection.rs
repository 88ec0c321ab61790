//! Persisted MySQL connection record and its store.
//!
//! The record lives in a small JSON document (see `basic.connection_file`). It is created with
//! defaults on first use, and every update is validated as a whole before it is written back.

use crate::error::AdminError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Current on-disk format version of the connection record.
pub const CONFIG_VERSION: u32 = 1;

const PASSWORD_MASK: &str = "********";

const OPT_SSL_MODE: &str = "ssl_mode";
const OPT_STATEMENT_CACHE: &str = "statement_cache_capacity";
const OPT_CONNECT_TIMEOUT: &str = "connect_timeout_secs";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub db_name: String,
    pub charset: String,
    /// Driver attributes by name. Known keys: `ssl_mode`, `statement_cache_capacity`,
    /// `connect_timeout_secs`; anything else is carried along untouched.
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let mut options = BTreeMap::new();
        options.insert(OPT_SSL_MODE.to_string(), Value::from("preferred"));
        options.insert(OPT_STATEMENT_CACHE.to_string(), Value::from(100));
        options.insert(OPT_CONNECT_TIMEOUT.to_string(), Value::from(5));

        Self {
            version: CONFIG_VERSION,
            host: "localhost".to_string(),
            port: 3306,
            username: "root".to_string(),
            password: String::new(),
            db_name: "iot_device_manager".to_string(),
            charset: "utf8".to_string(),
            options,
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// Partial update of a [`ConnectionConfig`]; `None` keeps the current value.
///
/// `port` is deliberately wider than `u16` so out-of-range input is reported as a
/// validation violation instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConnectionPatch {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub db_name: Option<String>,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub options: Option<BTreeMap<String, Value>>,
}

impl From<ConnectionConfig> for ConnectionPatch {
    fn from(cfg: ConnectionConfig) -> Self {
        Self {
            host: Some(cfg.host),
            port: Some(i64::from(cfg.port)),
            username: Some(cfg.username),
            password: Some(cfg.password),
            db_name: Some(cfg.db_name),
            charset: Some(cfg.charset),
            options: Some(cfg.options),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslModeOption {
    Disabled,
    Preferred,
    Required,
    VerifyCa,
    VerifyIdentity,
}

impl SslModeOption {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "disabled" => Some(Self::Disabled),
            "preferred" => Some(Self::Preferred),
            "required" => Some(Self::Required),
            "verify_ca" => Some(Self::VerifyCa),
            "verify_identity" => Some(Self::VerifyIdentity),
            _ => None,
        }
    }
}

impl ConnectionConfig {
    /// Checks every constraint and reports all violations at once.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();

        if self.host.trim().is_empty() {
            errors.push("host must not be empty".to_string());
        }
        if self.port == 0 {
            errors.push(port_violation(0));
        }
        if self.username.trim().is_empty() {
            errors.push("username must not be empty".to_string());
        }
        if self.db_name.trim().is_empty() {
            errors.push("db_name must not be empty".to_string());
        } else if !crate::db::is_plain_identifier(&self.db_name) {
            errors.push("db_name may only contain letters, digits, '_' and '$'".to_string());
        }
        if self.charset.trim().is_empty() {
            errors.push("charset must not be empty".to_string());
        }
        if self.version != CONFIG_VERSION {
            errors.push(format!(
                "unsupported config version {} (expected {CONFIG_VERSION})",
                self.version
            ));
        }
        errors.extend(self.option_violations());

        ValidationReport::from_errors(errors)
    }

    /// Applies `patch` on top of `self`, returning the candidate and the violations that could
    /// not be represented in it (an out-of-range port keeps the previous value).
    pub fn with_patch(&self, patch: ConnectionPatch) -> (ConnectionConfig, Vec<String>) {
        let mut violations = Vec::new();
        let mut next = self.clone();

        if let Some(host) = patch.host {
            next.host = host;
        }
        if let Some(port) = patch.port {
            match u16::try_from(port) {
                Ok(port) => next.port = port,
                Err(_) => violations.push(port_violation(port)),
            }
        }
        if let Some(username) = patch.username {
            next.username = username;
        }
        // the mask comes back when a client echoes a fetched record
        if let Some(password) = patch.password.filter(|p| p != PASSWORD_MASK) {
            next.password = password;
        }
        if let Some(db_name) = patch.db_name {
            next.db_name = db_name;
        }
        if let Some(charset) = patch.charset {
            next.charset = charset;
        }
        if let Some(options) = patch.options {
            next.options = options;
        }

        (next, violations)
    }

    /// Copy suitable for display; the password is replaced when set.
    pub fn masked(&self) -> ConnectionConfig {
        let mut masked = self.clone();
        if !masked.password.is_empty() {
            masked.password = PASSWORD_MASK.to_string();
        }
        masked
    }

    pub fn ssl_mode(&self) -> Option<SslModeOption> {
        self.options
            .get(OPT_SSL_MODE)
            .and_then(Value::as_str)
            .and_then(SslModeOption::parse)
    }

    pub fn statement_cache_capacity(&self) -> Option<usize> {
        self.options
            .get(OPT_STATEMENT_CACHE)
            .and_then(Value::as_u64)
            .and_then(|v| usize::try_from(v).ok())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.options
            .get(OPT_CONNECT_TIMEOUT)
            .and_then(Value::as_u64)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    fn option_violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (key, value) in &self.options {
            match key.as_str() {
                OPT_SSL_MODE => {
                    if value.as_str().and_then(SslModeOption::parse).is_none() {
                        errors.push(format!(
                            "options.{OPT_SSL_MODE} must be one of disabled, preferred, required, verify_ca, verify_identity"
                        ));
                    }
                }
                OPT_STATEMENT_CACHE => {
                    if value.as_u64().is_none() {
                        errors.push(format!(
                            "options.{OPT_STATEMENT_CACHE} must be a non-negative integer"
                        ));
                    }
                }
                OPT_CONNECT_TIMEOUT => {
                    if !value.as_u64().is_some_and(|secs| secs > 0) {
                        errors.push(format!(
                            "options.{OPT_CONNECT_TIMEOUT} must be a positive integer"
                        ));
                    }
                }
                other => debug!(option = other, "ignoring unknown connection option"),
            }
        }
        errors
    }
}

fn port_violation(port: i64) -> String {
    format!("port must be between 1 and 65535 (got {port})")
}

/// File-backed store for the [`ConnectionConfig`] record.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted record, writing the defaults first when none exists yet.
    pub fn load(&self) -> Result<ConnectionConfig, AdminError> {
        if !self.path.exists() {
            let defaults = ConnectionConfig::default();
            self.save(&defaults)?;
            info!(path = %self.path.display(), "connection record not found; wrote defaults");
            return Ok(defaults);
        }

        let contents =
            fs::read_to_string(&self.path).map_err(|e| AdminError::io(&self.path, e))?;
        let cfg: ConnectionConfig = serde_json::from_str(&contents).map_err(|e| {
            AdminError::Config(format!(
                "{} is not a valid connection record: {e}",
                self.path.display()
            ))
        })?;

        let report = cfg.validate();
        if !report.valid {
            return Err(AdminError::Config(format!(
                "{} holds invalid values: {}",
                self.path.display(),
                report.errors.join("; ")
            )));
        }
        Ok(cfg)
    }

    /// Merges `patch` into the persisted record, validates the result, then persists it.
    pub fn update(&self, patch: ConnectionPatch) -> Result<ConnectionConfig, AdminError> {
        let current = self.load()?;
        let (next, mut violations) = current.with_patch(patch);
        violations.extend(next.validate().errors);
        if !violations.is_empty() {
            return Err(AdminError::Validation(violations));
        }

        self.save(&next)?;
        info!(
            path = %self.path.display(),
            host = %next.host,
            port = next.port,
            db_name = %next.db_name,
            "connection record updated"
        );
        Ok(next)
    }

    /// Writes the record through a sibling temp file so readers never see a torn document.
    pub fn save(&self, cfg: &ConnectionConfig) -> Result<(), AdminError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AdminError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(cfg)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| AdminError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| AdminError::io(&self.path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port_patch(port: i64) -> ConnectionPatch {
        ConnectionPatch {
            port: Some(port),
            ..Default::default()
        }
    }

    fn violations_for(patch: ConnectionPatch) -> Vec<String> {
        let (next, mut violations) = ConnectionConfig::default().with_patch(patch);
        violations.extend(next.validate().errors);
        violations
    }

    #[test]
    fn default_record_is_valid() {
        let report = ConnectionConfig::default().validate();
        assert!(report.valid, "unexpected violations: {:?}", report.errors);
    }

    #[test]
    fn port_bounds_are_inclusive() {
        assert!(violations_for(port_patch(1)).is_empty());
        assert!(violations_for(port_patch(65535)).is_empty());

        for bad in [0, 65536, -1] {
            let violations = violations_for(port_patch(bad));
            assert_eq!(violations.len(), 1, "port {bad}: {violations:?}");
            assert!(violations[0].starts_with("port must be between 1 and 65535"));
        }
    }

    #[test]
    fn all_violations_are_accumulated() {
        let violations = violations_for(ConnectionPatch {
            host: Some("  ".to_string()),
            port: Some(0),
            username: Some(String::new()),
            db_name: Some(String::new()),
            ..Default::default()
        });

        assert_eq!(violations.len(), 4, "{violations:?}");
        assert!(violations.iter().any(|v| v.starts_with("host")));
        assert!(violations.iter().any(|v| v.starts_with("port")));
        assert!(violations.iter().any(|v| v.starts_with("username")));
        assert!(violations.iter().any(|v| v.starts_with("db_name")));
    }

    #[test]
    fn db_name_must_be_a_plain_identifier() {
        let violations = violations_for(ConnectionPatch {
            db_name: Some("iot`; DROP".to_string()),
            ..Default::default()
        });
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("db_name may only contain"));
    }

    #[test]
    fn known_options_are_type_checked() {
        let mut options = BTreeMap::new();
        options.insert("ssl_mode".to_string(), Value::from("sometimes"));
        options.insert("connect_timeout_secs".to_string(), Value::from(0));
        options.insert("vendor_flag".to_string(), Value::from(true));

        let violations = violations_for(ConnectionPatch {
            options: Some(options),
            ..Default::default()
        });
        assert_eq!(violations.len(), 2, "{violations:?}");
    }

    #[test]
    fn masked_hides_only_non_empty_passwords() {
        let mut cfg = ConnectionConfig::default();
        assert_eq!(cfg.masked().password, "");
        cfg.password = "secret".to_string();
        assert_eq!(cfg.masked().password, PASSWORD_MASK);
    }

    #[test]
    fn echoed_mask_keeps_stored_password() {
        let mut cfg = ConnectionConfig::default();
        cfg.password = "hunter2".to_string();

        let (next, violations) = cfg.with_patch(ConnectionPatch::from(cfg.masked()));
        assert!(violations.is_empty());
        assert_eq!(next.password, "hunter2");

        let (next, _) = cfg.with_patch(ConnectionPatch {
            password: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(next.password, "");
    }

    #[test]
    fn option_accessors_read_defaults() {
        let cfg = ConnectionConfig::default();
        assert_eq!(cfg.ssl_mode(), Some(SslModeOption::Preferred));
        assert_eq!(cfg.statement_cache_capacity(), Some(100));
        assert_eq!(cfg.connect_timeout(), Some(Duration::from_secs(5)));
    }
}
