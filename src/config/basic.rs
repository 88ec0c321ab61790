use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// HTTP server listen address (e.g., "0.0.0.0", "127.0.0.1").
    /// TOML: `basic.listen_addr`. Default: `0.0.0.0`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// HTTP server listen port.
    /// TOML: `basic.listen_port`. Default: `8080`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Root of the SQL definition tree (`tables/`, `views/`, `demo_data/`, ...).
    /// TOML: `basic.sql_root`. Default: `sql`.
    #[serde(default = "default_sql_root")]
    pub sql_root: PathBuf,

    /// JSON file holding the persisted MySQL connection record.
    /// TOML: `basic.connection_file`. Default: `config/database.json`.
    #[serde(default = "default_connection_file")]
    pub connection_file: PathBuf,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            loglevel: default_loglevel(),
            sql_root: default_sql_root(),
            connection_file: default_connection_file(),
        }
    }
}

/// Default IP address for the HTTP server listen address.
fn default_listen_ip() -> IpAddr {
    Ipv4Addr::new(0, 0, 0, 0).into()
}

/// Default port for the HTTP server.
fn default_listen_port() -> u16 {
    8080
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_sql_root() -> PathBuf {
    PathBuf::from("sql")
}

fn default_connection_file() -> PathBuf {
    PathBuf::from("config/database.json")
}
