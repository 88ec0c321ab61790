//! Synthetic device log history.
//!
//! Content is random on every run; only the shape is fixed. Each device gets 3..=15 entries per
//! day over the history window, the entry type is drawn with weights taken from the device's
//! health profile, and warnings/errors are resolved by a technician 70% of the time.

use chrono::{Days, Duration, NaiveDateTime, NaiveTime, Timelike};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Info,
    Warning,
    Error,
    Debug,
}

impl LogType {
    /// Order matches [`DeviceProfile::weights`].
    pub const ALL: [LogType; 4] = [LogType::Info, LogType::Warning, LogType::Error, LogType::Debug];

    pub fn as_str(self) -> &'static str {
        match self {
            LogType::Info => "info",
            LogType::Warning => "warning",
            LogType::Error => "error",
            LogType::Debug => "debug",
        }
    }

    pub fn severity_range(self) -> RangeInclusive<u8> {
        match self {
            LogType::Error => 7..=10,
            LogType::Warning => 4..=6,
            LogType::Info => 1..=3,
            LogType::Debug => 1..=1,
        }
    }

    fn is_resolvable(self) -> bool {
        matches!(self, LogType::Error | LogType::Warning)
    }

    fn templates(self) -> &'static [Template] {
        match self {
            LogType::Info => INFO_TEMPLATES,
            LogType::Warning => WARNING_TEMPLATES,
            LogType::Error => ERROR_TEMPLATES,
            LogType::Debug => DEBUG_TEMPLATES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProfile {
    ErrorProne,
    Maintenance,
    Healthy,
}

impl DeviceProfile {
    /// Relative weights for (info, warning, error, debug).
    pub fn weights(self) -> [u32; 4] {
        match self {
            DeviceProfile::ErrorProne => [25, 30, 35, 10],
            DeviceProfile::Maintenance => [35, 35, 15, 15],
            DeviceProfile::Healthy => [60, 20, 10, 10],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceProfile::ErrorProne => "error-prone",
            DeviceProfile::Maintenance => "maintenance",
            DeviceProfile::Healthy => "healthy",
        }
    }
}

/// Message template; `{value}` is replaced by a number drawn from `range`.
struct Template {
    text: &'static str,
    range: RangeInclusive<u32>,
}

const fn template(text: &'static str, lo: u32, hi: u32) -> Template {
    Template {
        text,
        range: lo..=hi,
    }
}

const VALUE_TOKEN: &str = "{value}";

const INFO_TEMPLATES: &[Template] = &[
    template("Heartbeat received, uptime {value} hours", 1, 720),
    template("Temperature reading nominal: {value}°C", 18, 30),
    template("Battery level at {value}%", 40, 100),
    template("Data sync completed, {value} records uploaded", 10, 500),
    template("Configuration check passed", 0, 0),
    template("Signal strength good: -{value} dBm", 40, 65),
];

const WARNING_TEMPLATES: &[Template] = &[
    template("Battery level low: {value}%", 10, 25),
    template("High temperature detected: {value}°C", 35, 45),
    template("Signal strength weak: -{value} dBm", 80, 95),
    template("Data sync delayed by {value} minutes", 5, 60),
    template("Memory usage high: {value}%", 80, 95),
];

const ERROR_TEMPLATES: &[Template] = &[
    template("Device unreachable for {value} minutes", 5, 180),
    template("Sensor read failure, error code E{value}", 100, 999),
    template("Critical temperature: {value}°C", 50, 80),
    template("Firmware checksum mismatch", 0, 0),
    template("Battery critical: {value}%", 1, 9),
];

const DEBUG_TEMPLATES: &[Template] = &[
    template("Debug: memory usage {value} KB", 256, 4096),
    template("Debug: polling interval set to {value} seconds", 5, 300),
    template("Debug: connection handshake took {value} ms", 10, 900),
];

const ERROR_RESOLUTIONS: &[&str] = &[
    "Device rebooted remotely; readings back to normal",
    "Replaced faulty sensor on site",
    "Firmware reflashed to the last stable release",
    "Power supply replaced",
];

const WARNING_RESOLUTIONS: &[&str] = &[
    "Battery replaced during scheduled visit",
    "Antenna repositioned to improve signal",
    "Ventilation cleared around the enclosure",
    "Threshold reviewed; no action required",
];

/// One generated `device_logs` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceLogRecord {
    pub device_id: i32,
    pub log_time: NaiveDateTime,
    pub log_type: LogType,
    pub message: String,
    pub severity_level: u8,
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<NaiveDateTime>,
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LogGenerator {
    device_ids: Vec<i32>,
    error_prone: Vec<i32>,
    maintenance: Vec<i32>,
    resolvers: Vec<i32>,
    history_days: u32,
    logs_per_day: RangeInclusive<u32>,
    resolution_probability: f64,
}

impl Default for LogGenerator {
    fn default() -> Self {
        Self {
            device_ids: (1..=18).collect(),
            error_prone: vec![3, 7, 12, 16],
            maintenance: vec![5, 9, 14],
            resolvers: vec![1, 2, 3, 4],
            history_days: 30,
            logs_per_day: 3..=15,
            resolution_probability: 0.70,
        }
    }
}

impl LogGenerator {
    /// Replaces the devices logs are generated for.
    pub fn with_device_ids(mut self, device_ids: Vec<i32>) -> Self {
        self.device_ids = device_ids;
        self
    }

    pub fn device_ids(&self) -> &[i32] {
        &self.device_ids
    }

    /// Upper bound of rows one [`generate`](Self::generate) call can produce.
    pub fn max_records(&self) -> usize {
        (self.history_days as usize + 1) * self.device_ids.len() * *self.logs_per_day.end() as usize
    }

    pub fn profile_of(&self, device_id: i32) -> DeviceProfile {
        if self.error_prone.contains(&device_id) {
            DeviceProfile::ErrorProne
        } else if self.maintenance.contains(&device_id) {
            DeviceProfile::Maintenance
        } else {
            DeviceProfile::Healthy
        }
    }

    /// History for every device over the window ending at `now` (today included).
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, now: NaiveDateTime) -> Vec<DeviceLogRecord> {
        let mut records = Vec::new();
        let today = now.date();

        for days_ago in (0..=self.history_days).rev() {
            let day_start = (today - Days::new(u64::from(days_ago))).and_time(NaiveTime::MIN);
            // today's entries stop at `now`
            let latest_offset = if days_ago == 0 {
                i64::from(now.num_seconds_from_midnight())
            } else {
                86_399
            };

            for &device_id in &self.device_ids {
                let count = rng.random_range(self.logs_per_day.clone());
                for _ in 0..count {
                    let log_time =
                        day_start + Duration::seconds(rng.random_range(0..=latest_offset));
                    records.push(self.generate_entry(rng, device_id, log_time));
                }
            }
        }

        records.sort_by_key(|r| r.log_time);
        records
    }

    /// A single entry for `device_id` at `log_time`.
    pub fn generate_entry<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        device_id: i32,
        log_time: NaiveDateTime,
    ) -> DeviceLogRecord {
        let log_type = pick_log_type(rng, self.profile_of(device_id).weights());
        let severity_level = rng.random_range(log_type.severity_range());
        let message = render_message(rng, log_type);

        let mut record = DeviceLogRecord {
            device_id,
            log_time,
            log_type,
            message,
            severity_level,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
        };

        if log_type.is_resolvable() && rng.random_bool(self.resolution_probability) {
            let notes = match log_type {
                LogType::Error => ERROR_RESOLUTIONS,
                _ => WARNING_RESOLUTIONS,
            };
            if let (Some(&resolver), Some(&note)) = (self.resolvers.choose(rng), notes.choose(rng)) {
                record.resolved_by = Some(resolver);
                record.resolved_at = Some(log_time + Duration::hours(rng.random_range(1..=24)));
                record.resolution_notes = Some(note.to_string());
            }
        }

        record
    }
}

fn pick_log_type<R: Rng + ?Sized>(rng: &mut R, weights: [u32; 4]) -> LogType {
    let total: u32 = weights.iter().sum();
    let mut roll = rng.random_range(0..total);
    for (log_type, weight) in LogType::ALL.into_iter().zip(weights) {
        if roll < weight {
            return log_type;
        }
        roll -= weight;
    }
    LogType::Info
}

fn render_message<R: Rng + ?Sized>(rng: &mut R, log_type: LogType) -> String {
    let Some(template) = log_type.templates().choose(rng) else {
        return log_type.as_str().to_string();
    };
    if !template.text.contains(VALUE_TOKEN) {
        return template.text.to_string();
    }
    let value = rng.random_range(template.range.clone());
    template.text.replace(VALUE_TOKEN, &value.to_string())
}
