//! Human and JSON renderings of accounting records

use chrono::{DateTime, Utc};
use pacct::{AccountingRecord, IdentityDirectory};
use serde::Serialize;

/// A record with its units converted, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    pub index: u64,
    pub process_id: u32,
    pub command: String,
    pub user_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub group_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub wall_time_secs: f64,
    pub user_time_secs: u64,
    pub system_time_secs: u64,
    pub average_memory_kb: u64,
    pub exit_code: i32,
}

impl EntrySummary {
    /// Summarize a record. Names are resolved only when a directory is given;
    /// IDs without a directory entry are left unnamed.
    pub fn new(
        record: &AccountingRecord,
        index: u64,
        directory: Option<&dyn IdentityDirectory>,
    ) -> Self {
        let (user_name, group_name) = match directory {
            Some(dir) => (record.user_name(dir).ok(), record.group_name(dir).ok()),
            None => (None, None),
        };

        Self {
            index,
            process_id: record.process_id(),
            command: record.command_name(),
            user_id: record.user_id(),
            user_name,
            group_id: record.group_id(),
            group_name,
            start_time: record.start_time(),
            wall_time_secs: record.wall_time(),
            user_time_secs: record.user_time(),
            system_time_secs: record.system_time(),
            average_memory_kb: record.average_memory(),
            exit_code: record.exit_code(),
        }
    }

    /// One line of fixed-width text
    pub fn to_line(&self) -> String {
        let user = self
            .user_name
            .clone()
            .unwrap_or_else(|| self.user_id.to_string());
        let group = self
            .group_name
            .clone()
            .unwrap_or_else(|| self.group_id.to_string());

        format!(
            "{:>6} {:>7} {:<15} {:<8} {:<8} {} {:>8.2}s {:>5}s {:>5}s {:>8}K {:>4}",
            self.index,
            self.process_id,
            self.command,
            user,
            group,
            self.start_time.format("%Y-%m-%d %H:%M:%S"),
            self.wall_time_secs,
            self.user_time_secs,
            self.system_time_secs,
            self.average_memory_kb,
            self.exit_code,
        )
    }
}
