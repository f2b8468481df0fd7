//! Synthetic accounting logs for testing downstream collectors

use chrono::{DateTime, Utc};
use pacct::{AccountingLog, IdentityDirectory, PacctError};
use rand::Rng;
use tracing::info;

/// Seconds between the end times of consecutive generated records
pub const END_TIME_STEP: i64 = 20;

/// 2012-01-01T00:00:00Z
const DEFAULT_BASE_TIME: i64 = 1_325_376_000;

/// What to generate
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Number of records
    pub count: u32,
    /// User names, one picked at random per record
    pub users: Vec<String>,
    /// Group names, one picked at random per record
    pub groups: Vec<String>,
    /// End time of record 0; record `i` ends `i * END_TIME_STEP` seconds later
    pub base_time: DateTime<Utc>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            count: 1000,
            users: vec!["root".to_string()],
            groups: vec!["root".to_string()],
            base_time: DateTime::from_timestamp(DEFAULT_BASE_TIME, 0).unwrap_or_default(),
        }
    }
}

/// Append `options.count` random records to `log`, returning how many were written.
///
/// Every record runs the command `test` with PID 1, 2, ... and has a wall
/// time under 20 s, CPU time under 10 s, 800-1049 KB of memory and exit
/// code 0 or 1.
pub fn generate<R: Rng + ?Sized>(
    log: &mut AccountingLog,
    options: &GenerateOptions,
    directory: &dyn IdentityDirectory,
    rng: &mut R,
) -> Result<u64, PacctError> {
    if options.users.is_empty() || options.groups.is_empty() {
        return Err(PacctError::identity("no user or group names to choose from"));
    }

    let mut written = 0;
    for i in 1..=options.count {
        let mut record = log.new_record();
        record.set_command_name("test");
        record.set_process_id(i);

        let user = &options.users[rng.random_range(0..options.users.len())];
        let group = &options.groups[rng.random_range(0..options.groups.len())];
        record.set_user_name(directory, user)?;
        record.set_group_name(directory, group)?;

        let end_time = options.base_time + chrono::Duration::seconds(i as i64 * END_TIME_STEP);
        let wall_time: u32 = rng.random_range(0..20);
        let cpu_time: u64 = rng.random_range(0..10);
        record.set_start_time(end_time - chrono::Duration::seconds(wall_time as i64));
        record.set_wall_time(wall_time as f64);
        record.set_user_time(cpu_time);
        record.set_average_memory(rng.random_range(800..1050));
        record.set_exit_code(rng.random_range(0..2));

        log.write_entry(&record)?;
        written += 1;
    }

    info!(records = written, path = %log.path().display(), "Generated synthetic records");
    Ok(written)
}
