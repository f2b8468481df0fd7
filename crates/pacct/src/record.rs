//! Accounting records
//!
//! One [`AccountingRecord`] is one `struct acct_v3` entry. The on-disk
//! layout is 64 bytes, little-endian:
//!
//! ```text
//!  0  ac_flag      u8        28  ac_etime    f32
//!  1  ac_version   u8        32  ac_utime    comp_t
//!  2  ac_tty       u16       34  ac_stime    comp_t
//!  4  ac_exitcode  i32       36  ac_mem      comp_t
//!  8  ac_uid       u32       38  ac_io       comp_t
//! 12  ac_gid       u32       40  ac_rw       comp_t
//! 16  ac_pid       u32       42  ac_minflt   comp_t
//! 20  ac_ppid      u32       44  ac_majflt   comp_t
//! 24  ac_btime     u32       46  ac_swaps    comp_t
//!                            48  ac_comm     [u8; 16]
//! ```

use chrono::{DateTime, Utc};

use crate::error::PacctError;
use crate::identity::IdentityDirectory;
use crate::params::SystemParams;
use crate::scaled::ScaledValue;

/// Size of one record on disk
pub const RECORD_SIZE: usize = 64;
/// Width of the command name field, terminator included
pub const COMMAND_NAME_LEN: usize = 16;
/// Longest command name that is stored without truncation
pub const COMMAND_NAME_MAX: usize = COMMAND_NAME_LEN - 1;
/// `ac_version` value written by Linux for this layout
pub const ACCT_VERSION: u8 = 3;

/// `ac_flag` bits
pub mod flags {
    /// Forked but did not exec
    pub const AFORK: u8 = 0x01;
    /// Used superuser privileges
    pub const ASU: u8 = 0x02;
    /// Dumped core
    pub const ACORE: u8 = 0x08;
    /// Killed by a signal
    pub const AXSIG: u8 = 0x10;
}

/// A single process-accounting entry.
///
/// Plain value: editing a record never touches a log until it is passed to
/// [`AccountingLog::write_entry`](crate::AccountingLog::write_entry).
#[derive(Debug, Clone, PartialEq)]
pub struct AccountingRecord {
    params: SystemParams,
    flag: u8,
    version: u8,
    tty: u16,
    exit_code: i32,
    user_id: u32,
    group_id: u32,
    process_id: u32,
    parent_process_id: u32,
    start_time: u32,
    wall_time: f32,
    user_time: ScaledValue,
    system_time: ScaledValue,
    average_memory: ScaledValue,
    // Counters without accessors, kept so kernel-written records round-trip
    chars_transferred: ScaledValue,
    blocks_transferred: ScaledValue,
    minor_faults: ScaledValue,
    major_faults: ScaledValue,
    swaps: ScaledValue,
    command: [u8; COMMAND_NAME_LEN],
}

impl AccountingRecord {
    /// A record with every field zeroed, ready to be filled in
    pub fn new_empty(params: SystemParams) -> Self {
        Self {
            params,
            flag: 0,
            version: ACCT_VERSION,
            tty: 0,
            exit_code: 0,
            user_id: 0,
            group_id: 0,
            process_id: 0,
            parent_process_id: 0,
            start_time: 0,
            wall_time: 0.0,
            user_time: ScaledValue::ZERO,
            system_time: ScaledValue::ZERO,
            average_memory: ScaledValue::ZERO,
            chars_transferred: ScaledValue::ZERO,
            blocks_transferred: ScaledValue::ZERO,
            minor_faults: ScaledValue::ZERO,
            major_faults: ScaledValue::ZERO,
            swaps: ScaledValue::ZERO,
            command: [0; COMMAND_NAME_LEN],
        }
    }

    /// Decode one on-disk block
    pub fn decode(bytes: &[u8; RECORD_SIZE], params: SystemParams) -> Self {
        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u32_at = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let scaled_at = |at: usize| ScaledValue::from_bits(u16_at(at));

        let mut command = [0u8; COMMAND_NAME_LEN];
        command.copy_from_slice(&bytes[48..64]);

        Self {
            params,
            flag: bytes[0],
            version: bytes[1],
            tty: u16_at(2),
            exit_code: u32_at(4) as i32,
            user_id: u32_at(8),
            group_id: u32_at(12),
            process_id: u32_at(16),
            parent_process_id: u32_at(20),
            start_time: u32_at(24),
            wall_time: f32::from_bits(u32_at(28)),
            user_time: scaled_at(32),
            system_time: scaled_at(34),
            average_memory: scaled_at(36),
            chars_transferred: scaled_at(38),
            blocks_transferred: scaled_at(40),
            minor_faults: scaled_at(42),
            major_faults: scaled_at(44),
            swaps: scaled_at(46),
            command,
        }
    }

    /// Encode into one on-disk block
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0] = self.flag;
        buf[1] = self.version;
        buf[2..4].copy_from_slice(&self.tty.to_le_bytes());
        buf[4..8].copy_from_slice(&self.exit_code.to_le_bytes());
        buf[8..12].copy_from_slice(&self.user_id.to_le_bytes());
        buf[12..16].copy_from_slice(&self.group_id.to_le_bytes());
        buf[16..20].copy_from_slice(&self.process_id.to_le_bytes());
        buf[20..24].copy_from_slice(&self.parent_process_id.to_le_bytes());
        buf[24..28].copy_from_slice(&self.start_time.to_le_bytes());
        buf[28..32].copy_from_slice(&self.wall_time.to_le_bytes());

        let scaled = [
            self.user_time,
            self.system_time,
            self.average_memory,
            self.chars_transferred,
            self.blocks_transferred,
            self.minor_faults,
            self.major_faults,
            self.swaps,
        ];
        for (i, value) in scaled.iter().enumerate() {
            let at = 32 + i * 2;
            buf[at..at + 2].copy_from_slice(&value.to_bits().to_le_bytes());
        }

        buf[48..64].copy_from_slice(&self.command);
        buf
    }

    /// Parameters used for tick and page conversions
    pub fn params(&self) -> SystemParams {
        self.params
    }

    /// Process ID (`ac_pid`)
    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    /// Set the process ID
    pub fn set_process_id(&mut self, pid: u32) {
        self.process_id = pid;
    }

    /// Parent process ID (`ac_ppid`)
    pub fn parent_process_id(&self) -> u32 {
        self.parent_process_id
    }

    /// Set the parent process ID
    pub fn set_parent_process_id(&mut self, ppid: u32) {
        self.parent_process_id = ppid;
    }

    /// Real user ID
    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    /// Set the real user ID
    pub fn set_user_id(&mut self, uid: u32) {
        self.user_id = uid;
    }

    /// Real group ID
    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    /// Set the real group ID
    pub fn set_group_id(&mut self, gid: u32) {
        self.group_id = gid;
    }

    /// Resolve the user ID to a name
    pub fn user_name<D>(&self, directory: &D) -> Result<String, PacctError>
    where
        D: IdentityDirectory + ?Sized,
    {
        directory
            .user_name(self.user_id)
            .ok_or_else(|| PacctError::identity(format!("no user with ID {}", self.user_id)))
    }

    /// Set the user ID from a name
    pub fn set_user_name<D>(&mut self, directory: &D, name: &str) -> Result<(), PacctError>
    where
        D: IdentityDirectory + ?Sized,
    {
        self.user_id = directory
            .user_id(name)
            .ok_or_else(|| PacctError::identity(format!("no user named {name:?}")))?;
        Ok(())
    }

    /// Resolve the group ID to a name
    pub fn group_name<D>(&self, directory: &D) -> Result<String, PacctError>
    where
        D: IdentityDirectory + ?Sized,
    {
        directory
            .group_name(self.group_id)
            .ok_or_else(|| PacctError::identity(format!("no group with ID {}", self.group_id)))
    }

    /// Set the group ID from a name
    pub fn set_group_name<D>(&mut self, directory: &D, name: &str) -> Result<(), PacctError>
    where
        D: IdentityDirectory + ?Sized,
    {
        self.group_id = directory
            .group_id(name)
            .ok_or_else(|| PacctError::identity(format!("no group named {name:?}")))?;
        Ok(())
    }

    /// Command name up to the first NUL
    pub fn command_name(&self) -> String {
        let end = self
            .command
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(COMMAND_NAME_LEN);
        String::from_utf8_lossy(&self.command[..end]).into_owned()
    }

    /// Store a command name.
    ///
    /// Longer names are cut to [`COMMAND_NAME_MAX`] bytes; the last byte of
    /// the field is always NUL.
    pub fn set_command_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(COMMAND_NAME_MAX);
        self.command = [0; COMMAND_NAME_LEN];
        self.command[..len].copy_from_slice(&bytes[..len]);
    }

    /// User CPU time in whole seconds
    pub fn user_time(&self) -> u64 {
        self.user_time.decode() / self.params.ticks_per_second()
    }

    /// Set user CPU time from whole seconds
    pub fn set_user_time(&mut self, seconds: u64) {
        self.user_time = self.ticks(seconds);
    }

    /// System CPU time in whole seconds
    pub fn system_time(&self) -> u64 {
        self.system_time.decode() / self.params.ticks_per_second()
    }

    /// Set system CPU time from whole seconds
    pub fn set_system_time(&mut self, seconds: u64) {
        self.system_time = self.ticks(seconds);
    }

    /// User plus system CPU time in whole seconds
    pub fn cpu_time(&self) -> u64 {
        (self.user_time.decode() + self.system_time.decode()) / self.params.ticks_per_second()
    }

    /// Raw user time word
    pub fn user_time_raw(&self) -> ScaledValue {
        self.user_time
    }

    /// Store a user time word as is, in clock ticks
    pub fn set_user_time_raw(&mut self, value: ScaledValue) {
        self.user_time = value;
    }

    /// Raw system time word
    pub fn system_time_raw(&self) -> ScaledValue {
        self.system_time
    }

    /// Store a system time word as is, in clock ticks
    pub fn set_system_time_raw(&mut self, value: ScaledValue) {
        self.system_time = value;
    }

    /// Elapsed wall-clock time in seconds
    pub fn wall_time(&self) -> f64 {
        self.wall_time as f64
    }

    /// Set wall time. Stored as a 32-bit float.
    pub fn set_wall_time(&mut self, seconds: f64) {
        self.wall_time = seconds as f32;
    }

    /// Process start time
    pub fn start_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.start_time as i64, 0).unwrap_or_default()
    }

    /// Set the start time. Clamped to the 32-bit epoch range.
    pub fn set_start_time(&mut self, time: DateTime<Utc>) {
        self.start_time = time.timestamp().clamp(0, u32::MAX as i64) as u32;
    }

    /// Start time as stored, in epoch seconds
    pub fn start_time_raw(&self) -> u32 {
        self.start_time
    }

    /// Set the start time in epoch seconds
    pub fn set_start_time_raw(&mut self, epoch_seconds: u32) {
        self.start_time = epoch_seconds;
    }

    /// Average memory use in kilobytes
    pub fn average_memory(&self) -> u64 {
        self.average_memory.decode() * 1024 / self.params.page_size()
    }

    /// Set average memory use from kilobytes
    pub fn set_average_memory(&mut self, kilobytes: u64) {
        let pages = kilobytes.saturating_mul(self.params.page_size()) / 1024;
        self.average_memory = ScaledValue::encode(pages);
    }

    /// Raw average memory word, in pages
    pub fn average_memory_raw(&self) -> ScaledValue {
        self.average_memory
    }

    /// Store an average memory word as is, in pages
    pub fn set_average_memory_raw(&mut self, value: ScaledValue) {
        self.average_memory = value;
    }

    /// Exit status as reported by `wait(2)`
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Set the exit status
    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = code;
    }

    /// `ac_flag` bits, see [`flags`]
    pub fn flags(&self) -> u8 {
        self.flag
    }

    /// Replace the `ac_flag` bits
    pub fn set_flags(&mut self, flag: u8) {
        self.flag = flag;
    }

    /// `ac_version` byte
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Controlling terminal device number
    pub fn tty(&self) -> u16 {
        self.tty
    }

    fn ticks(&self, seconds: u64) -> ScaledValue {
        ScaledValue::encode(seconds.saturating_mul(self.params.ticks_per_second()))
    }
}
