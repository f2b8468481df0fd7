//! # pacct
//!
//! Reading and writing process-accounting logs in the Linux `acct(5)`
//! (`struct acct_v3`) format.
//!
//! ## Key Types
//!
//! - [`ScaledValue`]: the 16-bit `comp_t` encoding used for CPU and memory counters
//! - [`AccountingRecord`]: one fixed-size log entry
//! - [`AccountingLog`]: a log file opened as an array of records
//! - [`SystemParams`]: page size and clock tick rate used for unit conversion
//! - [`IdentityDirectory`]: user/group name resolution for the name accessors
//!
//! ## Example
//!
//! ```rust,no_run
//! use pacct::{AccountingLog, AccountingLogConfig, SystemParams};
//!
//! let config = AccountingLogConfig::with_params(SystemParams::from_host());
//! let mut log = AccountingLog::open("/var/log/account/pacct", "rb", config)?;
//!
//! for entry in log.entries()? {
//!     let (record, index) = entry?;
//!     println!("{index}: {} ({}s cpu)", record.command_name(), record.cpu_time());
//! }
//! # Ok::<(), pacct::PacctError>(())
//! ```

pub mod error;
pub mod identity;
pub mod log;
pub mod mode;
pub mod params;
pub mod record;
pub mod scaled;

pub use error::PacctError;
pub use identity::{IdentityDirectory, StaticDirectory};
#[cfg(unix)]
pub use identity::SystemDirectory;
pub use log::{AccountingLog, AccountingLogConfig, Entries};
pub use mode::OpenMode;
pub use params::SystemParams;
pub use record::{AccountingRecord, COMMAND_NAME_MAX, RECORD_SIZE};
pub use scaled::ScaledValue;
