//! Host parameters used to convert raw record units
//!
//! CPU times are stored in clock ticks and memory in pages. Both conversion
//! factors come from the host. They are read once by the caller and passed
//! into every record explicitly.

use tracing::warn;

use crate::error::PacctError;

/// Page size and clock tick rate used by the record accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemParams {
    page_size: u64,
    ticks_per_second: u64,
}

impl Default for SystemParams {
    fn default() -> Self {
        Self {
            page_size: 4096,
            ticks_per_second: 100,
        }
    }
}

impl SystemParams {
    /// Build from explicit values. Both must be non-zero.
    pub fn new(page_size: u64, ticks_per_second: u64) -> Result<Self, PacctError> {
        if page_size == 0 {
            return Err(PacctError::InvalidParams("page size must be non-zero".into()));
        }
        if ticks_per_second == 0 {
            return Err(PacctError::InvalidParams(
                "ticks per second must be non-zero".into(),
            ));
        }
        Ok(Self {
            page_size,
            ticks_per_second,
        })
    }

    /// Query the running host via `sysconf`.
    ///
    /// Falls back to the default for any value the host does not report.
    pub fn from_host() -> Self {
        let defaults = Self::default();
        Self {
            page_size: host_value(sys::page_size(), "page size", defaults.page_size),
            ticks_per_second: host_value(
                sys::ticks_per_second(),
                "clock ticks",
                defaults.ticks_per_second,
            ),
        }
    }

    /// Bytes per memory page
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// CPU clock ticks per second
    pub fn ticks_per_second(&self) -> u64 {
        self.ticks_per_second
    }

    /// Set the page size (builder style)
    pub fn with_page_size(self, page_size: u64) -> Result<Self, PacctError> {
        Self::new(page_size, self.ticks_per_second)
    }

    /// Set the tick rate (builder style)
    pub fn with_ticks_per_second(self, ticks_per_second: u64) -> Result<Self, PacctError> {
        Self::new(self.page_size, ticks_per_second)
    }
}

fn host_value(reported: Option<u64>, what: &str, fallback: u64) -> u64 {
    match reported {
        Some(value) if value > 0 => value,
        _ => {
            warn!(parameter = what, fallback, "Host did not report value, using default");
            fallback
        }
    }
}

#[cfg(unix)]
mod sys {
    fn sysconf(name: libc::c_int) -> Option<u64> {
        // SAFETY: sysconf has no memory-safety preconditions.
        let value = unsafe { libc::sysconf(name) };
        u64::try_from(value).ok()
    }

    pub fn page_size() -> Option<u64> {
        sysconf(libc::_SC_PAGESIZE)
    }

    pub fn ticks_per_second() -> Option<u64> {
        sysconf(libc::_SC_CLK_TCK)
    }
}

#[cfg(not(unix))]
mod sys {
    pub fn page_size() -> Option<u64> {
        None
    }

    pub fn ticks_per_second() -> Option<u64> {
        None
    }
}
