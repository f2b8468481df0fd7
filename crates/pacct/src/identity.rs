//! User and group name resolution
//!
//! Records only store numeric IDs. Name-based accessors on
//! [`AccountingRecord`](crate::AccountingRecord) go through an
//! [`IdentityDirectory`], which is either the host's passwd/group database
//! ([`SystemDirectory`]) or a fixed in-memory table ([`StaticDirectory`]).

use std::collections::BTreeMap;

/// Lookup service mapping numeric user/group IDs to names and back
pub trait IdentityDirectory {
    /// Name of the user with this ID
    fn user_name(&self, uid: u32) -> Option<String>;

    /// ID of the user with this name
    fn user_id(&self, name: &str) -> Option<u32>;

    /// Name of the group with this ID
    fn group_name(&self, gid: u32) -> Option<String>;

    /// ID of the group with this name
    fn group_id(&self, name: &str) -> Option<u32>;
}

/// Fixed user and group tables
///
/// Useful for tests and for generating synthetic logs that should not
/// depend on the accounts present on the current machine.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: BTreeMap<u32, String>,
    groups: BTreeMap<u32, String>,
}

impl StaticDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user entry
    pub fn with_user(mut self, uid: u32, name: impl Into<String>) -> Self {
        self.users.insert(uid, name.into());
        self
    }

    /// Add a group entry
    pub fn with_group(mut self, gid: u32, name: impl Into<String>) -> Self {
        self.groups.insert(gid, name.into());
        self
    }
}

impl IdentityDirectory for StaticDirectory {
    fn user_name(&self, uid: u32) -> Option<String> {
        self.users.get(&uid).cloned()
    }

    fn user_id(&self, name: &str) -> Option<u32> {
        self.users
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(&uid, _)| uid)
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        self.groups.get(&gid).cloned()
    }

    fn group_id(&self, name: &str) -> Option<u32> {
        self.groups
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(&gid, _)| gid)
    }
}

#[cfg(unix)]
pub use system::SystemDirectory;

#[cfg(unix)]
mod system {
    use std::ffi::{CStr, CString};
    use std::mem::MaybeUninit;
    use std::ptr;

    use super::IdentityDirectory;

    const INITIAL_BUFFER: usize = 1024;
    const MAX_BUFFER: usize = 1 << 20;

    /// The host's passwd and group databases, via the reentrant libc calls
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemDirectory;

    impl SystemDirectory {
        /// A directory backed by the host's user and group databases
        pub fn new() -> Self {
            Self
        }
    }

    /// Run one of the `get*_r` functions, growing the scratch buffer on ERANGE.
    fn with_entry<T, R>(
        mut call: impl FnMut(*mut T, *mut libc::c_char, libc::size_t, *mut *mut T) -> libc::c_int,
        read: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        let mut buf: Vec<libc::c_char> = vec![0; INITIAL_BUFFER];
        loop {
            let mut entry = MaybeUninit::<T>::uninit();
            let mut result: *mut T = ptr::null_mut();
            let rc = call(entry.as_mut_ptr(), buf.as_mut_ptr(), buf.len(), &mut result);

            if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
                let len = buf.len() * 2;
                buf.resize(len, 0);
                continue;
            }
            if rc != 0 || result.is_null() {
                return None;
            }

            // SAFETY: on success `result` points at `entry`, and its string
            // fields point into `buf`, both of which are still alive.
            return Some(read(unsafe { &*result }));
        }
    }

    fn owned(name: *const libc::c_char) -> String {
        // SAFETY: the libc entry's name fields are NUL-terminated.
        unsafe { CStr::from_ptr(name) }
            .to_string_lossy()
            .into_owned()
    }

    impl IdentityDirectory for SystemDirectory {
        fn user_name(&self, uid: u32) -> Option<String> {
            with_entry(
                // SAFETY: all pointers are valid for the duration of the call.
                |pwd: *mut libc::passwd, buf, len, result| unsafe {
                    libc::getpwuid_r(uid as libc::uid_t, pwd, buf, len, result)
                },
                |pwd: &libc::passwd| owned(pwd.pw_name),
            )
        }

        fn user_id(&self, name: &str) -> Option<u32> {
            let name = CString::new(name).ok()?;
            with_entry(
                // SAFETY: all pointers are valid for the duration of the call.
                |pwd: *mut libc::passwd, buf, len, result| unsafe {
                    libc::getpwnam_r(name.as_ptr(), pwd, buf, len, result)
                },
                |pwd: &libc::passwd| pwd.pw_uid as u32,
            )
        }

        fn group_name(&self, gid: u32) -> Option<String> {
            with_entry(
                // SAFETY: all pointers are valid for the duration of the call.
                |grp: *mut libc::group, buf, len, result| unsafe {
                    libc::getgrgid_r(gid as libc::gid_t, grp, buf, len, result)
                },
                |grp: &libc::group| owned(grp.gr_name),
            )
        }

        fn group_id(&self, name: &str) -> Option<u32> {
            let name = CString::new(name).ok()?;
            with_entry(
                // SAFETY: all pointers are valid for the duration of the call.
                |grp: *mut libc::group, buf, len, result| unsafe {
                    libc::getgrnam_r(name.as_ptr(), grp, buf, len, result)
                },
                |grp: &libc::group| grp.gr_gid as u32,
            )
        }
    }
}
