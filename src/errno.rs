//! POSIX error codes returned by the VFS Adapter (C9).
//!
//! The kernel FUSE binding is out of scope, but the adapter still speaks in
//! negative-errno terms so whatever binding is wired up on top only needs to
//! negate [`Errno::raw`] before handing it back to the kernel.

use std::fmt;

/// A POSIX error code, stored as the positive `errno` value.
///
/// `as_negative()` gives the convention VFS callbacks are documented in:
/// negative errno on failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Errno(i32);

impl Errno {
    pub const ENOENT: Errno = Errno(libc::ENOENT);
    pub const EEXIST: Errno = Errno(libc::EEXIST);
    pub const ENOTDIR: Errno = Errno(libc::ENOTDIR);
    pub const EISDIR: Errno = Errno(libc::EISDIR);
    pub const ENOTEMPTY: Errno = Errno(libc::ENOTEMPTY);
    pub const EINVAL: Errno = Errno(libc::EINVAL);
    pub const EIO: Errno = Errno(libc::EIO);
    pub const ENAMETOOLONG: Errno = Errno(libc::ENAMETOOLONG);

    /// Raw positive errno value.
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Value to hand a FUSE-style callback expecting negative errno.
    pub fn as_negative(self) -> i32 {
        -self.0
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "errno {}", self.0)
    }
}

impl std::error::Error for Errno {}

/// Result type threaded through the Namespace Mirror and VFS Adapter.
pub type VfsResult<T> = std::result::Result<T, Errno>;
