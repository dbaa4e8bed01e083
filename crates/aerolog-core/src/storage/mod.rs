//! Removable storage: the medium abstraction and the session that owns it
//!
//! The medium may disappear at any moment (card pulled) and come back later.
//! [`StorageSession`] turns every medium failure into an `Unmounted` state
//! and recovers through periodic remount polling, never through an
//! insertion interrupt.

pub mod sdmmc;
pub mod session;

pub use session::*;

use thiserror_no_std::Error;

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, read only.
    Read,
    /// Create, or append to an existing file.
    Append,
}

/// Raw block-level filesystem access to a removable medium.
///
/// Handles are plain tokens; every handle returned by [`StorageMedium::open`]
/// must be passed to [`StorageMedium::close`] exactly once.
pub trait StorageMedium {
    type Handle: Copy;
    type Error: core::fmt::Debug;

    /// Initialize the medium at the given bus clock.
    fn mount(&mut self, speed_hz: u32) -> Result<(), Self::Error>;

    /// Release the medium. Safe to call when not mounted.
    fn unmount(&mut self);

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::Handle, Self::Error>;

    /// Size of an open file in bytes.
    fn file_len(&mut self, file: Self::Handle) -> Result<u32, Self::Error>;

    fn write(&mut self, file: Self::Handle, bytes: &[u8]) -> Result<(), Self::Error>;

    fn close(&mut self, file: Self::Handle) -> Result<(), Self::Error>;
}

/// Whether the session currently trusts the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Mounted,
    Unmounted,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage medium is not mounted")]
    NotMounted,
    #[error("storage medium failed to mount")]
    Mount,
    #[error("failed to open log file")]
    Open,
    #[error("failed to write log file")]
    Write,
}
