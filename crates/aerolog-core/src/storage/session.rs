//! Mount state machine for the removable log medium

use log::{debug, info, warn};

use super::{MountState, OpenMode, StorageError, StorageMedium};
use crate::config::StorageConfig;
use crate::record::{HEADER, LINE_ENDING};

/// Owns the medium and its mount state.
///
/// ```text
/// Unmounted --mount ok--> Mounted
/// Mounted --open/write/close fails--> Unmounted
/// ```
///
/// Records are appended at most once: a record that hits a fault is dropped,
/// there is no retry queue.
pub struct StorageSession<'a, M: StorageMedium> {
    medium: M,
    config: StorageConfig<'a>,
    state: MountState,
}

impl<'a, M: StorageMedium> StorageSession<'a, M> {
    pub fn new(medium: M, config: StorageConfig<'a>) -> Self {
        Self {
            medium,
            config,
            state: MountState::Unmounted,
        }
    }

    pub fn state(&self) -> MountState {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.state == MountState::Mounted
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    pub fn medium_mut(&mut self) -> &mut M {
        &mut self.medium
    }

    /// Mount the medium if it is not already mounted, then make sure the log
    /// file carries its header.
    pub fn ensure_mounted(&mut self) -> Result<(), StorageError> {
        if self.is_mounted() {
            return Ok(());
        }

        // Clear whatever a pulled card left behind before re-initializing.
        self.medium.unmount();

        if let Err(e) = self.medium.mount(self.config.speed_hz) {
            debug!("Storage mount failed: {:?}", e);
            return Err(StorageError::Mount);
        }

        self.state = MountState::Mounted;
        info!("Storage mounted at {} Hz", self.config.speed_hz);

        if let Err(e) = self.ensure_header() {
            warn!("Could not verify log header: {}", e);
        }

        Ok(())
    }

    /// Write the column header if the log file is missing or empty.
    ///
    /// Returns `Ok(true)` when a header was written and `Ok(false)` when the
    /// file already had content.
    pub fn ensure_header(&mut self) -> Result<bool, StorageError> {
        if !self.is_mounted() {
            return Err(StorageError::NotMounted);
        }

        let path = self.config.log_path;

        let is_empty = match self.medium.open(path, OpenMode::Read) {
            Ok(file) => {
                let len = self.medium.file_len(file);
                self.close_quietly(file);
                match len {
                    Ok(len) => len == 0,
                    Err(e) => {
                        debug!("Could not size {}: {:?}", path, e);
                        return Err(StorageError::Open);
                    }
                }
            }
            // Missing, or unreadable right now
            Err(_) => true,
        };

        if !is_empty {
            return Ok(false);
        }

        // Append, so a read fault on a non-empty log cannot truncate it
        let file = self.medium.open(path, OpenMode::Append).map_err(|e| {
            debug!("Could not create {}: {:?}", path, e);
            StorageError::Open
        })?;

        let written = self.write_line(file, HEADER);
        let closed = self.medium.close(file);
        written?;
        closed.map_err(|e| {
            debug!("Could not close {}: {:?}", path, e);
            StorageError::Write
        })?;

        info!("Log header written to {}", path);
        Ok(true)
    }

    /// Append one line to the log file.
    ///
    /// Any open, write or close failure drops the record and moves the
    /// session to `Unmounted`. The handle is closed on every path.
    pub fn append_record(&mut self, line: &str) -> Result<(), StorageError> {
        if !self.is_mounted() {
            return Err(StorageError::NotMounted);
        }

        let file = match self.medium.open(self.config.log_path, OpenMode::Append) {
            Ok(file) => file,
            Err(e) => {
                warn!("Log file open failed: {:?}", e);
                self.fault();
                return Err(StorageError::Open);
            }
        };

        let written = self.write_line(file, line);
        let closed = self.medium.close(file);

        if let Err(e) = written {
            self.fault();
            return Err(e);
        }
        if let Err(e) = closed {
            warn!("Log file close failed: {:?}", e);
            self.fault();
            return Err(StorageError::Write);
        }

        debug!("Logged: {}", line);
        Ok(())
    }

    /// Periodic hot-swap check. Only acts while unmounted.
    ///
    /// Returns `true` when this call brought the medium back.
    pub fn poll_remount(&mut self) -> bool {
        if self.is_mounted() {
            return false;
        }

        match self.ensure_mounted() {
            Ok(()) => {
                info!("Storage re-inserted and mounted");
                true
            }
            Err(_) => false,
        }
    }

    fn write_line(&mut self, file: M::Handle, line: &str) -> Result<(), StorageError> {
        self.medium
            .write(file, line.as_bytes())
            .and_then(|()| self.medium.write(file, LINE_ENDING.as_bytes()))
            .map_err(|e| {
                warn!("Log write failed: {:?}", e);
                StorageError::Write
            })
    }

    fn close_quietly(&mut self, file: M::Handle) {
        if let Err(e) = self.medium.close(file) {
            debug!("Ignoring close failure: {:?}", e);
        }
    }

    fn fault(&mut self) {
        self.state = MountState::Unmounted;
        self.medium.unmount();
        warn!("Storage fault, medium unmounted");
    }
}
