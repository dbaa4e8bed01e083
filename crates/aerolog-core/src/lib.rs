//! Hardware-independent control core for aerolog
//!
//! This crate contains all platform-agnostic logic for the aerolog telemetry
//! station: the cooperative multi-rate scheduler, the removable-storage
//! session, the wall-clock time authority, the air-signal smoothing filter,
//! and the collaborator traits the board implements.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod app_state;
pub mod clock;
pub mod config;
pub mod display;
pub mod filter;
pub mod network;
pub mod record;
pub mod scheduler;
pub mod sensors;
pub mod startup;
pub mod storage;
pub mod time_authority;

#[cfg(test)]
pub(crate) mod testing;
