//! Hand-written collaborators for unit tests

use core::cell::Cell;

use embedded_hal::delay::DelayNs;
use std::collections::BTreeMap;
use std::string::{String, ToString};
use std::vec::Vec;

use crate::app_state::Board;
use crate::clock::{DateTime, Millis, MonotonicClock, WallClock};
use crate::display::{DisplaySink, StatusScreen};
use crate::network::{NetworkLink, TelemetryReport, TelemetrySink};
use crate::sensors::{AirSignal, EnvironmentSensor, SensorError};
use crate::storage::{OpenMode, StorageMedium};
use crate::time_authority::{SyncRequest, SyncStatus, TimeSource};

/// Monotonic clock moved by hand. Interior mutability so tests can move it
/// while the scheduler owns it.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    pub fn advance(&self, ms: Millis) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl MonotonicClock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumFault {
    Absent,
    NotFound,
    ReadFault,
    WriteRejected,
    BadHandle,
}

/// In-memory card with a physical presence switch.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    present: bool,
    pub mounted: bool,
    pub fail_writes: bool,
    pub fail_close: bool,
    /// Read-only opens that fail before the medium behaves again.
    pub failing_reads: u32,
    pub mount_calls: u32,
    pub last_speed_hz: Option<u32>,
    files: BTreeMap<String, Vec<u8>>,
    handles: Vec<(u32, String)>,
    next_handle: u32,
}

impl MemoryMedium {
    pub fn inserted() -> Self {
        Self {
            present: true,
            ..Self::default()
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    /// Pull the card. Contents survive for reinsertion.
    pub fn remove(&mut self) {
        self.present = false;
    }

    pub fn insert(&mut self) {
        self.present = true;
    }

    pub fn file(&self, path: &str) -> Option<&Vec<u8>> {
        self.files.get(path)
    }

    pub fn contents(&self, path: &str) -> String {
        self.file(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    fn path_of(&self, file: u32) -> Result<String, MediumFault> {
        self.handles
            .iter()
            .find(|(id, _)| *id == file)
            .map(|(_, path)| path.clone())
            .ok_or(MediumFault::BadHandle)
    }

    fn usable(&self) -> Result<(), MediumFault> {
        if self.present && self.mounted {
            Ok(())
        } else {
            Err(MediumFault::Absent)
        }
    }
}

impl StorageMedium for MemoryMedium {
    type Handle = u32;
    type Error = MediumFault;

    fn mount(&mut self, speed_hz: u32) -> Result<(), MediumFault> {
        self.mount_calls += 1;
        self.last_speed_hz = Some(speed_hz);
        if !self.present {
            return Err(MediumFault::Absent);
        }
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) {
        self.mounted = false;
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<u32, MediumFault> {
        self.usable()?;
        match mode {
            OpenMode::Read if !self.files.contains_key(path) => return Err(MediumFault::NotFound),
            OpenMode::Read if self.failing_reads > 0 => {
                self.failing_reads -= 1;
                return Err(MediumFault::ReadFault);
            }
            OpenMode::Read => {}
            OpenMode::Append => {
                self.files.entry(path.to_string()).or_default();
            }
        }

        self.next_handle += 1;
        self.handles.push((self.next_handle, path.to_string()));
        Ok(self.next_handle)
    }

    fn file_len(&mut self, file: u32) -> Result<u32, MediumFault> {
        self.usable()?;
        let path = self.path_of(file)?;
        Ok(self.files.get(&path).map_or(0, |f| f.len() as u32))
    }

    fn write(&mut self, file: u32, bytes: &[u8]) -> Result<(), MediumFault> {
        self.usable()?;
        if self.fail_writes {
            return Err(MediumFault::WriteRejected);
        }
        let path = self.path_of(file)?;
        self.files.entry(path).or_default().extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self, file: u32) -> Result<(), MediumFault> {
        let before = self.handles.len();
        self.handles.retain(|(id, _)| *id != file);
        if self.handles.len() == before {
            return Err(MediumFault::BadHandle);
        }
        if self.fail_close {
            return Err(MediumFault::WriteRejected);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockWallClock {
    now: Option<DateTime>,
}

impl MockWallClock {
    pub fn at(now: DateTime) -> Self {
        Self { now: Some(now) }
    }

    pub fn unset() -> Self {
        Self { now: None }
    }
}

impl WallClock for MockWallClock {
    fn now(&self) -> Option<DateTime> {
        self.now
    }

    fn set(&mut self, time: DateTime) {
        self.now = Some(time);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub server: String,
    pub utc_offset_secs: i32,
    pub dst_offset_secs: i32,
}

/// Time source whose completion is scripted by the test.
#[derive(Debug)]
pub struct MockTimeSource {
    status: SyncStatus,
    pub requests: u32,
    pub last_request: Option<RecordedRequest>,
}

impl MockTimeSource {
    pub fn pending() -> Self {
        Self {
            status: SyncStatus::Pending,
            requests: 0,
            last_request: None,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            status: SyncStatus::Unsupported,
            ..Self::pending()
        }
    }

    /// The outstanding request landed.
    pub fn complete(&mut self) {
        self.status = SyncStatus::Completed;
    }
}

impl TimeSource for MockTimeSource {
    fn request_sync(&mut self, request: &SyncRequest<'_>) {
        self.requests += 1;
        self.last_request = Some(RecordedRequest {
            server: request.server.to_string(),
            utc_offset_secs: request.utc_offset_secs,
            dst_offset_secs: request.dst_offset_secs,
        });
        if self.status == SyncStatus::Completed {
            self.status = SyncStatus::Pending;
        }
    }

    fn sync_status(&self) -> SyncStatus {
        self.status
    }
}

/// Link that is up, down, or comes up after a number of status polls.
#[derive(Debug, Default)]
pub struct MockLink {
    pub connected: bool,
    pub up_after_polls: Option<u32>,
    pub connect_calls: u32,
    polls: Cell<u32>,
}

impl MockLink {
    pub fn up() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn down() -> Self {
        Self::default()
    }

    pub fn up_after(polls: u32) -> Self {
        Self {
            up_after_polls: Some(polls),
            ..Self::default()
        }
    }
}

impl NetworkLink for MockLink {
    fn is_connected(&self) -> bool {
        self.polls.set(self.polls.get() + 1);
        self.connected || matches!(self.up_after_polls, Some(n) if self.polls.get() >= n)
    }

    fn connect(&mut self, _ssid: &str, _password: &str) {
        self.connect_calls += 1;
    }
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub frames: Vec<StatusScreen>,
}

impl DisplaySink for RecordingDisplay {
    fn render(&mut self, screen: &StatusScreen) {
        self.frames.push(screen.clone());
    }
}

#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    pub published: Vec<TelemetryReport>,
    pub fail: bool,
}

impl TelemetrySink for RecordingTelemetry {
    type Error = &'static str;

    fn publish(&mut self, report: &TelemetryReport) -> Result<(), Self::Error> {
        if self.fail {
            return Err("service unavailable");
        }
        self.published.push(*report);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FixedSensor {
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    pub fail_humidity: bool,
}

impl FixedSensor {
    pub fn new(temperature: f32, humidity: f32, pressure: f32) -> Self {
        Self {
            temperature,
            humidity,
            pressure,
            fail_humidity: false,
        }
    }
}

impl EnvironmentSensor for FixedSensor {
    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        Ok(self.temperature)
    }

    fn read_humidity(&mut self) -> Result<f32, SensorError> {
        if self.fail_humidity {
            return Err(SensorError::ReadFailed {
                sensor: "fixed",
                operation: "humidity",
            });
        }
        Ok(self.humidity)
    }

    fn read_pressure(&mut self) -> Result<f32, SensorError> {
        Ok(self.pressure)
    }
}

/// Air signal replaying a sequence, cycling at the end.
#[derive(Debug, Default)]
pub struct FixedAir {
    samples: Vec<u16>,
    pub reads: usize,
}

impl FixedAir {
    pub fn sequence(samples: &[u16]) -> Self {
        Self {
            samples: samples.to_vec(),
            reads: 0,
        }
    }
}

impl AirSignal for FixedAir {
    fn read_raw(&mut self) -> u16 {
        let value = match self.samples.len() {
            0 => 0,
            n => self.samples[self.reads % n],
        };
        self.reads += 1;
        value
    }
}

/// Delay that returns immediately and adds up what was asked of it.
#[derive(Debug, Default)]
pub struct NoopDelay {
    pub total_ns: u64,
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

pub struct TestBoard;

impl Board for TestBoard {
    type Clock = ManualClock;
    type Sensor = FixedSensor;
    type Air = FixedAir;
    type Delay = NoopDelay;
    type Display = RecordingDisplay;
    type Link = MockLink;
    type Telemetry = RecordingTelemetry;
    type Medium = MemoryMedium;
    type WallClock = MockWallClock;
    type TimeSource = MockTimeSource;
}
