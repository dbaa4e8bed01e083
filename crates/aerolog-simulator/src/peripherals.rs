//! Simulated station hardware
//!
//! Every peripheral reads the same accelerated clock, so scripted events
//! (card pulled, link outage, time sync landing) happen at fixed points of
//! simulated time regardless of how fast the host runs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::ops::Range;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use embedded_hal::delay::DelayNs;
use log::{debug, info, log_enabled};

use aerolog_core::clock::{DateTime, Millis, MonotonicClock, WallClock};
use aerolog_core::display::{
    DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplaySink, MonoFrameBuffer, PanelRenderer,
    StatusScreen,
};
use aerolog_core::network::{NetworkLink, TelemetryReport, TelemetrySink};
use aerolog_core::sensors::{AirSignal, EnvironmentSensor, SensorError};
use aerolog_core::storage::{OpenMode, StorageMedium};
use aerolog_core::time_authority::{SyncRequest, SyncStatus, TimeSource};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Millisecond counter running `speedup` times faster than the host.
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    start: Instant,
    speedup: u32,
}

impl SimClock {
    pub fn new(speedup: u32) -> Self {
        Self {
            start: Instant::now(),
            speedup: speedup.max(1),
        }
    }

    pub fn speedup(&self) -> u32 {
        self.speedup
    }
}

impl MonotonicClock for SimClock {
    fn now_ms(&self) -> Millis {
        // Truncation is the counter wrap
        (self.start.elapsed().as_millis() * u128::from(self.speedup)) as Millis
    }
}

/// Busy-waits become host sleeps, shortened by the clock speedup.
pub struct StdDelay {
    pub speedup: u32,
}

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns / self.speedup.max(1))));
    }
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Slowly drifting climate with an occasional failed humidity read.
pub struct SimEnvironment {
    pub clock: SimClock,
    reads: u32,
}

impl SimEnvironment {
    pub fn new(clock: SimClock) -> Self {
        Self { clock, reads: 0 }
    }

    fn t(&self) -> f32 {
        self.clock.now_ms() as f32 / 1_000.0
    }
}

impl EnvironmentSensor for SimEnvironment {
    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        let t = self.t();
        Ok(23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos())
    }

    fn read_humidity(&mut self) -> Result<f32, SensorError> {
        self.reads = self.reads.wrapping_add(1);
        if self.reads % 97 == 0 {
            return Err(SensorError::ReadFailed {
                sensor: "bme280",
                operation: "humidity",
            });
        }
        let t = self.t();
        Ok(50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos())
    }

    fn read_pressure(&mut self) -> Result<f32, SensorError> {
        let t = self.t();
        Ok(101_325.0 + 250.0 * (t / 600.0).sin())
    }
}

/// Noisy ADC with rare spikes, from a xorshift generator.
pub struct SimAirSignal {
    state: u32,
}

impl Default for SimAirSignal {
    fn default() -> Self {
        Self { state: 0x2545_f491 }
    }
}

impl AirSignal for SimAirSignal {
    fn read_raw(&mut self) -> u16 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;

        let noise = (self.state % 7) as u16;
        if self.state % 500 == 0 { 250 } else { 8 + noise }
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Link that associates at `up_from_ms` and drops out during `outage_ms`.
#[derive(Debug, Clone)]
pub struct SimLink {
    pub clock: SimClock,
    pub up_from_ms: Millis,
    pub outage_ms: Range<Millis>,
}

impl SimLink {
    fn up_at(&self, now: Millis) -> bool {
        now >= self.up_from_ms && !self.outage_ms.contains(&now)
    }
}

impl NetworkLink for SimLink {
    fn is_connected(&self) -> bool {
        self.up_at(self.clock.now_ms())
    }

    fn connect(&mut self, ssid: &str, _password: &str) {
        info!("Associating with \"{}\"", ssid);
    }
}

/// Telemetry service stand-in: the report goes to the log.
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    type Error = Infallible;

    fn publish(&mut self, report: &TelemetryReport) -> Result<(), Infallible> {
        info!(
            "Telemetry: {:.2} C, {:.2} %, {:.2} hPa, air {}",
            report.temperature_c, report.humidity_pct, report.pressure_hpa, report.air_quality
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wall clock and time source
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Civil {
    /// Wall-clock value and the sim time it was set at.
    base: Option<(DateTime, Millis)>,
    /// Outstanding request: sim time issued and zone offset.
    request: Option<(Millis, i64)>,
    completed: bool,
}

/// State shared by the RTC and the SNTP client, like the real system clock.
#[derive(Clone)]
pub struct SimCivilTime {
    clock: SimClock,
    link: SimLink,
    latency_ms: Millis,
    inner: Rc<RefCell<Civil>>,
}

impl SimCivilTime {
    pub fn new(clock: SimClock, link: SimLink, latency_ms: Millis) -> Self {
        Self {
            clock,
            link,
            latency_ms,
            inner: Rc::new(RefCell::new(Civil::default())),
        }
    }

    /// Land an outstanding request once its latency has passed with the link up.
    fn settle(&self) {
        let now = self.clock.now_ms();
        let mut civil = self.inner.borrow_mut();

        let Some((issued, offset)) = civil.request else {
            return;
        };
        if now.wrapping_sub(issued) < self.latency_ms || !self.link.up_at(now) {
            return;
        }

        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        let landed = DateTime::from_unix_secs(unix + offset);

        civil.base = Some((landed, now));
        civil.request = None;
        civil.completed = true;
        info!("SNTP reply landed: {}", landed);
    }
}

impl WallClock for SimCivilTime {
    fn now(&self) -> Option<DateTime> {
        self.settle();
        let (base, set_at) = self.inner.borrow().base?;
        let elapsed = self.clock.now_ms().wrapping_sub(set_at) / 1_000;
        Some(base.plus_secs(i64::from(elapsed)))
    }

    fn set(&mut self, time: DateTime) {
        self.inner.borrow_mut().base = Some((time, self.clock.now_ms()));
    }
}

impl TimeSource for SimCivilTime {
    fn request_sync(&mut self, request: &SyncRequest<'_>) {
        let offset = i64::from(request.utc_offset_secs) + i64::from(request.dst_offset_secs);
        let mut civil = self.inner.borrow_mut();
        civil.request = Some((self.clock.now_ms(), offset));
        civil.completed = false;
        debug!("SNTP request to {}", request.server);
    }

    fn sync_status(&self) -> SyncStatus {
        self.settle();
        if self.inner.borrow().completed {
            SyncStatus::Completed
        } else {
            SyncStatus::Pending
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Host directory standing in for the SD card. The card is "pulled" while
/// the sim clock is inside `removed_ms`.
pub struct HostMedium {
    clock: SimClock,
    dir: PathBuf,
    removed_ms: Range<Millis>,
    mounted: bool,
    files: HashMap<u32, File>,
    next_handle: u32,
}

impl HostMedium {
    pub fn new(clock: SimClock, dir: PathBuf, removed_ms: Range<Millis>) -> Self {
        Self {
            clock,
            dir,
            removed_ms,
            mounted: false,
            files: HashMap::new(),
            next_handle: 0,
        }
    }

    fn present(&self) -> bool {
        !self.removed_ms.contains(&self.clock.now_ms())
    }

    fn check(&self) -> io::Result<()> {
        if self.mounted && self.present() {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotConnected, "no card"))
        }
    }

    fn file(&mut self, handle: u32) -> io::Result<&mut File> {
        self.files
            .get_mut(&handle)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "stale handle"))
    }
}

impl StorageMedium for HostMedium {
    type Handle = u32;
    type Error = io::Error;

    fn mount(&mut self, speed_hz: u32) -> io::Result<()> {
        if !self.present() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "slot empty"));
        }
        fs::create_dir_all(&self.dir)?;
        self.mounted = true;
        debug!("Card mounted from {} at {} Hz", self.dir.display(), speed_hz);
        Ok(())
    }

    fn unmount(&mut self) {
        self.mounted = false;
        self.files.clear();
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> io::Result<u32> {
        self.check()?;
        let full = self.dir.join(path);
        let file = match mode {
            OpenMode::Read => File::open(full)?,
            OpenMode::Append => OpenOptions::new().create(true).append(true).open(full)?,
        };

        self.next_handle = self.next_handle.wrapping_add(1);
        self.files.insert(self.next_handle, file);
        Ok(self.next_handle)
    }

    fn file_len(&mut self, handle: u32) -> io::Result<u32> {
        self.check()?;
        let len = self.file(handle)?.metadata()?.len();
        Ok(len.min(u64::from(u32::MAX)) as u32)
    }

    fn write(&mut self, handle: u32, bytes: &[u8]) -> io::Result<()> {
        self.check()?;
        self.file(handle)?.write_all(bytes)
    }

    fn close(&mut self, handle: u32) -> io::Result<()> {
        let mut file = self
            .files
            .remove(&handle)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "stale handle"))?;
        self.check()?;
        file.flush()
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// 128x64 panel emulated in RAM: frames are drawn into a framebuffer and
/// flushed onto the "glass". Status changes are logged; with trace logging
/// enabled every changed frame is dumped as ASCII art.
pub struct ConsolePanel {
    renderer: PanelRenderer<MonoFrameBuffer>,
    glass: MonoFrameBuffer,
    last: Option<(bool, bool)>,
}

impl Default for ConsolePanel {
    fn default() -> Self {
        Self {
            renderer: PanelRenderer::new(MonoFrameBuffer::new()),
            glass: MonoFrameBuffer::new(),
            last: None,
        }
    }
}

impl ConsolePanel {
    fn dump(&self) {
        let mut art = String::new();
        for y in (0..DISPLAY_HEIGHT_PX as usize).step_by(2) {
            for x in 0..DISPLAY_WIDTH_PX as usize {
                let lit = self.glass.pixel(x, y) || self.glass.pixel(x, y + 1);
                art.push(if lit { '#' } else { ' ' });
            }
            art.push('\n');
        }
        log::trace!("Panel:\n{}", art);
    }
}

impl DisplaySink for ConsolePanel {
    fn render(&mut self, screen: &StatusScreen) {
        self.renderer.render(screen);

        let status = (screen.link_up, screen.storage_mounted);
        if self.last != Some(status) {
            info!(
                "Status {} {} | {}",
                screen.link_icon(),
                screen.storage_icon(),
                screen.lines[3]
            );
            self.last = Some(status);
        }

        if !self.renderer.target().is_dirty() {
            return;
        }
        let Ok(()) = self.renderer.target_mut().flush(&mut self.glass);
        if log_enabled!(log::Level::Trace) {
            self.dump();
        }
    }
}
