//! Task bodies
//!
//! Each body runs to completion and consumes every failure itself: a task
//! never hands an error back to the scheduler.

use log::{debug, info, warn};

use crate::app_state::{AppState, Board, Peripherals};
use crate::clock::Millis;
use crate::config::ScheduleConfig;
use crate::display::{DisplaySink, StatusScreen};
use crate::network::{NetworkLink, TelemetryReport, TelemetrySink};
use crate::record::LogRecord;
use crate::time_authority::Recovery;

/// The four periodic activities, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Remount a medium that went away.
    StorageCheck,
    /// Sample, smooth and draw.
    DisplayRefresh,
    /// Append one record to the log file.
    LocalLog,
    /// Publish telemetry and nudge the time authority.
    CloudUpload,
}

impl Task {
    /// A remount on the storage check is visible to the local log on the
    /// same tick.
    pub const PRIORITY: [Task; 4] = [
        Task::StorageCheck,
        Task::DisplayRefresh,
        Task::LocalLog,
        Task::CloudUpload,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Task::StorageCheck => "storage-check",
            Task::DisplayRefresh => "display-refresh",
            Task::LocalLog => "local-log",
            Task::CloudUpload => "cloud-upload",
        }
    }

    pub const fn period_ms(self, schedule: &ScheduleConfig) -> Millis {
        match self {
            Task::StorageCheck => schedule.storage_check_period_ms,
            Task::DisplayRefresh => schedule.display_period_ms,
            Task::LocalLog => schedule.log_period_ms,
            Task::CloudUpload => schedule.upload_period_ms,
        }
    }
}

pub(super) fn run<B: Board>(task: Task, p: &mut Peripherals<B>, s: &mut AppState<'_, B>) {
    match task {
        Task::StorageCheck => storage_check(s),
        Task::DisplayRefresh => display_refresh(p, s),
        Task::LocalLog => local_log(p, s),
        Task::CloudUpload => cloud_upload(p, s),
    }
}

fn storage_check<B: Board>(s: &mut AppState<'_, B>) {
    if s.storage.poll_remount() {
        debug!("Storage back after hot-swap");
    }
}

fn display_refresh<B: Board>(p: &mut Peripherals<B>, s: &mut AppState<'_, B>) {
    s.climate.refresh(&mut p.sensor);

    let raw = s.sampler.sample(&mut p.air, &mut p.delay);
    s.smoother.update(raw);

    let screen = StatusScreen::compose(
        &s.climate,
        s.air_value(),
        s.air_quality(),
        p.link.is_connected(),
        s.storage.is_mounted(),
    );
    p.display.render(&screen);
}

fn local_log<B: Board>(p: &mut Peripherals<B>, s: &mut AppState<'_, B>) {
    s.climate.refresh(&mut p.sensor);

    let record = LogRecord {
        timestamp: s.time.now(),
        climate: s.climate,
        air_quality: s.air_value(),
    };

    let Ok(line) = record.to_line() else {
        warn!("Log record does not fit a line, discarded");
        return;
    };

    if let Err(e) = s.storage.append_record(&line) {
        warn!("Log record discarded: {}", e);
    }
}

fn cloud_upload<B: Board>(p: &mut Peripherals<B>, s: &mut AppState<'_, B>) {
    if !p.link.is_connected() {
        info!("Link down, upload skipped");
        return;
    }

    match s.time.on_recovery_tick() {
        Recovery::Steady => {}
        Recovery::Upgraded => info!("Clock upgraded to network time"),
        Recovery::Requested(reason) => debug!("Time resync requested: {:?}", reason),
    }

    s.climate.refresh(&mut p.sensor);
    let report = TelemetryReport {
        temperature_c: s.climate.temperature_c,
        humidity_pct: s.climate.humidity_pct,
        pressure_hpa: s.climate.pressure_hpa,
        air_quality: s.air_value(),
    };

    match p.telemetry.publish(&report) {
        Ok(()) => debug!("Telemetry published: {:?}", report),
        Err(e) => warn!("Telemetry publish failed: {:?}", e),
    }
}
