//! Desktop simulator for the aerolog telemetry station.
//!
//! Runs the real scheduler from `aerolog-core` against simulated peripherals
//! on an accelerated clock. The log file is written to a host directory that
//! stands in for the SD card.
//!
//! # Scripted events (simulated time)
//!
//! | When              | What                                     |
//! |-------------------|------------------------------------------|
//! | boot              | link down, fallback clock installed      |
//! | 30 s              | link comes up, time sync requested       |
//! | 150 s to 180 s    | link outage, uploads skipped             |
//! | 200 s to 205 s    | card pulled, records dropped, remount    |
//!
//! # Environment
//!
//! | Variable          | Meaning                                         |
//! |-------------------|-------------------------------------------------|
//! | `RUST_LOG`        | log filter, `info` by default                   |
//! | `AEROLOG_SPEEDUP` | simulated ms per host ms, default 10            |
//! | `AEROLOG_CARD`    | card directory, default `<tmp>/aerolog-card`    |
//! | `AEROLOG_CONFIG`  | postcard-encoded `DeviceConfig` blob (optional) |

mod peripherals;

use std::path::PathBuf;
use std::time::Duration;

use log::{info, warn};

use aerolog_core::app_state::{AppState, Board, Peripherals};
use aerolog_core::clock::Millis;
use aerolog_core::config::DeviceConfig;
use aerolog_core::scheduler::Scheduler;

use peripherals::{
    ConsolePanel, HostMedium, LogTelemetry, SimAirSignal, SimCivilTime, SimClock, SimEnvironment,
    SimLink, StdDelay,
};

const DEFAULT_SPEEDUP: u32 = 10;

const LINK_UP_FROM_MS: Millis = 30_000;
const LINK_OUTAGE_MS: std::ops::Range<Millis> = 150_000..180_000;
const CARD_REMOVED_MS: std::ops::Range<Millis> = 200_000..205_000;
const SNTP_LATENCY_MS: Millis = 3_000;

/// Host pause between scheduler iterations, so the simulator does not pin a core.
const IDLE: Duration = Duration::from_millis(1);

struct SimBoard;

impl Board for SimBoard {
    type Clock = SimClock;
    type Sensor = SimEnvironment;
    type Air = SimAirSignal;
    type Delay = StdDelay;
    type Display = ConsolePanel;
    type Link = SimLink;
    type Telemetry = LogTelemetry;
    type Medium = HostMedium;
    type WallClock = SimCivilTime;
    type TimeSource = SimCivilTime;
}

fn speedup() -> u32 {
    std::env::var("AEROLOG_SPEEDUP")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SPEEDUP)
}

fn card_dir() -> PathBuf {
    std::env::var_os("AEROLOG_CARD")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("aerolog-card"))
}

fn load_config_blob() -> Option<Vec<u8>> {
    let path = std::env::var_os("AEROLOG_CONFIG")?;
    match std::fs::read(&path) {
        Ok(blob) => Some(blob),
        Err(e) => {
            warn!("Could not read config {:?}: {}", path, e);
            None
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting aerolog simulator");

    let blob = load_config_blob();
    let config = match blob.as_deref().map(DeviceConfig::from_bytes) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            warn!("Ignoring config blob: {}", e);
            DeviceConfig::default()
        }
        None => DeviceConfig::default(),
    };

    let clock = SimClock::new(speedup());
    info!("Clock speedup {}x", clock.speedup());

    let link = SimLink {
        clock,
        up_from_ms: LINK_UP_FROM_MS,
        outage_ms: LINK_OUTAGE_MS,
    };
    let civil = SimCivilTime::new(clock, link.clone(), SNTP_LATENCY_MS);

    let dir = card_dir();
    info!(
        "Card directory {} (log file {})",
        dir.display(),
        config.storage.log_path
    );
    let medium = HostMedium::new(clock, dir, CARD_REMOVED_MS);

    let peripherals = Peripherals::<SimBoard> {
        clock,
        sensor: SimEnvironment::new(clock),
        air: SimAirSignal::default(),
        delay: StdDelay {
            speedup: clock.speedup(),
        },
        display: ConsolePanel::default(),
        link,
        telemetry: LogTelemetry,
    };
    let state = AppState::new(&config, medium, civil.clone(), civil);

    let mut scheduler = Scheduler::new(peripherals, state, &config.schedule);
    let report = scheduler.boot();
    info!("Boot report: {:?}", report);

    loop {
        scheduler.tick();
        std::thread::sleep(IDLE);
    }
}
