//! Application-wide state for aerolog
//!
//! Everything the scheduled tasks share lives in [`AppState`]. The
//! scheduler owns it and lends it to one task body at a time, so each piece
//! has a single writer and no locking is needed.

mod hardware;

pub use hardware::*;

use crate::config::{AirConfig, DeviceConfig, InternetConfig};
use crate::filter::Smoother;
use crate::sensors::{AirQuality, AirSampler, Climate};
use crate::storage::StorageSession;
use crate::time_authority::TimeAuthority;

pub struct AppState<'a, B: Board> {
    /// Removable log medium and its mount state.
    pub storage: StorageSession<'a, B::Medium>,
    /// Wall clock, time source and clock authority.
    pub time: TimeAuthority<'a, B::WallClock, B::TimeSource>,
    /// Last known climate readings. Stale on a failed read.
    pub climate: Climate,
    /// Smoothed air value. Written only by the display refresh.
    pub smoother: Smoother,
    pub sampler: AirSampler,
    pub air: AirConfig,
    pub internet: InternetConfig<'a>,
}

impl<'a, B: Board> AppState<'a, B> {
    pub fn new(
        config: &DeviceConfig<'a>,
        medium: B::Medium,
        wall_clock: B::WallClock,
        time_source: B::TimeSource,
    ) -> Self {
        Self {
            storage: StorageSession::new(medium, config.storage),
            time: TimeAuthority::new(wall_clock, time_source, config.clock),
            climate: Climate::default(),
            smoother: Smoother::new(config.air.smoothing_alpha, config.air.initial_smoothed),
            sampler: AirSampler::new(&config.air),
            air: config.air,
            internet: config.internet,
        }
    }

    /// Smoothed air value as shown, logged and uploaded (truncated).
    pub fn air_value(&self) -> i32 {
        self.smoother.value() as i32
    }

    pub fn air_quality(&self) -> AirQuality {
        AirQuality::assess(self.air_value(), &self.air)
    }
}
