//! Sensor collaborators and the acquisition layer around them
//!
//! The drivers themselves live in the board crate. The core only sees simple
//! synchronous reads that may fail; a failed read keeps the previous value.

use embedded_hal::delay::DelayNs;
use log::debug;
use thiserror_no_std::Error;

use crate::config::AirConfig;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: {operation} failed")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
    },
}

/// Temperature / humidity / pressure sensor.
pub trait EnvironmentSensor {
    /// Degrees Celsius.
    fn read_temperature(&mut self) -> Result<f32, SensorError>;
    /// Relative humidity in percent.
    fn read_humidity(&mut self) -> Result<f32, SensorError>;
    /// Pascals.
    fn read_pressure(&mut self) -> Result<f32, SensorError>;
}

/// Raw analog air-quality signal (ADC counts).
pub trait AirSignal {
    fn read_raw(&mut self) -> u16;
}

/// Last known climate readings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Climate {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
}

impl Climate {
    /// Re-read all three channels. A channel whose read fails keeps its
    /// previous value.
    pub fn refresh<S: EnvironmentSensor>(&mut self, sensor: &mut S) {
        match sensor.read_temperature() {
            Ok(t) => self.temperature_c = t,
            Err(e) => debug!("Keeping stale temperature: {}", e),
        }
        match sensor.read_humidity() {
            Ok(h) => self.humidity_pct = h,
            Err(e) => debug!("Keeping stale humidity: {}", e),
        }
        match sensor.read_pressure() {
            Ok(p) => self.pressure_hpa = p / 100.0,
            Err(e) => debug!("Keeping stale pressure: {}", e),
        }
    }
}

/// Burst-averaging, calibrating reader for the air signal.
#[derive(Debug, Clone, Copy)]
pub struct AirSampler {
    samples: u8,
    delay_ms: u32,
    baseline: i32,
    gain: i32,
}

impl AirSampler {
    pub fn new(config: &AirConfig) -> Self {
        Self {
            samples: config.burst_samples.max(1),
            delay_ms: config.burst_delay_ms,
            baseline: config.baseline,
            gain: config.gain,
        }
    }

    /// Take one calibrated sample.
    ///
    /// Reads the signal `samples` times back to back with a short
    /// busy-wait after each read. The burst is bounded and far shorter than
    /// any task period, so it stays synchronous.
    pub fn sample<A: AirSignal, D: DelayNs>(&self, air: &mut A, delay: &mut D) -> f32 {
        let mut total: u32 = 0;
        for _ in 0..self.samples {
            total += u32::from(air.read_raw());
            delay.delay_ms(self.delay_ms);
        }
        let average = (total / u32::from(self.samples)) as i32;

        self.baseline.saturating_add(average.saturating_mul(self.gain)) as f32
    }
}

/// Coarse air-quality band of the displayed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirQuality {
    Good,
    Fair,
    Poor,
}

impl AirQuality {
    pub fn assess(value: i32, config: &AirConfig) -> Self {
        if value < config.fair_threshold {
            Self::Good
        } else if value < config.poor_threshold {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "[GOOD]",
            Self::Fair => "[FAIR]",
            Self::Poor => "[POOR]",
        }
    }
}
