//! Board abstraction
//!
//! A board names the concrete type of every collaborator the station talks
//! to. The firmware crate and the simulator each provide one; tests use a
//! board made of mocks.

use embedded_hal::delay::DelayNs;

use crate::clock::{MonotonicClock, WallClock};
use crate::display::DisplaySink;
use crate::network::{NetworkLink, TelemetrySink};
use crate::sensors::{AirSignal, EnvironmentSensor};
use crate::storage::StorageMedium;
use crate::time_authority::TimeSource;

/// Type-level bundle of the station's collaborators.
pub trait Board {
    type Clock: MonotonicClock;
    type Sensor: EnvironmentSensor;
    type Air: AirSignal;
    type Delay: DelayNs;
    type Display: DisplaySink;
    type Link: NetworkLink;
    type Telemetry: TelemetrySink;
    type Medium: StorageMedium;
    type WallClock: WallClock;
    type TimeSource: TimeSource;
}

/// Peripherals the scheduler drives directly.
///
/// The storage medium, wall clock and time source are not here: they are
/// owned by the storage session and the time authority in
/// [`AppState`](super::AppState).
pub struct Peripherals<B: Board> {
    pub clock: B::Clock,
    pub sensor: B::Sensor,
    pub air: B::Air,
    pub delay: B::Delay,
    pub display: B::Display,
    pub link: B::Link,
    pub telemetry: B::Telemetry,
}
