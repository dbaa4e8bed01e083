//! Boot sequence
//!
//! The only place the station blocks on the outside world, and every wait
//! here is bounded: a fixed number of link checks, then a short poll for the
//! requested time sync.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app_state::{AppState, Board, Peripherals};
use crate::config::InternetConfig;
use crate::network::NetworkLink;
use crate::storage::MountState;
use crate::time_authority::ClockAuthority;

/// What the station came up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    pub link_up: bool,
    pub storage: MountState,
    pub authority: ClockAuthority,
}

/// Start associating and wait for the link, at most
/// `connect_attempts * connect_interval_ms`.
pub fn connect_link<L, D>(link: &mut L, delay: &mut D, config: &InternetConfig<'_>) -> bool
where
    L: NetworkLink,
    D: DelayNs,
{
    if link.is_connected() {
        return true;
    }

    info!("Connecting to {}", config.ssid);
    link.connect(config.ssid, config.password);

    let mut attempts = 0;
    while !link.is_connected() {
        if attempts >= config.connect_attempts {
            warn!("Link still down after {} attempts, running offline", attempts);
            return false;
        }
        delay.delay_ms(config.connect_interval_ms);
        attempts += 1;
    }

    info!("Link up after {} attempts", attempts);
    true
}

/// Mount storage, bring the link up, and settle the wall clock.
pub fn boot<B: Board>(p: &mut Peripherals<B>, s: &mut AppState<'_, B>) -> BootReport {
    info!("aerolog booting");

    if let Err(e) = s.storage.ensure_mounted() {
        warn!("Storage unavailable at boot: {}", e);
    }

    let link_up = connect_link(&mut p.link, &mut p.delay, &s.internet);
    if link_up {
        s.time.request_sync();
    }

    let authority = s.time.bootstrap(&mut p.delay, link_up);

    let report = BootReport {
        link_up,
        storage: s.storage.state(),
        authority,
    };
    info!("Boot complete: {:?}", report);
    report
}
