//! Wall-clock correctness
//!
//! The station always has *some* wall-clock time: at boot it either finds a
//! credible clock or installs a fixed fallback, and once a network time
//! source is reachable it upgrades to authoritative time without operator
//! action and without ever waiting on the network inside a scheduled tick.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::clock::{DateTime, WallClock};
use crate::config::ClockConfig;

/// Parameters of a synchronization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest<'a> {
    pub server: &'a str,
    pub utc_offset_secs: i32,
    pub dst_offset_secs: i32,
}

/// What the time source knows about its most recent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No sync has landed since the last request.
    Pending,
    /// The last request landed and the wall clock was set.
    Completed,
    /// The source cannot report completion.
    Unsupported,
}

/// Network time source (SNTP or similar).
pub trait TimeSource {
    /// Fire-and-forget: start a synchronization. The result lands later, if
    /// at all.
    fn request_sync(&mut self, request: &SyncRequest<'_>);

    fn sync_status(&self) -> SyncStatus;
}

/// Whether the wall clock can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAuthority {
    /// Running on the bootstrap fallback (or a clock found implausible).
    Fallback,
    /// Set by a completed synchronization or found credible at boot.
    Authoritative,
}

/// Why a recovery tick asked for a resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    /// Still on the fallback clock and the source has not confirmed a sync.
    AwaitingSync,
    /// The clock reads a year below the credibility threshold.
    Implausible,
    /// The clock still sits in the fallback hour, minutes after boot.
    FallbackSignature,
}

/// Outcome of one recovery tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Nothing to do.
    Steady,
    /// Moved from `Fallback` to `Authoritative`.
    Upgraded,
    /// A sync request went out.
    Requested(ResyncReason),
}

/// Owns the wall clock and the time source, and the explicit authority flag.
pub struct TimeAuthority<'a, C, S>
where
    C: WallClock,
    S: TimeSource,
{
    clock: C,
    source: S,
    config: ClockConfig<'a>,
    authority: ClockAuthority,
}

impl<'a, C, S> TimeAuthority<'a, C, S>
where
    C: WallClock,
    S: TimeSource,
{
    pub fn new(clock: C, source: S, config: ClockConfig<'a>) -> Self {
        Self {
            clock,
            source,
            config,
            authority: ClockAuthority::Fallback,
        }
    }

    pub fn authority(&self) -> ClockAuthority {
        self.authority
    }

    /// Current wall-clock time.
    pub fn now(&self) -> Option<DateTime> {
        self.clock.now()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Ask the source for fresh time. Does not wait.
    pub fn request_sync(&mut self) {
        let request = SyncRequest {
            server: self.config.ntp_server,
            utc_offset_secs: self.config.utc_offset_secs,
            dst_offset_secs: self.config.dst_offset_secs,
        };
        info!("Requesting time sync from {}", request.server);
        self.source.request_sync(&request);
    }

    /// A reading is credible when it exists and its year reaches the threshold.
    pub fn is_credible(&self, reading: Option<DateTime>) -> bool {
        matches!(reading, Some(t) if t.year >= self.config.plausible_year)
    }

    /// The hour/minute signature of a clock still running on the fallback.
    pub fn matches_fallback_signature(&self, reading: DateTime) -> bool {
        reading.hour == self.config.fallback.hour
            && reading.minute < self.config.fallback_window_minutes
    }

    /// Boot-time rule. Runs once, after any boot sync request went out.
    ///
    /// Polls the wall clock for up to `boot_sync_timeout_ms` while the link is
    /// up (not at all while offline). A credible reading makes the clock
    /// authoritative; otherwise the configured fallback is installed.
    pub fn bootstrap<D: DelayNs>(&mut self, delay: &mut D, link_up: bool) -> ClockAuthority {
        let budget_ms = if link_up {
            self.config.boot_sync_timeout_ms
        } else {
            0
        };
        let step_ms = self.config.boot_poll_step_ms.max(1);
        let mut waited_ms = 0;

        while !self.is_credible(self.clock.now()) && waited_ms < budget_ms {
            delay.delay_ms(step_ms);
            waited_ms = waited_ms.saturating_add(step_ms);
        }

        if self.is_credible(self.clock.now()) {
            self.authority = ClockAuthority::Authoritative;
            info!("Wall clock credible at boot after {} ms", waited_ms);
        } else {
            self.clock.set(self.config.fallback);
            self.authority = ClockAuthority::Fallback;
            warn!(
                "No credible time at boot, installed fallback {}",
                self.config.fallback
            );
        }

        self.authority
    }

    /// Recovery rule. Call on the upload period, only while the link is up.
    pub fn on_recovery_tick(&mut self) -> Recovery {
        let reading = self.clock.now();

        match self.authority {
            ClockAuthority::Authoritative => {
                if self.is_credible(reading) {
                    return Recovery::Steady;
                }
                warn!("Authoritative clock lost credibility, falling back");
                self.authority = ClockAuthority::Fallback;
                self.request_sync();
                Recovery::Requested(ResyncReason::Implausible)
            }
            ClockAuthority::Fallback => match self.source.sync_status() {
                SyncStatus::Completed => self.upgrade(),
                SyncStatus::Pending => {
                    self.request_sync();
                    Recovery::Requested(ResyncReason::AwaitingSync)
                }
                SyncStatus::Unsupported => match reading {
                    Some(t) if self.is_credible(reading) => {
                        if self.matches_fallback_signature(t) {
                            self.request_sync();
                            Recovery::Requested(ResyncReason::FallbackSignature)
                        } else {
                            self.upgrade()
                        }
                    }
                    _ => {
                        self.request_sync();
                        Recovery::Requested(ResyncReason::Implausible)
                    }
                },
            },
        }
    }

    fn upgrade(&mut self) -> Recovery {
        self.authority = ClockAuthority::Authoritative;
        match self.clock.now() {
            Some(t) => info!("Wall clock authoritative: {}", t),
            None => debug!("Wall clock authoritative, reading unavailable"),
        }
        Recovery::Upgraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTimeSource, MockWallClock, NoopDelay};

    type Authority = TimeAuthority<'static, MockWallClock, MockTimeSource>;

    fn authority(clock: MockWallClock, source: MockTimeSource) -> Authority {
        TimeAuthority::new(clock, source, ClockConfig::default())
    }

    fn fallback() -> DateTime {
        ClockConfig::default().fallback
    }

    #[test]
    fn test_unreachable_source_installs_exact_fallback() {
        let mut a = authority(MockWallClock::unset(), MockTimeSource::pending());

        let result = a.bootstrap(&mut NoopDelay::default(), true);

        assert_eq!(result, ClockAuthority::Fallback);
        assert_eq!(a.now(), Some(fallback()));
    }

    #[test]
    fn test_huge_boot_budget_ends_without_overflow() {
        let config = ClockConfig {
            boot_sync_timeout_ms: u32::MAX,
            boot_poll_step_ms: u32::MAX - 1,
            ..ClockConfig::default()
        };
        let mut a = TimeAuthority::new(MockWallClock::unset(), MockTimeSource::pending(), config);
        let mut delay = NoopDelay::default();

        assert_eq!(a.bootstrap(&mut delay, true), ClockAuthority::Fallback);
        assert_eq!(delay.total_ns, 2 * u64::from(u32::MAX - 1) * 1_000_000);
    }

    #[test]
    fn test_implausible_year_installs_fallback() {
        let clock = MockWallClock::at(DateTime::new(1970, 1, 1, 0, 0, 42));
        let mut a = authority(clock, MockTimeSource::pending());

        a.bootstrap(&mut NoopDelay::default(), false);

        assert_eq!(a.now(), Some(fallback()));
        assert_eq!(a.authority(), ClockAuthority::Fallback);
    }

    #[test]
    fn test_boot_wait_is_bounded() {
        let mut a = authority(MockWallClock::unset(), MockTimeSource::pending());
        let mut delay = NoopDelay::default();

        a.bootstrap(&mut delay, true);

        assert_eq!(delay.total_ns, 1_000 * 1_000_000);
    }

    #[test]
    fn test_offline_boot_does_not_wait() {
        let mut a = authority(MockWallClock::unset(), MockTimeSource::pending());
        let mut delay = NoopDelay::default();

        a.bootstrap(&mut delay, false);

        assert_eq!(delay.total_ns, 0);
    }

    #[test]
    fn test_credible_clock_at_boot_is_authoritative() {
        let now = DateTime::new(2026, 10, 16, 9, 30, 0);
        let mut a = authority(MockWallClock::at(now), MockTimeSource::pending());

        assert_eq!(
            a.bootstrap(&mut NoopDelay::default(), true),
            ClockAuthority::Authoritative
        );
        assert_eq!(a.now(), Some(now));
    }

    #[test]
    fn test_sync_request_carries_config() {
        let mut a = authority(MockWallClock::unset(), MockTimeSource::pending());
        a.request_sync();

        let sent = a.source().last_request.as_ref().unwrap();
        assert_eq!(sent.server, "pool.ntp.org");
        assert_eq!(sent.utc_offset_secs, 10_800);
        assert_eq!(sent.dst_offset_secs, 0);
    }

    #[test]
    fn test_fallback_requests_until_sync_lands() {
        let mut a = authority(MockWallClock::unset(), MockTimeSource::pending());
        a.bootstrap(&mut NoopDelay::default(), false);

        assert_eq!(
            a.on_recovery_tick(),
            Recovery::Requested(ResyncReason::AwaitingSync)
        );
        assert_eq!(
            a.on_recovery_tick(),
            Recovery::Requested(ResyncReason::AwaitingSync)
        );
        assert_eq!(a.source().requests, 2);

        a.clock_mut().set(DateTime::new(2026, 10, 16, 9, 30, 0));
        a.source_mut().complete();

        assert_eq!(a.on_recovery_tick(), Recovery::Upgraded);
        assert_eq!(a.on_recovery_tick(), Recovery::Steady);
        assert_eq!(a.source().requests, 2);
        assert_eq!(a.authority(), ClockAuthority::Authoritative);
    }

    #[test]
    fn test_genuine_noon_does_not_trigger_resync() {
        let noon = DateTime::new(2026, 10, 16, 12, 2, 0);
        let mut a = authority(MockWallClock::at(noon), MockTimeSource::pending());
        a.bootstrap(&mut NoopDelay::default(), true);

        assert_eq!(a.on_recovery_tick(), Recovery::Steady);
        assert_eq!(a.source().requests, 0);
    }

    #[test]
    fn test_authoritative_clock_that_loses_credibility_demotes() {
        let now = DateTime::new(2026, 10, 16, 9, 30, 0);
        let mut a = authority(MockWallClock::at(now), MockTimeSource::pending());
        a.bootstrap(&mut NoopDelay::default(), true);

        a.clock_mut().set(DateTime::new(2000, 1, 1, 0, 0, 0));

        assert_eq!(
            a.on_recovery_tick(),
            Recovery::Requested(ResyncReason::Implausible)
        );
        assert_eq!(a.authority(), ClockAuthority::Fallback);
        assert_eq!(a.source().requests, 1);
    }

    #[test]
    fn test_unsupported_source_uses_fallback_signature() {
        let mut a = authority(MockWallClock::unset(), MockTimeSource::unsupported());
        a.bootstrap(&mut NoopDelay::default(), false);

        // 12:00 on the fallback date: still looks like the fallback clock
        assert_eq!(
            a.on_recovery_tick(),
            Recovery::Requested(ResyncReason::FallbackSignature)
        );

        a.clock_mut().set(fallback().plus_secs(4 * 60 + 59));
        assert_eq!(
            a.on_recovery_tick(),
            Recovery::Requested(ResyncReason::FallbackSignature)
        );

        // Past the window the clock is taken at face value
        a.clock_mut().set(fallback().plus_secs(5 * 60));
        assert_eq!(a.on_recovery_tick(), Recovery::Upgraded);
        assert_eq!(a.source().requests, 2);
    }

    #[test]
    fn test_unsupported_source_with_implausible_clock_requests() {
        let mut a = authority(MockWallClock::unset(), MockTimeSource::unsupported());

        assert_eq!(
            a.on_recovery_tick(),
            Recovery::Requested(ResyncReason::Implausible)
        );
    }
}
