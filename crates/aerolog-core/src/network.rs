//! Network link and remote telemetry collaborators

/// Wireless link status and association.
pub trait NetworkLink {
    /// Non-blocking status check.
    fn is_connected(&self) -> bool;

    /// Start associating with an access point. Does not wait for the result.
    fn connect(&mut self, ssid: &str, password: &str);
}

/// One upload to the remote telemetry service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryReport {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
    pub air_quality: i32,
}

/// Remote telemetry client. Only called while the link is up.
pub trait TelemetrySink {
    type Error: core::fmt::Debug;

    fn publish(&mut self, report: &TelemetryReport) -> Result<(), Self::Error>;
}
