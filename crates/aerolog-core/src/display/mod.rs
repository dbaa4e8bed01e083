//! Status screen model and the display collaborator
//!
//! The scheduler composes a [`StatusScreen`] on every display refresh and
//! hands it to a [`DisplaySink`]. [`PanelRenderer`] is the stock sink for
//! 128x64 monochrome panels; it draws through `embedded-graphics`, usually
//! into a [`MonoFrameBuffer`].

mod framebuffer;
mod panel;

pub use framebuffer::*;
pub use panel::*;

use core::fmt::{self, Write};

use log::debug;

use crate::sensors::{AirQuality, Climate};

pub const TITLE: &str = "Weather St.";

pub type ScreenLine = heapless::String<32>;

/// Everything shown on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusScreen {
    pub link_up: bool,
    pub storage_mounted: bool,
    pub lines: [ScreenLine; 4],
}

impl StatusScreen {
    pub fn compose(
        climate: &Climate,
        air_value: i32,
        quality: AirQuality,
        link_up: bool,
        storage_mounted: bool,
    ) -> Self {
        Self {
            link_up,
            storage_mounted,
            lines: [
                screen_line(format_args!("Temperature : {:.1} C", climate.temperature_c)),
                screen_line(format_args!("Humidity      : %{}", climate.humidity_pct as i32)),
                screen_line(format_args!("Pressure     : {} hPa", climate.pressure_hpa as i32)),
                screen_line(format_args!("Air Quality   : {} {}", air_value, quality.label())),
            ],
        }
    }

    pub const fn link_icon(&self) -> &'static str {
        if self.link_up { "[W]" } else { "[X]" }
    }

    pub const fn storage_icon(&self) -> &'static str {
        if self.storage_mounted { "[SD]" } else { "[NO]" }
    }
}

fn screen_line(args: fmt::Arguments<'_>) -> ScreenLine {
    let mut line = ScreenLine::new();
    if line.write_fmt(args).is_err() {
        debug!("Screen line truncated: {}", line);
    }
    line
}

/// Anything that can show a status frame. Rendering is fire-and-forget.
pub trait DisplaySink {
    fn render(&mut self, screen: &StatusScreen);
}
