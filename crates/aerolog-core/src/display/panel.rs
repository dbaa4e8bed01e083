use core::fmt::Debug;

use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_6X10};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyle, TextStyleBuilder};
use log::warn;

use super::{DISPLAY_WIDTH_PX, DisplaySink, StatusScreen, TITLE};

/// Right edge of the link icon; the storage icon sits flush with the panel edge.
const LINK_ICON_RIGHT_X: i32 = 100;
const HEADER_RULE_Y: i32 = 12;
const FIRST_LINE_Y: i32 = 15;
const LINE_PITCH: i32 = 12;

/// Draws [`StatusScreen`]s onto a 128x64 monochrome target.
pub struct PanelRenderer<D> {
    target: D,
}

impl<D> PanelRenderer<D>
where
    D: DrawTarget<Color = BinaryColor>,
    D::Error: Debug,
{
    pub fn new(target: D) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut D {
        &mut self.target
    }

    /// Clear and redraw the whole frame.
    pub fn draw(&mut self, screen: &StatusScreen) -> Result<(), D::Error> {
        let font = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let left = text_style(Alignment::Left);
        let right = text_style(Alignment::Right);

        self.target.clear(BinaryColor::Off)?;

        Text::with_text_style(TITLE, Point::zero(), font, left).draw(&mut self.target)?;
        Text::with_text_style(
            screen.link_icon(),
            Point::new(LINK_ICON_RIGHT_X, 0),
            font,
            right,
        )
        .draw(&mut self.target)?;
        Text::with_text_style(
            screen.storage_icon(),
            Point::new(DISPLAY_WIDTH_PX as i32, 0),
            font,
            right,
        )
        .draw(&mut self.target)?;

        Line::new(
            Point::new(0, HEADER_RULE_Y),
            Point::new(DISPLAY_WIDTH_PX as i32 - 1, HEADER_RULE_Y),
        )
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(&mut self.target)?;

        for (row, line) in screen.lines.iter().enumerate() {
            let y = FIRST_LINE_Y + LINE_PITCH * row as i32;
            Text::with_text_style(line.as_str(), Point::new(0, y), font, left)
                .draw(&mut self.target)?;
        }

        Ok(())
    }
}

fn text_style(alignment: Alignment) -> TextStyle {
    TextStyleBuilder::new()
        .alignment(alignment)
        .baseline(Baseline::Top)
        .build()
}

impl<D> DisplaySink for PanelRenderer<D>
where
    D: DrawTarget<Color = BinaryColor>,
    D::Error: Debug,
{
    fn render(&mut self, screen: &StatusScreen) {
        if let Err(e) = self.draw(screen) {
            warn!("Panel draw failed: {:?}", e);
        }
    }
}
