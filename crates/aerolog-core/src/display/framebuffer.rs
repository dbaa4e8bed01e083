//! RAM framebuffer for 128x64 monochrome panels, with change detection.
//!
//! Frames are drawn here first. After drawing completes, only the rectangle
//! containing changed pixels is pushed to the panel, which keeps the 4 Hz
//! refresh cheap on a slow I2C link.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PointsIter, Rectangle};
use log::trace;

pub const DISPLAY_WIDTH_PX: u32 = 128;
pub const DISPLAY_HEIGHT_PX: u32 = 64;

const WIDTH: usize = DISPLAY_WIDTH_PX as usize;
const HEIGHT: usize = DISPLAY_HEIGHT_PX as usize;

/// One bit per pixel, eight vertical pixels per byte (SH1106/SSD1306 page order).
const BUFFER_LEN: usize = WIDTH * HEIGHT / 8;

/// Inclusive span of pixels touched since the last flush. Fits in `u8`
/// since the panel is 128 wide.
#[derive(Debug, Clone, Copy)]
struct Changed {
    left: u8,
    top: u8,
    right: u8,
    bottom: u8,
}

impl Changed {
    fn at(x: usize, y: usize) -> Self {
        let (x, y) = (x as u8, y as u8);
        Self { left: x, top: y, right: x, bottom: y }
    }

    fn include(self, x: usize, y: usize) -> Self {
        let (x, y) = (x as u8, y as u8);
        Self {
            left: self.left.min(x),
            top: self.top.min(y),
            right: self.right.max(x),
            bottom: self.bottom.max(y),
        }
    }

    fn area(&self) -> Rectangle {
        Rectangle::with_corners(
            Point::new(i32::from(self.left), i32::from(self.top)),
            Point::new(i32::from(self.right), i32::from(self.bottom)),
        )
    }
}

/// Framebuffer implementing `DrawTarget<Color = BinaryColor>`.
pub struct MonoFrameBuffer {
    pages: [u8; BUFFER_LEN],
    dirty: Option<Changed>,
}

impl Default for MonoFrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoFrameBuffer {
    /// All pixels off, nothing dirty.
    pub const fn new() -> Self {
        Self {
            pages: [0; BUFFER_LEN],
            dirty: None,
        }
    }

    /// Whether the pixel at (`x`, `y`) is lit. Out-of-range reads are off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < WIDTH && y < HEIGHT && read_bit(&self.pages, x, y)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Raw page-ordered buffer, ready for a controller's GDDRAM.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pages
    }

    fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        if read_bit(&self.pages, x, y) == on {
            return;
        }

        let mask = 1u8 << (y % 8);
        let idx = (y / 8) * WIDTH + x;
        if on {
            self.pages[idx] |= mask;
        } else {
            self.pages[idx] &= !mask;
        }

        self.dirty = Some(match self.dirty {
            Some(changed) => changed.include(x, y),
            None => Changed::at(x, y),
        });
    }

    /// Push the changed region to a panel, then reset the dirty state.
    ///
    /// No-op when nothing changed since the last flush.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let Some(changed) = self.dirty.take() else {
            return Ok(());
        };
        let area = changed.area();
        trace!("Pushing {:?} of the panel", area);

        let pages = &self.pages;
        let colors = area
            .points()
            .map(|p| BinaryColor::from(read_bit(pages, p.x as usize, p.y as usize)));

        display.fill_contiguous(&area, colors)
    }
}

#[inline]
fn read_bit(pages: &[u8; BUFFER_LEN], x: usize, y: usize) -> bool {
    pages[(y / 8) * WIDTH + x] & (1 << (y % 8)) != 0
}

impl OriginDimensions for MonoFrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for MonoFrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let (x, y) = (coord.x, coord.y);
            if x >= 0 && y >= 0 && (x as usize) < WIDTH && (y as usize) < HEIGHT {
                self.set_pixel(x as usize, y as usize, color.is_on());
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                self.set_pixel(x, y, color.is_on());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(fb: &mut MonoFrameBuffer, x: i32, y: i32, color: BinaryColor) {
        fb.draw_iter([Pixel(Point::new(x, y), color)]).unwrap();
    }

    #[test]
    fn test_draw_sets_page_bits() {
        let mut fb = MonoFrameBuffer::new();
        draw(&mut fb, 3, 9, BinaryColor::On);

        assert!(fb.pixel(3, 9));
        assert!(!fb.pixel(3, 8));
        assert_eq!(fb.as_bytes()[WIDTH + 3], 0b0000_0010);
        assert!(fb.is_dirty());
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut fb = MonoFrameBuffer::new();
        draw(&mut fb, -1, 0, BinaryColor::On);
        draw(&mut fb, 128, 10, BinaryColor::On);
        draw(&mut fb, 5, 64, BinaryColor::On);
        assert!(!fb.is_dirty());
    }

    #[test]
    fn test_redrawing_same_color_is_not_a_change() {
        let mut fb = MonoFrameBuffer::new();
        draw(&mut fb, 0, 0, BinaryColor::Off);
        assert!(!fb.is_dirty());
    }

    #[test]
    fn test_flush_copies_dirty_region_once() {
        let mut fb = MonoFrameBuffer::new();
        draw(&mut fb, 10, 20, BinaryColor::On);
        draw(&mut fb, 40, 2, BinaryColor::On);

        let mut panel = MonoFrameBuffer::new();
        fb.flush(&mut panel).unwrap();

        assert!(panel.pixel(10, 20));
        assert!(panel.pixel(40, 2));
        assert!(!panel.pixel(11, 20));
        assert!(!fb.is_dirty());

        // Second flush has nothing to send
        let mut untouched = MonoFrameBuffer::new();
        fb.flush(&mut untouched).unwrap();
        assert!(!untouched.is_dirty());
    }
}
