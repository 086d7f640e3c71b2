//! Drawing API for [`Image`]s.
//!
//! The functions in this module return a *guard object* that allows optional customization of the
//! shape and performs the draw operation when dropped. All operations overwrite the target pixels
//! (there is no blending), and any part of a shape outside of the image is clipped.

use std::convert::Infallible;

use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
};

use crate::{Color, Image, Rect};

/// Guard returned by [`line`]; draws the line when dropped and allows customization.
pub struct DrawLine<'a> {
    image: &'a mut Image,
    start: Point,
    end: Point,
    color: Color,
    stroke_width: u32,
}

impl DrawLine<'_> {
    /// Sets the line's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the line's stroke width.
    ///
    /// By default, a stroke width of 1 is used.
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }
}

impl Drop for DrawLine<'_> {
    fn drop(&mut self) {
        let style = PrimitiveStyle::with_stroke(self.color.into(), self.stroke_width);
        match Line::new(self.start, self.end)
            .into_styled(style)
            .draw(&mut Target(self.image))
        {
            Ok(()) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Guard returned by [`circle`]; draws the circle when dropped and allows customization.
pub struct DrawCircle<'a> {
    image: &'a mut Image,
    center: Point,
    radius: u32,
    color: Color,
    stroke_width: u32,
}

impl DrawCircle<'_> {
    /// Sets the circle's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the width of the circle's outline.
    ///
    /// By default, a stroke width of 1 is used.
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }
}

impl Drop for DrawCircle<'_> {
    fn drop(&mut self) {
        let style = PrimitiveStyle::with_stroke(self.color.into(), self.stroke_width);
        match Circle::with_center(self.center, self.radius * 2 + 1)
            .into_styled(style)
            .draw(&mut Target(self.image))
        {
            Ok(()) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Draws a line from `start` to `end` onto an image.
///
/// The default color is white.
pub fn line(image: &mut Image, start: (i32, i32), end: (i32, i32)) -> DrawLine<'_> {
    DrawLine {
        image,
        start: Point::new(start.0, start.1),
        end: Point::new(end.0, end.1),
        color: Color::WHITE,
        stroke_width: 1,
    }
}

/// Draws a circle of the given `radius` around `(x, y)`.
///
/// The default color is red.
pub fn circle(image: &mut Image, x: i32, y: i32, radius: u32) -> DrawCircle<'_> {
    DrawCircle {
        image,
        center: Point::new(x, y),
        radius,
        color: Color::RED,
        stroke_width: 1,
    }
}

struct Target<'a>(&'a mut Image);

impl OriginDimensions for Target<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Target<'_> {
    type Color = Rgb888;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(pos, color) in pixels {
            if pos.x >= 0
                && (pos.x as u32) < self.0.width()
                && pos.y >= 0
                && (pos.y as u32) < self.0.height()
            {
                self.0.set(pos.x as u32, pos.y as u32, color.into());
            }
        }

        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let clipped = Rect { rect: *area }.intersection(&self.0.rect());
        if let Some(r) = clipped {
            for y in r.y()..r.y_end() as i32 {
                for x in r.x()..r.x_end() as i32 {
                    self.0.set(x as u32, y as u32, color.into());
                }
            }
        }
        Ok(())
    }
}
