use std::{fmt, ops::Index};

use embedded_graphics::pixelcolor::Rgb888;

/// An 8-bit RGB color in the non-linear sRGB color space.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Color(pub(crate) [u8; 3]);

impl Color {
    pub const BLACK: Self = Self([0, 0, 0]);
    pub const WHITE: Self = Self([255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0]);
    pub const GREEN: Self = Self([0, 255, 0]);
    pub const BLUE: Self = Self([0, 0, 255]);

    #[inline]
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// Returns the ITU-R 601-2 luma value of this color.
    ///
    /// This is the conversion used when producing grayscale thumbnails.
    pub fn luma(&self) -> u8 {
        let [r, g, b] = self.0.map(f32::from);
        (r * 0.299 + g * 0.587 + b * 0.114).round().clamp(0.0, 255.0) as u8
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())
    }
}

impl Index<usize> for Color {
    type Output = u8;

    #[inline]
    fn index(&self, index: usize) -> &u8 {
        &self.0[index]
    }
}

impl From<Color> for Rgb888 {
    fn from(c: Color) -> Self {
        Rgb888::new(c.r(), c.g(), c.b())
    }
}

impl From<Rgb888> for Color {
    fn from(c: Rgb888) -> Self {
        use embedded_graphics::pixelcolor::RgbColor;
        Color([c.r(), c.g(), c.b()])
    }
}
