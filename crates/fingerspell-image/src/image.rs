use std::{fmt, io::Cursor, path::Path};

use anyhow::Context;
use image::{imageops, DynamicImage, GrayImage, ImageBuffer, ImageOutputFormat, Rgb, RgbImage};

use crate::{Color, Rect, Resolution};

/// Resampling filter used when changing the size of an [`Image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResizeFilter {
    /// Linear (tent) filter whose support grows with the downscaling factor.
    ///
    /// When shrinking, every destination pixel averages all source pixels it covers, which
    /// makes this behave like an area-averaging filter. This is the filter to use for
    /// normalizing hand crops.
    Smooth,
    /// Lanczos filter with a window of 3, used for thumbnails.
    Lanczos3,
}

impl ResizeFilter {
    fn to_filter_type(self) -> imageops::FilterType {
        match self {
            ResizeFilter::Smooth => imageops::FilterType::Triangle,
            ResizeFilter::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

/// An owned 8-bit sRGB image without alpha channel.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub(crate) buf: RgbImage,
}

impl Image {
    /// Creates a black image of a specified size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Creates an image filled with `color`.
    pub fn filled(res: Resolution, color: Color) -> Self {
        Self {
            buf: ImageBuffer::from_pixel(res.width(), res.height(), Rgb(color.0)),
        }
    }

    /// Creates an image from tightly packed RGB bytes.
    ///
    /// # Panics
    ///
    /// Panics if `buf` does not contain exactly `3 * width * height` bytes.
    pub fn from_rgb8(res: Resolution, buf: &[u8]) -> Self {
        let expected_size = res.width() as usize * res.height() as usize * 3;
        assert_eq!(
            expected_size,
            buf.len(),
            "incorrect buffer size {} for {} image (expected {} bytes)",
            buf.len(),
            res,
            expected_size,
        );

        Self {
            buf: ImageBuffer::from_vec(res.width(), res.height(), buf.to_vec())
                .expect("buffer size does not match image resolution"),
        }
    }

    /// Loads an image from the filesystem.
    ///
    /// The format is inferred from the file extension (JPEG and PNG are supported).
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let buf = image::open(path)
            .with_context(|| format!("failed to load image '{}'", path.display()))?
            .to_rgb8();
        log::trace!("loaded {}x{} image from '{}'", buf.width(), buf.height(), path.display());
        Ok(Self { buf })
    }

    /// Decodes an in-memory JPEG or PNG image.
    ///
    /// Any alpha channel is discarded.
    pub fn decode(data: &[u8]) -> anyhow::Result<Self> {
        let buf = image::load_from_memory(data)?.to_rgb8();
        Ok(Self { buf })
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this image.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] covering this image.
    ///
    /// The rectangle will be positioned at `(0, 0)` and have the width and height of the image.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.resolution().rect()
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf[(x, y)].0)
    }

    /// Sets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)] = Rgb(color.0);
    }

    /// Copies the pixels covered by `rect` into a new [`Image`].
    ///
    /// # Panics
    ///
    /// Panics if `rect` is not fully contained in this image.
    pub fn crop(&self, rect: Rect) -> Image {
        assert!(
            self.rect().contains_rect(&rect),
            "crop region {:?} exceeds {:?}",
            rect,
            self,
        );

        let view = imageops::crop_imm(
            &self.buf,
            rect.x() as u32,
            rect.y() as u32,
            rect.width(),
            rect.height(),
        );
        Image {
            buf: view.to_image(),
        }
    }

    /// Resamples this image to `res`, stretching it if the aspect ratio differs.
    ///
    /// Resizing to the image's own resolution returns an exact copy.
    pub fn resize(&self, res: Resolution, filter: ResizeFilter) -> Image {
        if res == self.resolution() {
            return self.clone();
        }

        Image {
            buf: imageops::resize(&self.buf, res.width(), res.height(), filter.to_filter_type()),
        }
    }

    /// Copies all of `src` into `self`, placing its top left corner at `(x, y)`.
    ///
    /// Parts of `src` that fall outside of `self` are discarded.
    pub fn paste(&mut self, src: &Image, x: i64, y: i64) {
        imageops::replace(&mut self.buf, &src.buf, x, y);
    }

    /// Returns a horizontally mirrored copy of this image.
    pub fn flip_horizontal(&self) -> Image {
        Image {
            buf: imageops::flip_horizontal(&self.buf),
        }
    }

    /// Encodes the luma channel of this image as a baseline JPEG.
    ///
    /// `quality` ranges from 1 (smallest) to 100 (best).
    pub fn encode_luma_jpeg(&self, quality: u8) -> anyhow::Result<Vec<u8>> {
        let luma = GrayImage::from_fn(self.width(), self.height(), |x, y| {
            image::Luma([self.get(x, y).luma()])
        });

        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(luma).write_to(&mut out, ImageOutputFormat::Jpeg(quality))?;
        Ok(out.into_inner())
    }

    /// Returns the raw, tightly packed RGB data of this image.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Image", self.width(), self.height())
    }
}
