//! Page handle backed by an in-memory `DynamicImage`.
//!
//! Both backends hand out [`RasterPage`]s: pdfium renders a page into a
//! bitmap, the raster backend decodes a frame. From here on every page is
//! just pixels plus the output settings chosen for it.

use super::PageHandle;
use crate::config::OutputFormat;
use crate::error::EngineError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use std::borrow::Cow;
use std::io::Cursor;
use tracing::debug;

/// A single page's pixels and its pending output settings.
#[derive(Debug, Clone)]
pub struct RasterPage {
    image: DynamicImage,
    quality: u64,
    format: Option<OutputFormat>,
}

impl RasterPage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            quality: crate::config::DEFAULT_QUALITY,
            format: None,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

impl PageHandle for RasterPage {
    fn flatten(&mut self) -> Result<(), EngineError> {
        if self.image.color().has_alpha() {
            self.image = DynamicImage::ImageRgb8(composite_on_white(&self.image));
        }
        Ok(())
    }

    fn set_compression_quality(&mut self, quality: u64) -> Result<(), EngineError> {
        self.quality = quality;
        Ok(())
    }

    fn set_format(&mut self, format: OutputFormat) -> Result<(), EngineError> {
        self.format = Some(format);
        Ok(())
    }

    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn rotate(&mut self, degrees: f64) -> Result<(), EngineError> {
        let turns = degrees / 90.0;
        if !turns.is_finite() || turns.fract() != 0.0 {
            return Err(EngineError::InvalidArgument(format!(
                "rotation must be a multiple of 90 degrees, got {degrees}"
            )));
        }
        self.image = match (turns as i64).rem_euclid(4) {
            0 => return Ok(()),
            1 => self.image.rotate90(),
            2 => self.image.rotate180(),
            _ => self.image.rotate270(),
        };
        Ok(())
    }

    fn to_blob(&self) -> Result<Vec<u8>, EngineError> {
        let format = self
            .format
            .ok_or_else(|| EngineError::InvalidArgument("output format not set".into()))?;

        let image = encodable(&self.image, format);
        let mut buf = Cursor::new(Vec::new());
        let result = match format {
            OutputFormat::Jpeg => {
                let quality = jpeg_quality(self.quality);
                image.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
            }
            OutputFormat::Png => {
                let (compression, filter) = png_settings(self.quality);
                let encoder = PngEncoder::new_with_quality(&mut buf, compression, filter);
                image.write_with_encoder(encoder)
            }
            OutputFormat::Tiff => image.write_with_encoder(TiffEncoder::new(&mut buf)),
        };
        result.map_err(|e| EngineError::Encode(format!("{format}: {e}")))?;

        let bytes = buf.into_inner();
        debug!(
            "Encoded {}x{} page as {} → {} bytes",
            self.image.width(),
            self.image.height(),
            format,
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Alpha-composite every pixel over an opaque white background.
fn composite_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = u32::from(px[3]);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

/// Narrow the pixel layout to what the target codec can write.
fn encodable(image: &DynamicImage, format: OutputFormat) -> Cow<'_, DynamicImage> {
    let supported = match format {
        OutputFormat::Jpeg => {
            matches!(image, DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_))
        }
        OutputFormat::Png => {
            !matches!(image, DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_))
        }
        OutputFormat::Tiff => matches!(
            image,
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_)
        ),
    };
    if supported {
        Cow::Borrowed(image)
    } else if image.color().has_alpha() && format != OutputFormat::Jpeg {
        Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8()))
    } else {
        Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8()))
    }
}

fn jpeg_quality(quality: u64) -> u8 {
    quality.clamp(1, 100) as u8
}

/// Tens digit picks the deflate effort, units digit the row filter.
fn png_settings(quality: u64) -> (CompressionType, FilterType) {
    let compression = match (quality / 10) % 10 {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    };
    let filter = match quality % 10 {
        0 => FilterType::NoFilter,
        1 => FilterType::Sub,
        2 => FilterType::Up,
        3 => FilterType::Avg,
        4 => FilterType::Paeth,
        _ => FilterType::Adaptive,
    };
    (compression, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn solid(width: u32, height: u32) -> RasterPage {
        RasterPage::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([255, 0, 0, 255]),
        )))
    }

    #[test]
    fn flatten_removes_alpha() {
        let mut page = RasterPage::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            2,
            2,
            Rgba([0, 0, 0, 0]),
        )));
        page.flatten().unwrap();
        assert!(!page.image().color().has_alpha());
        // Fully transparent pixels become the white background.
        assert_eq!(page.image().get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn flatten_keeps_opaque_colour() {
        let mut page = solid(3, 3);
        page.flatten().unwrap();
        assert_eq!(page.image().get_pixel(1, 1), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn rotate_negative_quarter_swaps_dimensions() {
        let mut page = solid(80, 60);
        page.rotate(-90.0).unwrap();
        assert_eq!((page.width(), page.height()), (60, 80));
    }

    #[test]
    fn rotate_full_turn_is_identity() {
        let mut page = solid(80, 60);
        page.rotate(360.0).unwrap();
        assert_eq!((page.width(), page.height()), (80, 60));
    }

    #[test]
    fn rotate_rejects_arbitrary_angles() {
        let mut page = solid(4, 4);
        assert!(matches!(page.rotate(45.0), Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn to_blob_requires_format() {
        let page = solid(4, 4);
        assert!(page.to_blob().is_err());
    }

    #[test]
    fn encodes_each_format() {
        for (format, expected) in [
            (OutputFormat::Jpeg, image::ImageFormat::Jpeg),
            (OutputFormat::Png, image::ImageFormat::Png),
            (OutputFormat::Tiff, image::ImageFormat::Tiff),
        ] {
            let mut page = solid(10, 6);
            page.flatten().unwrap();
            page.set_format(format).unwrap();
            let blob = page.to_blob().expect("encode should succeed");
            assert_eq!(image::guess_format(&blob).unwrap(), expected);
            let decoded = image::load_from_memory(&blob).expect("decodable output");
            assert_eq!(decoded.dimensions(), (10, 6));
        }
    }

    #[test]
    fn jpeg_quality_changes_size() {
        let noisy = RgbImage::from_fn(64, 64, |x, y| {
            Rgb([(x * 7) as u8, (y * 13) as u8, ((x ^ y) * 5) as u8])
        });
        let mut low = RasterPage::new(DynamicImage::ImageRgb8(noisy.clone()));
        let mut high = RasterPage::new(DynamicImage::ImageRgb8(noisy));
        for (page, q) in [(&mut low, 10), (&mut high, 95)] {
            page.set_format(OutputFormat::Jpeg).unwrap();
            page.set_compression_quality(q).unwrap();
        }
        assert!(low.to_blob().unwrap().len() < high.to_blob().unwrap().len());
    }

    #[test]
    fn jpeg_accepts_sixteen_bit_input() {
        let mut page = RasterPage::new(DynamicImage::new_rgb16(5, 5));
        page.set_format(OutputFormat::Jpeg).unwrap();
        assert!(page.to_blob().is_ok());
    }

    #[test]
    fn png_quality_mapping() {
        assert!(matches!(png_settings(85), (CompressionType::Best, FilterType::Adaptive)));
        assert!(matches!(png_settings(0), (CompressionType::Fast, FilterType::NoFilter)));
        assert!(matches!(png_settings(54), (CompressionType::Default, FilterType::Paeth)));
    }

    #[test]
    fn jpeg_quality_is_clamped() {
        assert_eq!(jpeg_quality(0), 1);
        assert_eq!(jpeg_quality(85), 85);
        assert_eq!(jpeg_quality(1000), 100);
        assert_eq!(jpeg_quality(u64::MAX), 100);
    }
}
