//! Raster input: decode image files into one `DynamicImage` per page.
//!
//! Most formats carry a single frame. Two cases carry more:
//!
//! * TIFF (scanned multi-page documents, usually bilevel faxes). `image`
//!   only exposes the first directory, so TIFF goes through the `tiff` crate
//!   frame by frame.
//! * Animations (GIF, APNG, animated WebP). Each composited frame becomes
//!   its own page.

use crate::error::EngineError;
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{
    AnimationDecoder, DynamicImage, GrayAlphaImage, GrayImage, ImageBuffer, ImageError,
    ImageFormat, Luma, LumaA, Rgb, RgbImage, Rgba, RgbaImage,
};
use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;
use tracing::debug;

/// Decode every frame of a raster image.
pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<DynamicImage>, EngineError> {
    let format =
        image::guess_format(bytes).map_err(|e| EngineError::UnsupportedInput(e.to_string()))?;
    let failed = |e: ImageError| EngineError::Decode(format!("{format:?}: {e}"));

    let frames = match format {
        ImageFormat::Tiff => decode_tiff(bytes)?,
        ImageFormat::Gif => {
            animation_frames(GifDecoder::new(Cursor::new(bytes)).map_err(failed)?, format)?
        }
        ImageFormat::Png => {
            let decoder = PngDecoder::new(Cursor::new(bytes)).map_err(failed)?;
            if decoder.is_apng().map_err(failed)? {
                animation_frames(decoder.apng().map_err(failed)?, format)?
            } else {
                vec![DynamicImage::from_decoder(decoder).map_err(failed)?]
            }
        }
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(Cursor::new(bytes)).map_err(failed)?;
            if decoder.has_animation() {
                animation_frames(decoder, format)?
            } else {
                vec![DynamicImage::from_decoder(decoder).map_err(failed)?]
            }
        }
        other => vec![image::load_from_memory_with_format(bytes, other).map_err(failed)?],
    };

    debug!("Decoded {:?} input → {} frame(s)", format, frames.len());
    Ok(frames)
}

fn animation_frames<'a>(
    decoder: impl AnimationDecoder<'a>,
    format: ImageFormat,
) -> Result<Vec<DynamicImage>, EngineError> {
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| EngineError::Decode(format!("{format:?} animation: {e}")))?;

    if frames.is_empty() {
        return Err(EngineError::Decode(format!(
            "{format:?} animation has no frames"
        )));
    }

    Ok(frames
        .into_iter()
        .map(|frame| DynamicImage::ImageRgba8(frame.into_buffer()))
        .collect())
}

fn decode_tiff(bytes: &[u8]) -> Result<Vec<DynamicImage>, EngineError> {
    let tiff_err = |e: tiff::TiffError| EngineError::Decode(format!("TIFF: {e}"));

    let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(tiff_err)?;
    let mut frames = Vec::new();

    loop {
        let (width, height) = decoder.dimensions().map_err(tiff_err)?;
        let color = decoder.colortype().map_err(tiff_err)?;
        let data = decoder.read_image().map_err(tiff_err)?;
        frames.push(frame_to_image(width, height, color, data, frames.len())?);

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(tiff_err)?;
    }

    Ok(frames)
}

fn frame_to_image(
    width: u32,
    height: u32,
    color: ColorType,
    data: DecodingResult,
    frame: usize,
) -> Result<DynamicImage, EngineError> {
    let image = match (color, data) {
        (ColorType::Gray(8), DecodingResult::U8(buf)) => {
            GrayImage::from_raw(width, height, buf).map(DynamicImage::ImageLuma8)
        }
        // Bilevel and low-depth grey: rows are bit-packed and byte-aligned.
        (ColorType::Gray(bits @ (1 | 2 | 4)), DecodingResult::U8(buf)) => {
            unpack_samples(&buf, width, height, bits)
                .map(|levels| scale_to_u8(levels, bits))
                .and_then(|levels| GrayImage::from_raw(width, height, levels))
                .map(DynamicImage::ImageLuma8)
        }
        (ColorType::GrayA(8), DecodingResult::U8(buf)) => {
            GrayAlphaImage::from_raw(width, height, buf).map(DynamicImage::ImageLumaA8)
        }
        (ColorType::RGB(8), DecodingResult::U8(buf)) => {
            RgbImage::from_raw(width, height, buf).map(DynamicImage::ImageRgb8)
        }
        (ColorType::RGBA(8), DecodingResult::U8(buf)) => {
            RgbaImage::from_raw(width, height, buf).map(DynamicImage::ImageRgba8)
        }
        (ColorType::CMYK(8), DecodingResult::U8(buf)) => {
            let rgb: Vec<u8> = buf.chunks_exact(4).flat_map(|c| cmyk_to_rgb(c, 255)).collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        (ColorType::Gray(16), DecodingResult::U16(buf)) => {
            ImageBuffer::<Luma<u16>, _>::from_raw(width, height, buf).map(DynamicImage::ImageLuma16)
        }
        (ColorType::GrayA(16), DecodingResult::U16(buf)) => {
            ImageBuffer::<LumaA<u16>, _>::from_raw(width, height, buf)
                .map(DynamicImage::ImageLumaA16)
        }
        (ColorType::RGB(16), DecodingResult::U16(buf)) => {
            ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, buf).map(DynamicImage::ImageRgb16)
        }
        (ColorType::RGBA(16), DecodingResult::U16(buf)) => {
            ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgba16)
        }
        (ColorType::CMYK(16), DecodingResult::U16(buf)) => {
            let rgb: Vec<u16> = buf
                .chunks_exact(4)
                .flat_map(|c| cmyk_to_rgb(c, u16::MAX))
                .collect();
            ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, rgb).map(DynamicImage::ImageRgb16)
        }
        (other, _) => {
            return Err(EngineError::UnsupportedInput(format!(
                "TIFF frame {frame}: colour type {other:?}"
            )))
        }
    };

    image.ok_or_else(|| {
        EngineError::Decode(format!(
            "TIFF frame {frame}: pixel buffer does not match {width}x{height}"
        ))
    })
}

/// Split byte-aligned rows of `bits`-wide samples into one byte per sample.
///
/// Returns `None` when `buf` is shorter than `height` rows.
fn unpack_samples(buf: &[u8], width: u32, height: u32, bits: u8) -> Option<Vec<u8>> {
    let width = width as usize;
    let height = height as usize;
    let bits = usize::from(bits);
    let row_bytes = (width * bits).div_ceil(8);
    if row_bytes == 0 {
        return Some(Vec::new());
    }

    let rows = buf.get(..row_bytes.checked_mul(height)?)?;
    let mask = (1u16 << bits) - 1;
    let mut samples = Vec::with_capacity(width * height);
    for row in rows.chunks_exact(row_bytes) {
        for x in 0..width {
            let bit = x * bits;
            let shift = 8 - bits - bit % 8;
            samples.push(((u16::from(row[bit / 8]) >> shift) & mask) as u8);
        }
    }
    Some(samples)
}

/// Stretch `bits`-deep levels to the full 0–255 range.
fn scale_to_u8(mut levels: Vec<u8>, bits: u8) -> Vec<u8> {
    let max = (1u16 << bits) - 1;
    for level in &mut levels {
        *level = (u16::from(*level) * 255 / max) as u8;
    }
    levels
}

/// Naive CMYK → RGB without a colour profile.
fn cmyk_to_rgb<T>(cmyk: &[T], full: T) -> [T; 3]
where
    T: Copy + Into<u32> + TryFrom<u32>,
{
    let full_u32: u32 = full.into();
    let k = full_u32 - cmyk[3].into();
    let channel = |c: T| {
        let value = (full_u32 - c.into()) * k / full_u32;
        T::try_from(value).unwrap_or(full)
    };
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}
