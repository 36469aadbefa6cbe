use std::io::Cursor;

use engine_logging::job_debug;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};

use crate::{ImageSettings, ProgressReporter, ReduceError, Reducer, SourceFile};

const QUALITY_STEP: u8 = 10;
const DOWNSCALE_FACTOR: f32 = 0.9;
const ENCODE_PROGRESS_START: u8 = 30;
const ENCODE_PROGRESS_SPAN: usize = 65;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Quality can be traded for size.
    Lossy,
    /// Only dimensions can be traded for size.
    Lossless,
    /// Re-encoding would drop content (animation frames, icon sizes).
    Keep,
}

fn strategy_for(format: ImageFormat) -> Strategy {
    match format {
        ImageFormat::Jpeg => Strategy::Lossy,
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp | ImageFormat::Tiff => {
            Strategy::Lossless
        }
        _ => Strategy::Keep,
    }
}

/// Recompresses raster images in their own format, capping the longest side and
/// working towards a byte target.
#[derive(Debug, Clone)]
pub struct ImageReducer {
    settings: ImageSettings,
}

impl ImageReducer {
    pub fn new(settings: ImageSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Reducer for ImageReducer {
    async fn reduce(
        &self,
        file: &SourceFile,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<u8>, ReduceError> {
        progress.report(5);
        let format = image::guess_format(&file.bytes).map_err(decode_error)?;
        let strategy = strategy_for(format);
        if strategy == Strategy::Keep {
            job_debug!(progress.job_id(), "{:?} is kept as is", format);
            progress.report(100);
            return Ok(file.bytes.to_vec());
        }

        let bytes = file.bytes.clone();
        let max_dimension = self.settings.max_dimension.max(1);
        let mut img = tokio::task::spawn_blocking(move || {
            image::load_from_memory_with_format(&bytes, format)
                .map(|img| fit_within(img, max_dimension))
        })
        .await?
        .map_err(decode_error)?;
        progress.report(ENCODE_PROGRESS_START);

        let attempts = self.settings.max_attempts.max(1);
        let mut quality = self.settings.initial_quality.clamp(1, 100);
        let min_quality = self.settings.min_quality.clamp(1, quality);
        let mut shrink = false;
        let mut best: Option<Vec<u8>> = None;

        for attempt in 0..attempts {
            let (next, encoded) = tokio::task::spawn_blocking(move || {
                let img = if shrink { downscale(img) } else { img };
                let encoded = encode(&img, format, quality);
                (img, encoded)
            })
            .await?;
            img = next;
            let encoded = encoded.map_err(|err| ReduceError::Decode(err.to_string()))?;
            job_debug!(
                progress.job_id(),
                "attempt {} quality {} {}x{} -> {} bytes",
                attempt + 1,
                quality,
                img.width(),
                img.height(),
                encoded.len()
            );

            let fits = encoded.len() as u64 <= self.settings.max_output_bytes;
            if best.as_ref().is_none_or(|b| encoded.len() < b.len()) {
                best = Some(encoded);
            }
            let done = ENCODE_PROGRESS_SPAN * (attempt + 1) / attempts;
            progress.report(ENCODE_PROGRESS_START + done as u8);
            if fits {
                break;
            }

            if strategy == Strategy::Lossy && quality > min_quality {
                quality = quality.saturating_sub(QUALITY_STEP).max(min_quality);
                shrink = false;
            } else {
                shrink = true;
            }
        }

        progress.report(100);
        Ok(best.unwrap_or_else(|| file.bytes.to_vec()))
    }
}

fn decode_error(err: ImageError) -> ReduceError {
    ReduceError::Decode(err.to_string())
}

fn fit_within(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    if img.width().max(img.height()) <= max_dimension {
        return img;
    }
    img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

fn downscale(img: DynamicImage) -> DynamicImage {
    let width = ((img.width() as f32 * DOWNSCALE_FACTOR) as u32).max(1);
    let height = ((img.height() as f32 * DOWNSCALE_FACTOR) as u32).max(1);
    img.resize(width, height, FilterType::Lanczos3)
}

fn encode(img: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(&rgb)?;
        }
        ImageFormat::Png => {
            img.write_with_encoder(PngEncoder::new_with_quality(
                &mut buffer,
                CompressionType::Best,
                PngFilter::Adaptive,
            ))?;
        }
        ImageFormat::WebP => {
            let img = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            img.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;
        }
        other => img.write_to(&mut Cursor::new(&mut buffer), other)?,
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_by_format() {
        assert_eq!(strategy_for(ImageFormat::Jpeg), Strategy::Lossy);
        assert_eq!(strategy_for(ImageFormat::Png), Strategy::Lossless);
        assert_eq!(strategy_for(ImageFormat::Gif), Strategy::Keep);
        assert_eq!(strategy_for(ImageFormat::Ico), Strategy::Keep);
    }

    #[test]
    fn fit_within_keeps_aspect_ratio() {
        let img = DynamicImage::new_rgb8(4000, 1000);
        let fitted = fit_within(img, 1920);
        assert_eq!((fitted.width(), fitted.height()), (1920, 480));

        let small = DynamicImage::new_rgb8(100, 50);
        let same = fit_within(small, 1920);
        assert_eq!((same.width(), same.height()), (100, 50));
    }
}
