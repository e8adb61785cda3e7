//! Still image compression.
//!
//! Images are decoded in process, oriented according to EXIF, flattened onto
//! white, optionally downscaled, and re-encoded. JPEG and PNG are encoded
//! with the `image` crate; lossy WebP goes through FFmpeg's `libwebp`.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, Rgb, RgbImage};
use tracing::{debug, info};

use mcomp_models::{is_heic, ImageFormat, ImagePreset, Preset};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::compressor::compressed_output_path;
use crate::error::{MediaError, MediaResult};
use crate::heic::decode_heic;
use crate::video::display_name;

/// `libwebp` effort level (0 fastest, 6 smallest)
const WEBP_COMPRESSION_LEVEL: &str = "4";

/// Compress a still image into `compressed_<stem>.<format>` inside `output_dir`.
pub async fn compress_image(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    preset: Preset,
    format: ImageFormat,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let output = compressed_output_path(input, output_dir.as_ref(), format.extension());
    let profile = preset.image();

    let limit = profile
        .max_dimension
        .map(|d| format!("{}px", d))
        .unwrap_or_else(|| "full".to_string());
    info!(
        "Compressing image: {} -> {} (Q{}, max {})",
        display_name(input),
        format.as_str().to_uppercase(),
        profile.quality,
        limit
    );

    let scratch = tempfile::tempdir()?;
    let source = if is_heic(input) {
        decode_heic(input, scratch.path(), runner).await?
    } else {
        input.to_path_buf()
    };

    match format {
        ImageFormat::Jpg | ImageFormat::Png => {
            let target = output.clone();
            run_blocking(move || {
                let img = prepare_image(&source, profile)?;
                write_image(&img, &target, format, profile.quality)
            })
            .await?;
        }
        ImageFormat::Webp => {
            let intermediate = scratch.path().join("prepared.png");
            let staged = intermediate.clone();
            run_blocking(move || {
                let img = prepare_image(&source, profile)?;
                let writer = BufWriter::new(File::create(&staged)?);
                let encoder = PngEncoder::new_with_quality(
                    writer,
                    CompressionType::Fast,
                    PngFilterType::NoFilter,
                );
                img.write_with_encoder(encoder)?;
                Ok(())
            })
            .await?;

            let cmd = FfmpegCommand::new(&intermediate, &output)
                .video_codec("libwebp")
                .option("-quality", profile.quality)
                .option("-compression_level", WEBP_COMPRESSION_LEVEL);
            runner.run(&cmd).await?;
        }
    }

    if !output.exists() {
        return Err(MediaError::NoOutput);
    }

    info!("Image compressed: {}", display_name(&output));
    Ok(output)
}

/// Decode, orient, flatten and (if needed) downscale an image.
pub fn prepare_image(path: &Path, profile: ImagePreset) -> MediaResult<RgbImage> {
    let img = flatten_to_rgb(load_oriented(path)?);
    match profile.max_dimension {
        Some(max) if img.width().max(img.height()) > max => {
            let resized = fit_within(img, max);
            info!("Resized to {}x{}", resized.width(), resized.height());
            Ok(resized)
        }
        _ => Ok(img),
    }
}

/// Decode an image and apply its EXIF orientation.
pub fn load_oriented(path: &Path) -> MediaResult<DynamicImage> {
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation().unwrap_or_else(|e| {
        debug!("Unreadable orientation in {}: {}", path.display(), e);
        Orientation::NoTransforms
    });
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Convert to 8-bit RGB, compositing any alpha channel over white.
pub fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }

    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Downscale so the longest side is at most `max`, keeping aspect ratio.
pub fn fit_within(img: RgbImage, max: u32) -> RgbImage {
    if img.width().max(img.height()) <= max {
        return img;
    }
    DynamicImage::ImageRgb8(img)
        .resize(max, max, FilterType::Lanczos3)
        .into_rgb8()
}

fn write_image(img: &RgbImage, output: &Path, format: ImageFormat, quality: u8) -> MediaResult<()> {
    let writer = BufWriter::new(File::create(output)?);
    match format {
        ImageFormat::Jpg => img.write_with_encoder(JpegEncoder::new_with_quality(writer, quality))?,
        ImageFormat::Png => img.write_with_encoder(PngEncoder::new_with_quality(
            writer,
            CompressionType::Best,
            PngFilterType::Adaptive,
        ))?,
        ImageFormat::Webp => {
            return Err(MediaError::internal("WebP is encoded through FFmpeg"));
        }
    }
    Ok(())
}

/// Run CPU-bound image work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> MediaResult<T>
where
    F: FnOnce() -> MediaResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MediaError::internal(format!("image task failed: {}", e)))?
}
