//! Still and animated raster images, decoded with the `image` crate.

use crate::error::{ErrorKind, Result};
use crate::models::Dimensions;
use crate::strategy::RasterFormat;
use exn::ResultExt;
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, Frames, ImageReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// What the decoder could tell us about a raster file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RasterInfo {
    pub(crate) dimensions: Dimensions,
    /// Always at least one.
    pub(crate) frames: u64,
}

pub(crate) fn inspect(path: &Path, format: RasterFormat) -> Result<RasterInfo> {
    let (width, height) = ImageReader::open(path)
        .or_raise(|| ErrorKind::Io)?
        // Trust the content over the extension; generated files get renamed.
        .with_guessed_format()
        .or_raise(|| ErrorKind::Io)?
        .into_dimensions()
        .or_raise(|| ErrorKind::Decode)?;
    let frames = match format.can_animate() {
        true => frame_count(path, format)?,
        false => 1,
    };
    Ok(RasterInfo {
        dimensions: Dimensions::new(width, height),
        frames,
    })
}

/// Count frames by decoding them. Real per-frame timing isn't reliable across
/// formats, so this count is all the duration calculation gets to use.
fn frame_count(path: &Path, format: RasterFormat) -> Result<u64> {
    let reader = BufReader::new(File::open(path).or_raise(|| ErrorKind::Io)?);
    match format {
        RasterFormat::Gif => count(GifDecoder::new(reader).or_raise(|| ErrorKind::Decode)?.into_frames()),
        RasterFormat::WebP => {
            let decoder = WebPDecoder::new(reader).or_raise(|| ErrorKind::Decode)?;
            match decoder.has_animation() {
                true => count(decoder.into_frames()),
                false => Ok(1),
            }
        },
        RasterFormat::Png => {
            let decoder = PngDecoder::new(reader).or_raise(|| ErrorKind::Decode)?;
            match decoder.is_apng().or_raise(|| ErrorKind::Decode)? {
                true => count(decoder.apng().or_raise(|| ErrorKind::Decode)?.into_frames()),
                false => Ok(1),
            }
        },
        RasterFormat::Jpeg | RasterFormat::Bmp => Ok(1),
    }
}

fn count(frames: Frames<'_>) -> Result<u64> {
    let mut total = 0;
    for frame in frames {
        frame.or_raise(|| ErrorKind::Decode)?;
        total += 1;
    }
    // A container with zero decodable frames is still one (empty) image.
    Ok(total.max(1))
}
