//! Tiny media files generated on the fly for tests.

use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, ImageFormat, Rgba, RgbaImage, RgbImage};
use std::io::Cursor;

/// Length of the PNG signature plus the IHDR chunk, which always comes first.
const AFTER_IHDR: usize = 8 + 4 + 4 + 13 + 4;

/// A black PNG, optionally with a `tEXt` chunk of `(keyword, text)` right
/// after the header.
pub(crate) fn png(width: u32, height: u32, text: Option<(&str, &str)>) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height).write_to(&mut out, ImageFormat::Png).unwrap();
    let mut bytes = out.into_inner();
    if let Some((keyword, text)) = text {
        let mut data = keyword.as_bytes().to_vec();
        data.push(0);
        data.extend_from_slice(text.as_bytes());

        let mut chunk = (data.len() as u32).to_be_bytes().to_vec();
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(b"tEXt");
        hasher.update(&data);
        chunk.extend_from_slice(b"tEXt");
        chunk.extend_from_slice(&data);
        chunk.extend_from_slice(&hasher.finalize().to_be_bytes());
        bytes.splice(AFTER_IHDR..AFTER_IHDR, chunk);
    }
    bytes
}

/// A GIF of `frames` frames, each a different shade so none can be merged.
pub(crate) fn gif(width: u32, height: u32, frames: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        let frames = (0..frames).map(|i| {
            let shade = (i * 5 % 256) as u8;
            let buffer = RgbaImage::from_pixel(width, height, Rgba([shade, 255 - shade, 0, 255]));
            Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(100, 1))
        });
        encoder.encode_frames(frames).unwrap();
        // Dropping the encoder writes the trailer.
    }
    out
}
