//! Detection of embedded generation-workflow payloads.
//!
//! Generators stash the graph (and the prompt it was queued with) in whatever
//! free-form metadata slot a container offers: PNG text chunks, the EXIF or
//! XMP chunk of a WebP, JPEG application segments, GIF comments, or container
//! tags of a video. Only presence is detected; the payload is never parsed.

use crate::error::{ErrorKind, Result};
use crate::strategy::RasterFormat;
use exn::ResultExt;
use memchr::memmem;
use std::path::Path;

/// Metadata keys that carry a workflow payload.
const KEYWORDS: [&str; 2] = ["workflow", "prompt"];

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Read the file and look for a workflow payload in the container's metadata.
pub(crate) fn raster(path: &Path, format: RasterFormat) -> Result<bool> {
    if matches!(format, RasterFormat::Bmp) {
        return Ok(false);
    }
    let bytes = std::fs::read(path).or_raise(|| ErrorKind::Io)?;
    Ok(match format {
        RasterFormat::Png => png(&bytes),
        RasterFormat::Jpeg => jpeg(&bytes),
        RasterFormat::WebP => webp(&bytes),
        RasterFormat::Gif => gif(&bytes),
        RasterFormat::Bmp => false,
    })
}

/// Whether a metadata key names a workflow payload (`workflow`, `prompt`).
pub(crate) fn is_workflow_key(key: &str) -> bool {
    KEYWORDS.iter().any(|k| key.trim().eq_ignore_ascii_case(k))
}

/// Whether a free-form blob mentions a workflow payload anywhere in it.
pub(crate) fn mentions_workflow(blob: &[u8]) -> bool {
    let lower = blob.to_ascii_lowercase();
    KEYWORDS.iter().any(|k| memmem::find(&lower, k.as_bytes()).is_some())
}

fn be_u32(bytes: &[u8], at: usize) -> Option<usize> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize)
}

fn le_u32(bytes: &[u8], at: usize) -> Option<usize> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
}

/// `tEXt`, `iTXt` and `zTXt` chunks all start with a NUL-terminated keyword.
pub(crate) fn png(bytes: &[u8]) -> bool {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return false;
    }
    let mut at = PNG_SIGNATURE.len();
    while let Some(length) = be_u32(bytes, at) {
        let Some(kind) = bytes.get(at + 4..at + 8) else { break };
        let Some(data) = bytes.get(at + 8..at + 8 + length) else { break };
        match kind {
            b"tEXt" | b"iTXt" | b"zTXt" => {
                let keyword = data.split(|b| *b == 0).next().unwrap_or_default();
                if is_workflow_key(&String::from_utf8_lossy(keyword)) {
                    return true;
                }
            },
            b"IEND" => break,
            _ => {},
        }
        // length + type + data + CRC
        at += 12 + length;
    }
    false
}

/// RIFF chunks are little-endian and padded to an even length.
pub(crate) fn webp(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WEBP" {
        return false;
    }
    let mut at = 12;
    while let Some(length) = le_u32(bytes, at + 4) {
        let fourcc = &bytes[at..at + 4];
        let Some(data) = bytes.get(at + 8..at + 8 + length) else { break };
        if matches!(fourcc, b"EXIF" | b"XMP ") && mentions_workflow(data) {
            return true;
        }
        at += 8 + length + (length & 1);
    }
    false
}

/// Walks marker segments up to the start of scan; `APPn` and `COM` segments
/// are searched.
pub(crate) fn jpeg(bytes: &[u8]) -> bool {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return false;
    }
    let mut at = 2;
    while at + 4 <= bytes.len() {
        if bytes[at] != 0xFF {
            break;
        }
        let marker = bytes[at + 1];
        match marker {
            // Fill bytes.
            0xFF => {
                at += 1;
                continue;
            },
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => {
                at += 2;
                continue;
            },
            // Start of scan / end of image: no more metadata.
            0xDA | 0xD9 => break,
            _ => {},
        }
        let length = usize::from(u16::from_be_bytes([bytes[at + 2], bytes[at + 3]]));
        if length < 2 {
            break;
        }
        let Some(data) = bytes.get(at + 4..at + 2 + length) else { break };
        if matches!(marker, 0xE0..=0xEF | 0xFE) && mentions_workflow(data) {
            return true;
        }
        at += 2 + length;
    }
    false
}

/// Comment and application extensions are searched; image data is skipped.
pub(crate) fn gif(bytes: &[u8]) -> bool {
    if bytes.len() < 13 || !(bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) {
        return false;
    }
    let mut at = 13 + color_table_len(bytes[10]);
    while let Some(&introducer) = bytes.get(at) {
        match introducer {
            // Extension
            0x21 => {
                let Some(&label) = bytes.get(at + 1) else { break };
                let Some((data, next)) = sub_blocks(bytes, at + 2) else { break };
                if matches!(label, 0xFE | 0xFF) && mentions_workflow(&data) {
                    return true;
                }
                at = next;
            },
            // Image descriptor, optional local colour table, LZW code size, data.
            0x2C => {
                let Some(&flags) = bytes.get(at + 9) else { break };
                let start = at + 10 + color_table_len(flags) + 1;
                let Some((_, next)) = sub_blocks(bytes, start) else { break };
                at = next;
            },
            // Trailer, or garbage.
            _ => break,
        }
    }
    false
}

fn color_table_len(flags: u8) -> usize {
    match flags & 0x80 {
        0 => 0,
        _ => 3 * (1 << ((flags & 0x07) + 1)),
    }
}

/// Concatenate a run of GIF data sub-blocks starting at `at`, returning the
/// data and the offset just past the block terminator.
fn sub_blocks(bytes: &[u8], mut at: usize) -> Option<(Vec<u8>, usize)> {
    let mut data = Vec::new();
    loop {
        let size = usize::from(*bytes.get(at)?);
        at += 1;
        if size == 0 {
            return Some((data, at));
        }
        data.extend_from_slice(bytes.get(at..at + size)?);
        at += size;
    }
}
