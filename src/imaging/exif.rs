//! Minimal EXIF segment handling for JPEG files.
//!
//! Three jobs, no full EXIF parser:
//! - find the APP1 `Exif\0\0` segment in a source JPEG,
//! - read (and reset) the Orientation tag (`0x0112`) in IFD0,
//! - splice a segment into a freshly encoded JPEG when metadata is kept.
//!
//! Decoded pixels are always rotated upright on load, so a carried-over
//! segment must have its orientation reset to 1 or viewers rotate twice.

use image::DynamicImage;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const ORIENTATION_TAG: u16 = 0x0112;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;

/// A marker segment in the JPEG header: `data[start..end]` includes the
/// `0xFF marker` pair and the length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    marker: u8,
    start: usize,
    end: usize,
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

/// Walk header segments after SOI, stopping at SOS (image data) or on the
/// first malformed marker.
fn header_segments(data: &[u8]) -> Vec<Segment> {
    let mut segments = Vec::new();
    if !is_jpeg(data) {
        return segments;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        // Fill bytes between markers
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // SOS or EOI: no more header segments
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        // Markers without length field
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let end = pos + 2 + len;
        if len < 2 || end > data.len() {
            break;
        }
        segments.push(Segment {
            marker,
            start: pos,
            end,
        });
        pos = end;
    }
    segments
}

/// The complete APP1 EXIF segment (marker, length and payload), if any.
pub fn find_exif_segment(data: &[u8]) -> Option<&[u8]> {
    header_segments(data)
        .into_iter()
        .find(|s| s.marker == APP1 && data[s.start + 4..s.end].starts_with(EXIF_HEADER))
        .map(|s| &data[s.start..s.end])
}

/// Byte offset of the orientation value inside `segment`, plus the TIFF byte order.
fn locate_orientation(segment: &[u8]) -> Option<(usize, bool)> {
    let tiff_start = 4 + EXIF_HEADER.len();
    if segment.len() < tiff_start + 8 || !segment[4..].starts_with(EXIF_HEADER) {
        return None;
    }
    let tiff = &segment[tiff_start..];

    let little_endian = match &tiff[0..2] {
        b"II" => true,
        b"MM" => false,
        _ => return None,
    };
    let read_u16 = |at: usize| -> Option<u16> {
        let bytes = [*tiff.get(at)?, *tiff.get(at + 1)?];
        Some(if little_endian {
            u16::from_le_bytes(bytes)
        } else {
            u16::from_be_bytes(bytes)
        })
    };
    let read_u32 = |at: usize| -> Option<u32> {
        let bytes = [
            *tiff.get(at)?,
            *tiff.get(at + 1)?,
            *tiff.get(at + 2)?,
            *tiff.get(at + 3)?,
        ];
        Some(if little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    };

    if read_u16(2)? != 42 {
        return None;
    }
    let ifd0 = read_u32(4)? as usize;
    let count = read_u16(ifd0)? as usize;

    // Each IFD entry: tag (2) + type (2) + count (4) + value/offset (4)
    for i in 0..count {
        let entry = ifd0 + 2 + i * 12;
        if read_u16(entry)? == ORIENTATION_TAG {
            let value_at = entry + 8;
            read_u16(value_at)?;
            return Some((tiff_start + value_at, little_endian));
        }
    }
    None
}

/// Orientation tag value (1–8) stored in an EXIF segment.
pub fn read_orientation(segment: &[u8]) -> Option<u16> {
    let (at, little_endian) = locate_orientation(segment)?;
    let bytes = [segment[at], segment[at + 1]];
    let value = if little_endian {
        u16::from_le_bytes(bytes)
    } else {
        u16::from_be_bytes(bytes)
    };
    (1..=8).contains(&value).then_some(value)
}

/// Copy of `segment` with its orientation set to 1 (upright).
pub fn with_orientation_reset(segment: &[u8]) -> Vec<u8> {
    let mut out = segment.to_vec();
    if let Some((at, little_endian)) = locate_orientation(segment) {
        let bytes = if little_endian {
            1u16.to_le_bytes()
        } else {
            1u16.to_be_bytes()
        };
        out[at..at + 2].copy_from_slice(&bytes);
    }
    out
}

/// Insert an EXIF segment into an encoded JPEG, after SOI and any JFIF APP0.
///
/// Returns `None` when `jpeg` is not a JPEG stream.
pub fn insert_exif_segment(jpeg: &[u8], segment: &[u8]) -> Option<Vec<u8>> {
    if !is_jpeg(jpeg) {
        return None;
    }
    let insert_at = header_segments(jpeg)
        .first()
        .filter(|s| s.marker == APP0 && s.start == 2)
        .map(|s| s.end)
        .unwrap_or(2);

    let mut out = Vec::with_capacity(jpeg.len() + segment.len());
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(segment);
    out.extend_from_slice(&jpeg[insert_at..]);
    Some(out)
}

/// Rotate/flip decoded pixels so an image with the given orientation is upright.
pub fn apply_orientation(image: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}
