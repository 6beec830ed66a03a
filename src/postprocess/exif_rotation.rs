//! EXIF orientation lookup.
//!
//! Rotation correction is cosmetic metadata: a still without a readable
//! orientation tag is simply treated as upright.

use crate::geometry::Rotation;
use ::exif::{In, Reader, Tag};
use std::io::Cursor;

/// Reads the orientation tag of an encoded image and maps it to a rotation.
///
/// Missing tags, unknown values and parse failures all yield [`Rotation::Deg0`].
pub fn read_rotation(data: &[u8]) -> Rotation {
    match read_orientation_tag(data) {
        Ok(Some(tag)) => {
            let rotation = rotation_for_tag(tag);
            tracing::debug!(tag, %rotation, "Read EXIF orientation");
            rotation
        }
        Ok(None) => Rotation::Deg0,
        Err(e) => {
            tracing::debug!(error = %e, "No EXIF orientation, assuming upright");
            Rotation::Deg0
        }
    }
}

fn read_orientation_tag(data: &[u8]) -> Result<Option<u32>, ::exif::Error> {
    let exif = Reader::new().read_from_container(&mut Cursor::new(data))?;
    Ok(exif
        .get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0)))
}

/// Maps a TIFF orientation value to the clockwise rotation it encodes.
///
/// Mirrored variants (2, 4, 5, 7) carry no rotation a camera would write
/// and are treated as upright.
pub fn rotation_for_tag(tag: u32) -> Rotation {
    match tag {
        6 => Rotation::Deg90,
        3 => Rotation::Deg180,
        8 => Rotation::Deg270,
        _ => Rotation::Deg0,
    }
}

/// TIFF orientation value for a clockwise rotation.
pub fn tag_for_rotation(rotation: Rotation) -> u16 {
    match rotation {
        Rotation::Deg0 => 1,
        Rotation::Deg90 => 6,
        Rotation::Deg180 => 3,
        Rotation::Deg270 => 8,
    }
}

/// Prepends an APP1 segment holding only an orientation tag to a JPEG stream,
/// the way a driver tags its stills. Non-JPEG input is returned unchanged.
pub fn with_orientation(jpeg: &[u8], rotation: Rotation) -> Vec<u8> {
    const SOI: [u8; 2] = [0xFF, 0xD8];
    if !jpeg.starts_with(&SOI) {
        return jpeg.to_vec();
    }

    let mut tiff = Vec::with_capacity(26);
    tiff.extend_from_slice(b"MM\x00\x2A");
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    // Orientation, SHORT, count 1, value left-justified in the offset field.
    tiff.extend_from_slice(&0x0112u16.to_be_bytes());
    tiff.extend_from_slice(&3u16.to_be_bytes());
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&tag_for_rotation(rotation).to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes());

    let segment_len = (2 + 6 + tiff.len()) as u16;

    let mut out = Vec::with_capacity(jpeg.len() + usize::from(segment_len) + 2);
    out.extend_from_slice(&SOI);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\x00\x00");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[SOI.len()..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};

    fn plain_jpeg() -> Vec<u8> {
        let pixels = vec![128u8; 4 * 2 * 3];
        let mut out = Vec::new();
        JpegEncoder::new(&mut out)
            .encode(&pixels, 4, 2, ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    #[test]
    fn test_tagged_rotation_is_read_back() {
        let jpeg = plain_jpeg();
        for rotation in [
            Rotation::Deg0,
            Rotation::Deg90,
            Rotation::Deg180,
            Rotation::Deg270,
        ] {
            assert_eq!(read_rotation(&with_orientation(&jpeg, rotation)), rotation);
        }
    }

    #[test]
    fn test_untagged_jpeg_is_upright() {
        assert_eq!(read_rotation(&plain_jpeg()), Rotation::Deg0);
    }

    #[test]
    fn test_garbage_is_upright() {
        assert_eq!(read_rotation(b"definitely not an image"), Rotation::Deg0);
        assert_eq!(read_rotation(&[]), Rotation::Deg0);
    }

    #[test]
    fn test_mirrored_tags_map_to_upright() {
        assert_eq!(rotation_for_tag(2), Rotation::Deg0);
        assert_eq!(rotation_for_tag(7), Rotation::Deg0);
        assert_eq!(rotation_for_tag(6), Rotation::Deg90);
    }
}
