//! Re-encodes uploads to JPEG with EXIF orientation baked into the pixels.
//!
//! Phone photos usually store their rotation in EXIF tag 0x0112 instead of
//! rotating the pixel data. The upstream model only sees pixels, so the
//! transform is applied here and the re-encoded file carries no EXIF at all.
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::config::DEFAULT_QUALITY;
use crate::error::AppResult;
use crate::upload::form::FormField;

pub const NORMALIZED_MIME: &str = "image/jpeg";
pub const NORMALIZED_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    quality: u8,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl ImageNormalizer {
    pub fn new(quality: u8) -> Self {
        ImageNormalizer { quality: quality.clamp(1, 100) }
    }

    /// Decode `bytes`, apply the EXIF orientation and encode as JPEG.
    pub fn normalize(&self, bytes: &[u8]) -> AppResult<Vec<u8>> {
        let decoded = image::load_from_memory(bytes)?;
        let orientation = read_exif_orientation(bytes);
        let oriented = apply_orientation(decoded, orientation);
        let rgb = oriented.to_rgb8();

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality).encode_image(&rgb)?;
        tracing::debug!(
            orientation,
            width = rgb.width(),
            height = rgb.height(),
            in_bytes = bytes.len(),
            out_bytes = out.len(),
            "Normalized upload"
        );
        Ok(out)
    }

    /// Normalize one multipart field. Empty fields are what browsers send for
    /// an unselected file input; those pass through as-is.
    pub fn normalize_field(&self, field: FormField) -> AppResult<FormField> {
        if field.data.is_empty() {
            return Ok(field);
        }
        let data = self.normalize(&field.data)?;
        let stem = field
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).file_stem())
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&field.name)
            .to_string();
        Ok(FormField {
            file_name: Some(format!("{}.{}", stem, NORMALIZED_EXTENSION)),
            content_type: Some(NORMALIZED_MIME.to_string()),
            data: data.into(),
            name: field.name,
        })
    }
}

/// Read the EXIF orientation tag. Missing or unreadable EXIF counts as 1.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation value to the decoded image.
///
/// 1 = normal, 2 = mirrored, 3 = 180deg, 4 = flipped vertically,
/// 5 = mirrored + 90deg CW, 6 = 90deg CW, 7 = mirrored + 270deg CW, 8 = 270deg CW.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
