//! Ingestion: format sniffing, the spec's hard size/dimension limits, and
//! decode to an RGBA raster (spec.md §4.1.6, §6).

use crate::error::{GrimoireError, Location};
use image::DynamicImage;
use std::path::Path;

pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;
pub const MAX_DIMENSION: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ImageKind {
    fn from_magic(bytes: &[u8]) -> Option<ImageKind> {
        if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
            return Some(ImageKind::Png);
        }
        if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
            return Some(ImageKind::Jpeg);
        }
        if bytes.len() >= 6 && (&bytes[0..6] == b"GIF87a" || &bytes[0..6] == b"GIF89a") {
            return Some(ImageKind::Gif);
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(ImageKind::WebP);
        }
        None
    }

    fn matches_extension(self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        match self {
            ImageKind::Png => ext == "png",
            ImageKind::Jpeg => ext == "jpg" || ext == "jpeg",
            ImageKind::Gif => ext == "gif",
            ImageKind::WebP => ext == "webp",
        }
    }
}

/// Validates file size, sniffs the header, confirms it matches the
/// declared extension (when a path is available), and decodes to RGBA.
/// GIFs are decoded to their first frame only (spec.md §1).
pub fn load_and_validate(path: Option<&Path>, bytes: &[u8]) -> Result<DynamicImage, GrimoireError> {
    let location = || match path {
        Some(p) => Location::path(p),
        None => Location::none(),
    };

    if bytes.len() as u64 > MAX_FILE_SIZE_BYTES {
        return Err(GrimoireError::UnsupportedFormat {
            location: location(),
            reason: format!(
                "file size {} bytes exceeds the {} byte limit",
                bytes.len(),
                MAX_FILE_SIZE_BYTES
            ),
        });
    }

    let kind = ImageKind::from_magic(bytes).ok_or_else(|| GrimoireError::UnsupportedFormat {
        location: location(),
        reason: "unrecognised image header; expected PNG, JPEG, GIF, or WebP".to_string(),
    })?;

    if let Some(p) = path {
        if let Some(ext) = p.extension().and_then(|e| e.to_str()) {
            if !kind.matches_extension(ext) {
                return Err(GrimoireError::UnsupportedFormat {
                    location: location(),
                    reason: format!(
                        "file extension '.{ext}' does not match detected format {kind:?}"
                    ),
                });
            }
        }
    }

    let image = load_first_frame(kind, bytes).map_err(|e| GrimoireError::ImageProcessingError {
        location: location(),
        reason: e.to_string(),
        cause: Some(Box::new(e)),
    })?;

    let (w, h) = (image.width(), image.height());
    if w > MAX_DIMENSION || h > MAX_DIMENSION {
        return Err(GrimoireError::UnsupportedFormat {
            location: location(),
            reason: format!("image dimensions {w}x{h} exceed the {MAX_DIMENSION}px limit"),
        });
    }

    Ok(image)
}

fn load_first_frame(kind: ImageKind, bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    if kind == ImageKind::Gif {
        use image::codecs::gif::GifDecoder;
        use image::{AnimationDecoder, Frame};
        let decoder = GifDecoder::new(std::io::Cursor::new(bytes))?;
        let mut frames = decoder.into_frames();
        let first: Frame = frames
            .next()
            .ok_or_else(|| {
                image::ImageError::Decoding(image::error::DecodingError::new(
                    image::error::ImageFormatHint::Exact(image::ImageFormat::Gif),
                    "GIF has no frames",
                ))
            })?
            .map_err(|e| e)?;
        return Ok(DynamicImage::ImageRgba8(first.into_buffer()));
    }
    image::load_from_memory(bytes)
}
