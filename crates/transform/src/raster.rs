//! Raster image inspection and lossless PNG recompression.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

/// Width and height, read from the image header only.
pub(crate) fn dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .or_raise(|| ErrorKind::parse("image", "unreadable image header"))?
        .into_dimensions()
        .or_raise(|| ErrorKind::parse("image", "unknown image format"))
}

/// Re-encode a PNG at the best compression level. Returns `None` when the
/// input isn't a PNG or the re-encoded file isn't smaller.
pub(crate) fn recompress_png(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    if image::guess_format(bytes).ok() != Some(ImageFormat::Png) {
        return Ok(None);
    }
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .or_raise(|| ErrorKind::parse("image", "could not decode PNG"))?;
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    decoded.write_with_encoder(encoder).or_raise(|| ErrorKind::output("image", "could not encode PNG"))?;
    Ok((out.len() < bytes.len()).then_some(out))
}
