//! Bitmap encoding.
//!
//! The compiler only needs a narrow capability from an imaging library:
//! turn a source image into a fixed-format header plus pixel bits that can be
//! written back to back into one artifact. [`BitmapEncoder`] is that seam;
//! [`PbiEncoder`] is the implementation used by default.
//!
//! # PBI format
//!
//! A 12-byte little-endian header followed by 1-bit rows:
//!
//! | field | type | value |
//! |---|---|---|
//! | `row_size_bytes` | `u16` | `ceil(w / 32) * 4` |
//! | `info_flags` | `u16` | `version << 12`, version 1 |
//! | `x`, `y` | `i16` | origin of the crop box |
//! | `w`, `h` | `i16` | size of the crop box |
//!
//! Each row is a sequence of little-endian `u32` words covering 32 pixels,
//! pixel `k` of a word stored in bit `k`.

use std::path::Path;

use image::RgbaImage;

/// Bitmap format version stored in the upper nibble of `info_flags`.
pub const PBI_VERSION: u16 = 1;

/// Size of the PBI header in bytes.
pub const PBI_HEADER_LEN: usize = 12;

/// Alpha and luminance threshold separating the pixel classes.
const THRESHOLD: u32 = 127;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by a [`BitmapEncoder`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The image could not be opened or decoded.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// The image does not fit the 16-bit dimensions of the header.
    #[error("image is {width}x{height}, larger than the bitmap header can describe")]
    TooLarge {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// Colour reduction applied when collapsing pixels to one bit.
///
/// `White` is the plain bitmap: white pixels set, black and transparent
/// clear. `Black` produces the mask for the black plane of a transparent
/// bitmap: only black pixels set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Palette {
    /// White pixels set.
    #[default]
    White,
    /// Black pixels set.
    Black,
}

impl Palette {
    /// Bit value for an RGBA pixel.
    pub fn bit(self, [r, g, b, a]: [u8; 4]) -> bool {
        if u32::from(a) < THRESHOLD {
            return false;
        }
        let is_black = (u32::from(r) + u32::from(g) + u32::from(b)) / 3 < THRESHOLD;
        match self {
            Self::White => !is_black,
            Self::Black => is_black,
        }
    }
}

// ---------------------------------------------------------------------------
// BitmapEncoder
// ---------------------------------------------------------------------------

/// An encoded bitmap: header bytes followed by pixel bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBitmap {
    /// Format header.
    pub header: Vec<u8>,
    /// Packed pixel rows.
    pub bits: Vec<u8>,
}

/// Converts a source image into a bitmap artifact.
pub trait BitmapEncoder {
    /// Encode the image at `path` with the given colour reduction.
    fn encode(&self, path: &Path, palette: Palette) -> Result<EncodedBitmap, CodecError>;
}

// ---------------------------------------------------------------------------
// PbiEncoder
// ---------------------------------------------------------------------------

/// 1-bit PBI encoder backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct PbiEncoder {
    /// Crop the output to the bounding box of non-transparent pixels.
    pub crop: bool,
}

impl Default for PbiEncoder {
    fn default() -> Self {
        Self { crop: true }
    }
}

/// Region of the source image that ends up in the bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CropBox {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl PbiEncoder {
    /// Encode an already-decoded image.
    pub fn encode_image(
        &self,
        image: &RgbaImage,
        palette: Palette,
    ) -> Result<EncodedBitmap, CodecError> {
        let bbox = self
            .crop
            .then(|| alpha_bbox(image))
            .flatten()
            .unwrap_or(CropBox {
                x: 0,
                y: 0,
                w: image.width(),
                h: image.height(),
            });

        let too_large = || CodecError::TooLarge {
            width: image.width(),
            height: image.height(),
        };
        let dim = |v: u32| i16::try_from(v).map_err(|_| too_large());

        let words_per_row = bbox.w.div_ceil(32) as usize;
        let row_size_bytes = u16::try_from(words_per_row * 4).map_err(|_| too_large())?;

        let mut header = Vec::with_capacity(PBI_HEADER_LEN);
        header.extend_from_slice(&row_size_bytes.to_le_bytes());
        header.extend_from_slice(&(PBI_VERSION << 12).to_le_bytes());
        header.extend_from_slice(&dim(bbox.x)?.to_le_bytes());
        header.extend_from_slice(&dim(bbox.y)?.to_le_bytes());
        header.extend_from_slice(&dim(bbox.w)?.to_le_bytes());
        header.extend_from_slice(&dim(bbox.h)?.to_le_bytes());

        let mut bits = Vec::with_capacity(words_per_row * 4 * bbox.h as usize);
        for y in bbox.y..bbox.y + bbox.h {
            for word_start in (0..bbox.w).step_by(32) {
                let mut word = 0u32;
                for shift in 0..32 {
                    let col = word_start + shift;
                    if col >= bbox.w {
                        break;
                    }
                    if palette.bit(image.get_pixel(bbox.x + col, y).0) {
                        word |= 1 << shift;
                    }
                }
                bits.extend_from_slice(&word.to_le_bytes());
            }
        }

        Ok(EncodedBitmap { header, bits })
    }
}

impl BitmapEncoder for PbiEncoder {
    fn encode(&self, path: &Path, palette: Palette) -> Result<EncodedBitmap, CodecError> {
        let image = image::open(path)?.to_rgba8();
        tracing::trace!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            ?palette,
            "encoding bitmap"
        );
        self.encode_image(&image, palette)
    }
}

/// Bounding box of all pixels with non-zero alpha, `None` if there are none.
fn alpha_bbox(image: &RgbaImage) -> Option<CropBox> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut any = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[3] != 0 {
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    any.then(|| CropBox {
        x: min_x,
        y: min_y,
        w: max_x - min_x + 1,
        h: max_y - min_y + 1,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
