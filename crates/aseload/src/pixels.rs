//! Reconstruction of pixel and tile grids from flat decompressed buffers.
//!
//! All grids are row-major: the cell at `(x, y)` of a grid `width` cells wide
//! is at index `y * width + x`.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{error::ChunkError, palette::Color, raw::ColorDepth};

/// Computes `width * height * unit` without overflowing.
fn grid_len(width: u16, height: u16, unit: usize) -> Option<usize> {
    usize::from(width)
        .checked_mul(usize::from(height))?
        .checked_mul(unit)
}

/// Pixel data of an image, before palette resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum PixelGrid {
    /// One palette index per pixel.
    Indexed(Vec<u8>),
    /// One color per pixel.
    Rgba(Vec<Color>),
}

impl PixelGrid {
    /// Slices `bytes` into pixels of the given color depth.
    ///
    /// Fails unless `bytes` holds exactly `width * height` pixels.
    pub(crate) fn from_bytes(
        bytes: &[u8],
        depth: ColorDepth,
        width: u16,
        height: u16,
    ) -> Result<Self, ChunkError> {
        let bytes_per_pixel = depth.bytes_per_pixel()?;
        let expected_bytes = grid_len(width, height, bytes_per_pixel).unwrap_or(usize::MAX);
        if bytes.len() != expected_bytes {
            return Err(ChunkError::PixelCountMismatch {
                expected_bytes,
                actual_bytes: bytes.len(),
            });
        }
        Ok(Self::from_exact_bytes(bytes, depth))
    }

    /// Slices `bytes` into pixels, assuming the length is already checked.
    fn from_exact_bytes(bytes: &[u8], depth: ColorDepth) -> Self {
        match depth {
            ColorDepth::Rgba => PixelGrid::Rgba(
                bytes
                    .chunks_exact(4)
                    .map(|px| Color::from_rgba(px[0], px[1], px[2], px[3]))
                    .collect(),
            ),
            ColorDepth::Indexed | ColorDepth::Grayscale => PixelGrid::Indexed(bytes.to_vec()),
        }
    }

    /// The number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            PixelGrid::Indexed(pixels) => pixels.len(),
            PixelGrid::Rgba(pixels) => pixels.len(),
        }
    }

    /// Returns true if there are no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits an inflated tileset image into one grid per tile.
///
/// The image is a vertical strip of tiles, so each tile's pixels are one
/// contiguous run of `tile_width * tile_height` pixels.
pub(crate) fn slice_tiles(
    bytes: &[u8],
    depth: ColorDepth,
    tile_width: u16,
    tile_height: u16,
    declared_tiles: u32,
) -> Result<Vec<PixelGrid>, ChunkError> {
    let bytes_per_pixel = depth.bytes_per_pixel()?;
    let tile_bytes = grid_len(tile_width, tile_height, bytes_per_pixel).unwrap_or(usize::MAX);
    let mismatch = || ChunkError::TilesetSizeMismatch {
        actual_bytes: bytes.len(),
        tile_bytes,
        declared_tiles,
    };

    if tile_bytes == 0 {
        return if bytes.is_empty() && declared_tiles == 0 {
            Ok(Vec::new())
        } else {
            Err(mismatch())
        };
    }
    if bytes.len() % tile_bytes != 0 {
        return Err(mismatch());
    }
    let tile_count = bytes.len() / tile_bytes;
    if u32::try_from(tile_count).ok() != Some(declared_tiles) {
        return Err(mismatch());
    }

    Ok(bytes
        .chunks_exact(tile_bytes)
        .map(|tile| PixelGrid::from_exact_bytes(tile, depth))
        .collect())
}

/// The masks that locate each field within a packed tile word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TileBitmasks {
    /// Bits holding the tile ID.
    pub tile_id: u32,
    /// Bit set when the tile is flipped horizontally.
    pub x_flip: u32,
    /// Bit set when the tile is flipped vertically.
    pub y_flip: u32,
    /// Bit set when the tile is flipped along its diagonal.
    pub diagonal_flip: u32,
}

impl TileBitmasks {
    /// Unpacks a tile word.
    ///
    /// The tile ID is shifted down by the number of trailing zero bits in its
    /// mask, so an ID field need not start at bit 0.
    #[must_use]
    pub fn extract(&self, word: u32) -> TileRef {
        let tile_id = if self.tile_id == 0 {
            0
        } else {
            (word & self.tile_id) >> self.tile_id.trailing_zeros()
        };
        TileRef {
            word,
            tile_id,
            x_flip: (word & self.x_flip) != 0,
            y_flip: (word & self.y_flip) != 0,
            diagonal_flip: (word & self.diagonal_flip) != 0,
        }
    }
}

/// A reference to a tile from one tilemap cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TileRef {
    /// The packed word the other fields were extracted from.
    pub word: u32,
    /// Index of the tile within its tileset.
    pub tile_id: u32,
    /// Mirrored horizontally.
    pub x_flip: bool,
    /// Mirrored vertically.
    pub y_flip: bool,
    /// Mirrored along the top-left to bottom-right diagonal.
    pub diagonal_flip: bool,
}

/// Reads `width * height` little-endian 32-bit tile words, row by row.
pub(crate) fn read_tile_words(
    bytes: &[u8],
    width: u16,
    height: u16,
    masks: &TileBitmasks,
) -> Result<Vec<TileRef>, ChunkError> {
    let expected_tiles = grid_len(width, height, 1).unwrap_or(usize::MAX);
    if bytes.len() % 4 != 0 || bytes.len() / 4 != expected_tiles {
        return Err(ChunkError::TileCountMismatch {
            expected_tiles,
            actual_bytes: bytes.len(),
        });
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|word| masks.extract(u32::from_le_bytes([word[0], word[1], word[2], word[3]])))
        .collect())
}

#[cfg(test)]
mod tests {
    use datalit::datalit;

    use super::*;

    const STANDARD_MASKS: TileBitmasks = TileBitmasks {
        tile_id: 0x1fff_ffff,
        x_flip: 0x8000_0000,
        y_flip: 0x4000_0000,
        diagonal_flip: 0x2000_0000,
    };

    #[test]
    fn extracts_tile_fields_through_masks() {
        let tile = STANDARD_MASKS.extract(0xA000_0007);
        assert_eq!(
            tile,
            TileRef {
                word: 0xA000_0007,
                tile_id: 7,
                x_flip: true,
                y_flip: false,
                diagonal_flip: true,
            }
        );
    }

    #[test]
    fn shifts_id_fields_that_do_not_start_at_bit_zero() {
        let masks = TileBitmasks {
            tile_id: 0x0000_ff00,
            x_flip: 0x0000_0001,
            y_flip: 0x0000_0002,
            diagonal_flip: 0x0000_0004,
        };
        let tile = masks.extract(0x0000_2a02);
        assert_eq!(tile.tile_id, 0x2a);
        assert!(!tile.x_flip);
        assert!(tile.y_flip);
        assert!(!tile.diagonal_flip);
    }

    #[test]
    fn zero_id_mask_yields_tile_zero() {
        let masks = TileBitmasks {
            tile_id: 0,
            ..STANDARD_MASKS
        };
        assert_eq!(masks.extract(0xffff_ffff).tile_id, 0);
    }

    #[test]
    fn reads_tile_words_row_major() {
        let bytes = datalit!(0u32_le, 1u32_le, 2u32_le, 3u32_le, 4u32_le, 5u32_le);
        let tiles = read_tile_words(&bytes, 3, 2, &STANDARD_MASKS).unwrap();
        let ids: Vec<u32> = tiles.iter().map(|t| t.tile_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn tile_word_count_must_match_grid() {
        let bytes = vec![0u8; 4 * 5];
        assert!(matches!(
            read_tile_words(&bytes, 3, 2, &STANDARD_MASKS),
            Err(ChunkError::TileCountMismatch {
                expected_tiles: 6,
                actual_bytes: 20,
            })
        ));
        assert!(matches!(
            read_tile_words(&[0u8; 23], 3, 2, &STANDARD_MASKS),
            Err(ChunkError::TileCountMismatch { .. })
        ));
    }

    #[test]
    fn tileset_of_exact_multiple_yields_each_tile() {
        let bytes: Vec<u8> = (0..12).collect();
        let tiles = slice_tiles(&bytes, ColorDepth::Indexed, 2, 2, 3).unwrap();
        assert_eq!(
            tiles,
            vec![
                PixelGrid::Indexed(vec![0, 1, 2, 3]),
                PixelGrid::Indexed(vec![4, 5, 6, 7]),
                PixelGrid::Indexed(vec![8, 9, 10, 11]),
            ]
        );
    }

    #[test]
    fn tileset_of_partial_tile_is_rejected() {
        let bytes = vec![0u8; 13];
        assert!(matches!(
            slice_tiles(&bytes, ColorDepth::Indexed, 2, 2, 3),
            Err(ChunkError::TilesetSizeMismatch {
                actual_bytes: 13,
                tile_bytes: 4,
                declared_tiles: 3,
            })
        ));
    }

    #[test]
    fn tileset_must_match_declared_count() {
        let bytes = vec![0u8; 8];
        assert!(matches!(
            slice_tiles(&bytes, ColorDepth::Indexed, 2, 2, 3),
            Err(ChunkError::TilesetSizeMismatch { .. })
        ));
    }

    #[test]
    fn rgba_tiles_use_four_bytes_per_pixel() {
        let bytes = vec![9u8; 2 * 2 * 4 * 2];
        let tiles = slice_tiles(&bytes, ColorDepth::Rgba, 2, 2, 2).unwrap();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].len(), 4);
    }

    #[test]
    fn grayscale_pixels_are_unsupported() {
        assert!(matches!(
            PixelGrid::from_bytes(&[0; 8], ColorDepth::Grayscale, 2, 2),
            Err(ChunkError::UnsupportedColorDepth(16))
        ));
    }

    #[test]
    fn pixel_count_must_match_dimensions() {
        assert!(matches!(
            PixelGrid::from_bytes(&[0; 15], ColorDepth::Rgba, 2, 2),
            Err(ChunkError::PixelCountMismatch {
                expected_bytes: 16,
                actual_bytes: 15,
            })
        ));
        let grid = PixelGrid::from_bytes(&[1, 2, 3, 4, 5, 6, 7, 8], ColorDepth::Rgba, 2, 1).unwrap();
        assert_eq!(
            grid,
            PixelGrid::Rgba(vec![
                Color::from_rgba(1, 2, 3, 4),
                Color::from_rgba(5, 6, 7, 8),
            ])
        );
    }
}
