use aseload_utils::mem_reader::MemReader;
use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{
    error::ChunkError,
    pixels::{self, PixelGrid, TileRef},
};

use super::{ChunkContext, ChunkType};

bitflags! {
    /// Flags for a tileset.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TilesetFlags: u32 {
        /// Includes link to external file.
        const EXTERNAL_FILE = 0x0001;
        /// Includes tiles inside this file.
        const EMBEDDED = 0x0002;
        /// Tile 0 is empty.
        const ZERO_IS_EMPTY = 0x0004;
        /// Match X-flip.
        const MATCH_X_FLIP = 0x0008;
        /// Match Y-flip.
        const MATCH_Y_FLIP = 0x0010;
        /// Match Diagonal-flip.
        const MATCH_D_FLIP = 0x0020;
    }
}

/// How tilemaps using a tileset mark a cell that shows no tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum EmptyTile {
    /// Tile ID 0 is empty.
    ZeroId,
    /// A packed tile word of `0xFFFFFFFF` is empty, whatever the ID mask.
    AllBitsSet,
}

impl EmptyTile {
    /// Returns true if `tile` is an empty cell under this convention.
    #[must_use]
    pub fn matches(self, tile: &TileRef) -> bool {
        match self {
            EmptyTile::ZeroId => tile.tile_id == 0,
            EmptyTile::AllBitsSet => tile.word == u32::MAX,
        }
    }
}

/// Where an externally stored tileset lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExternalTileset {
    /// ID of the external file entry.
    pub file_id: u32,
    /// ID of the tileset within that file.
    pub tileset_id: u32,
}

/// A chunk describing a tileset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TilesetChunk {
    /// Tileset ID, referred to by tilemap layers.
    pub id: u32,
    /// Tileset flags.
    pub flags: TilesetFlags,
    /// Number of tiles declared by the chunk.
    pub num_tiles: u32,
    /// Tile width in pixels.
    pub tile_width: u16,
    /// Tile height in pixels.
    pub tile_height: u16,
    /// Number shown for the first tile in editors.
    pub base_index: i16,
    // reserved: [0u8; 14]
    /// Tileset name.
    pub name: String,
    /// The external link, if the tileset has one.
    pub external: Option<ExternalTileset>,
    /// One grid per tile, if the tiles are embedded.
    pub tiles: Vec<PixelGrid>,
}

impl TilesetChunk {
    /// How tilemaps using this tileset mark an empty cell.
    #[must_use]
    pub fn empty_tile(&self) -> EmptyTile {
        if self.flags.contains(TilesetFlags::ZERO_IS_EMPTY) {
            EmptyTile::ZeroId
        } else {
            EmptyTile::AllBitsSet
        }
    }
}

impl ChunkType for TilesetChunk {
    const CHUNK_TYPE: u16 = 0x2023;

    fn from_block<M>(mut reader: M, context: &ChunkContext) -> Result<Self, ChunkError>
    where
        M: MemReader,
    {
        let id = reader.read_u32_le()?;
        let flags = TilesetFlags::from_bits_truncate(reader.read_u32_le()?);
        let num_tiles = reader.read_u32_le()?;
        let tile_width = reader.read_u16_le()?;
        let tile_height = reader.read_u16_le()?;
        let base_index = reader.read_i16_le()?;
        reader.skip(14)?;
        let name = reader.read_length_prefixed_string("tileset name")?;

        let external = if flags.contains(TilesetFlags::EXTERNAL_FILE) {
            Some(ExternalTileset {
                file_id: reader.read_u32_le()?,
                tileset_id: reader.read_u32_le()?,
            })
        } else {
            None
        };

        let tiles = if flags.contains(TilesetFlags::EMBEDDED) {
            let len = reader.read_u32_le()?;
            let compressed = reader.read_bytes(usize::try_from(len).unwrap_or(usize::MAX))?;
            context.color_depth.bytes_per_pixel()?;
            let image = context.inflate(&compressed)?;
            pixels::slice_tiles(
                &image,
                context.color_depth,
                tile_width,
                tile_height,
                num_tiles,
            )?
        } else {
            Vec::new()
        };

        Ok(TilesetChunk {
            id,
            flags,
            num_tiles,
            tile_width,
            tile_height,
            base_index,
            name,
            external,
            tiles,
        })
    }
}
