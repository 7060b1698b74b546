use aseload_utils::mem_reader::{MemReader, MemReaderError};

use crate::{
    error::ChunkError,
    pixels::{self, PixelGrid, TileBitmasks, TileRef},
};

use super::{ChunkContext, ChunkType};

/// An image cel, with its pixels already sliced out of the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageCel {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Row-major pixels at the document color depth.
    pub pixels: PixelGrid,
}

impl ImageCel {
    fn read_raw<M: MemReader>(reader: &mut M, context: &ChunkContext) -> Result<Self, ChunkError> {
        let width = reader.read_u16_le()?;
        let height = reader.read_u16_le()?;
        let data = reader.read_remaining()?;
        let pixels = PixelGrid::from_bytes(&data, context.color_depth, width, height)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    fn read_compressed<M: MemReader>(
        reader: &mut M,
        context: &ChunkContext,
    ) -> Result<Self, ChunkError> {
        let width = reader.read_u16_le()?;
        let height = reader.read_u16_le()?;
        // Unsupported depths fail before inflating.
        context.color_depth.bytes_per_pixel()?;
        let data = context.inflate(&reader.read_remaining()?)?;
        let pixels = PixelGrid::from_bytes(&data, context.color_depth, width, height)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

/// A cel that reuses the content of the same layer's cel in another frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkedCel {
    /// The frame holding the cel to reuse.
    pub frame_position: u16,
}

impl LinkedCel {
    fn read<M: MemReader>(reader: &mut M) -> Result<Self, ChunkError> {
        let frame_position = reader.read_u16_le()?;
        Ok(Self { frame_position })
    }
}

/// A tilemap cel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TilemapCel {
    /// Width in tiles.
    pub width: u16,
    /// Height in tiles.
    pub height: u16,
    /// How the fields of each tile word were packed.
    pub bitmasks: TileBitmasks,
    /// Row-major tile references.
    pub tiles: Vec<TileRef>,
}

impl TilemapCel {
    const SUPPORTED_BITS_PER_TILE: u16 = 32;

    fn read<M: MemReader>(reader: &mut M, context: &ChunkContext) -> Result<Self, ChunkError> {
        let width = reader.read_u16_le()?;
        let height = reader.read_u16_le()?;
        let bits_per_tile = reader.read_u16_le()?;
        let bitmasks = TileBitmasks {
            tile_id: reader.read_u32_le()?,
            x_flip: reader.read_u32_le()?,
            y_flip: reader.read_u32_le()?,
            diagonal_flip: reader.read_u32_le()?,
        };
        reader.skip(10)?;
        if bits_per_tile != Self::SUPPORTED_BITS_PER_TILE {
            return Err(ChunkError::UnsupportedBitsPerTile(bits_per_tile));
        }
        let data = context.inflate(&reader.read_remaining()?)?;
        let tiles = pixels::read_tile_words(&data, width, height, &bitmasks)?;
        Ok(Self {
            width,
            height,
            bitmasks,
            tiles,
        })
    }
}

/// The specific data within a cel chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CelContent {
    /// Uncompressed pixels.
    Raw(ImageCel),
    /// A reference to another frame's cel.
    Linked(LinkedCel),
    /// Compressed pixels.
    Compressed(ImageCel),
    /// Compressed tile references.
    CompressedTilemap(TilemapCel),
}

/// A chunk placing one piece of content on a layer in the current frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CelChunk {
    /// The layer the cel is on.
    pub layer_index: u16,
    /// Horizontal position on the canvas.
    pub x: i16,
    /// Vertical position on the canvas.
    pub y: i16,
    /// Cel opacity.
    pub opacity: u8,
    /// Ordering relative to other layers in this frame.
    pub z_index: i16,
    // reserved: [0u8; 5]
    /// The cel payload.
    pub content: CelContent,
}

impl ChunkType for CelChunk {
    const CHUNK_TYPE: u16 = 0x2005;

    fn from_block<M>(mut reader: M, context: &ChunkContext) -> Result<Self, ChunkError>
    where
        M: MemReader,
    {
        let layer_index = reader.read_u16_le()?;
        let x = reader.read_i16_le()?;
        let y = reader.read_i16_le()?;
        let opacity = reader.read_u8()?;
        let cel_type_val = reader.read_u16_le()?;
        let z_index = reader.read_i16_le()?;
        reader.skip(5)?;

        if reader.is_empty() {
            return Err(ChunkError::EmptyCelPayload);
        }

        let content = match cel_type_val {
            0 => CelContent::Raw(ImageCel::read_raw(&mut reader, context)?),
            1 => CelContent::Linked(LinkedCel::read(&mut reader)?),
            2 => CelContent::Compressed(ImageCel::read_compressed(&mut reader, context)?),
            3 => CelContent::CompressedTilemap(TilemapCel::read(&mut reader, context)?),
            _ => {
                return Err(MemReaderError::from(
                    reader.create_invalid_data_error_msg(format!("invalid cel type {cel_type_val}")),
                )
                .into());
            }
        };

        Ok(CelChunk {
            layer_index,
            x,
            y,
            opacity,
            z_index,
            content,
        })
    }
}
