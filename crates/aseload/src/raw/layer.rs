use aseload_utils::mem_reader::MemReader;
use bitflags::bitflags;

use crate::error::ChunkError;

use super::{ChunkContext, ChunkType};

bitflags! {
    /// Flags for a layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LayerFlags: u16 {
        /// The layer is shown.
        const VISIBLE = 0x0001;
        /// The layer can be edited.
        const EDITABLE = 0x0002;
        /// The layer cannot be moved.
        const LOCK_MOVEMENT = 0x0004;
        /// The layer is the background.
        const BACKGROUND = 0x0008;
        /// Linked cels are preferred when adding frames.
        const PREFER_LINKED_CELS = 0x0010;
        /// The group is shown collapsed.
        const COLLAPSED = 0x0020;
        /// The layer is a reference layer.
        const REFERENCE = 0x0040;
    }
}

/// What a layer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    /// Image cels.
    Normal,
    /// Other layers.
    Group,
    /// Tilemap cels drawn from the given tileset.
    Tilemap {
        /// ID of the tileset the layer's tilemaps refer to.
        tileset_id: u32,
    },
}

/// How a layer is blended onto the layers below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[expect(missing_docs)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Addition,
    Subtraction,
    Divide,
}

impl BlendMode {
    fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0 => BlendMode::Normal,
            1 => BlendMode::Multiply,
            2 => BlendMode::Screen,
            3 => BlendMode::Overlay,
            4 => BlendMode::Darken,
            5 => BlendMode::Lighten,
            6 => BlendMode::ColorDodge,
            7 => BlendMode::ColorBurn,
            8 => BlendMode::HardLight,
            9 => BlendMode::SoftLight,
            10 => BlendMode::Difference,
            11 => BlendMode::Exclusion,
            12 => BlendMode::Hue,
            13 => BlendMode::Saturation,
            14 => BlendMode::Color,
            15 => BlendMode::Luminosity,
            16 => BlendMode::Addition,
            17 => BlendMode::Subtraction,
            18 => BlendMode::Divide,
            _ => return None,
        })
    }
}

/// A chunk describing a layer.
///
/// Layers are numbered by the order their chunks appear in the document;
/// cels refer to layers by that number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerChunk {
    /// Layer flags.
    pub flags: LayerFlags,
    /// What the layer holds.
    pub layer_type: LayerType,
    /// Nesting depth below the top level.
    pub child_level: u16,
    // default_width: u16 (ignored)
    // default_height: u16 (ignored)
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Opacity, if the header says layer opacity is valid.
    pub opacity: u8,
    // padding: [0u8; 3]
    /// Layer name.
    pub name: String,
    /// Layer UUID, when the document stores them.
    pub uuid: Option<[u8; 16]>,
}

impl ChunkType for LayerChunk {
    const CHUNK_TYPE: u16 = 0x2004;

    fn from_block<M>(mut reader: M, _context: &ChunkContext) -> Result<Self, ChunkError>
    where
        M: MemReader,
    {
        let flags = LayerFlags::from_bits_truncate(reader.read_u16_le()?);
        let layer_type_val = reader.read_u16_le()?;
        let child_level = reader.read_u16_le()?;
        let _default_width = reader.read_u16_le()?;
        let _default_height = reader.read_u16_le()?;
        let blend_mode_val = reader.read_u16_le()?;
        let opacity = reader.read_u8()?;
        reader.skip(3)?;
        let name = reader.read_length_prefixed_string("name")?;

        let layer_type = match layer_type_val {
            0 => LayerType::Normal,
            1 => LayerType::Group,
            2 => LayerType::Tilemap {
                tileset_id: reader.read_u32_le()?,
            },
            _ => {
                return Err(ChunkError::InvalidData(
                    reader
                        .create_invalid_data_error_msg(format!(
                            "invalid layer type {layer_type_val}"
                        ))
                        .into(),
                ));
            }
        };

        let Some(blend_mode) = BlendMode::from_u16(blend_mode_val) else {
            return Err(ChunkError::InvalidData(
                reader
                    .create_invalid_data_error_msg(format!("invalid blend mode {blend_mode_val}"))
                    .into(),
            ));
        };

        let uuid = if reader.remaining() >= 16 {
            Some(reader.read_array::<16>()?)
        } else {
            None
        };

        Ok(LayerChunk {
            flags,
            layer_type,
            child_level,
            blend_mode,
            opacity,
            name,
            uuid,
        })
    }
}
