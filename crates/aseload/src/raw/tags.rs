use aseload_utils::mem_reader::{MemReader, MemReaderError};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::error::ChunkError;

use super::{ChunkContext, ChunkType};

/// The order in which an animation plays its frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum LoopDirection {
    /// First to last.
    Forward,
    /// Last to first.
    Reverse,
    /// First to last, then back.
    PingPong,
    /// Last to first, then back.
    PingPongReverse,
}

impl LoopDirection {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LoopDirection::Forward),
            1 => Some(LoopDirection::Reverse),
            2 => Some(LoopDirection::PingPong),
            3 => Some(LoopDirection::PingPongReverse),
            _ => None,
        }
    }
}

/// A single animation tag: a named, inclusive range of frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// First frame of the range.
    pub from_frame: u16,
    /// Last frame of the range, inclusive.
    pub to_frame: u16,
    /// Playback order.
    pub direction: LoopDirection,
    /// How many times to play the range, with 0 meaning forever.
    pub repeat: u16,
    // reserved: [0u8; 6]
    // tag color: [u8; 3] (deprecated)
    // extra: u8
    /// Tag name.
    pub name: String,
}

/// A chunk containing a list of tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagsChunk {
    /// The tags, in file order.
    pub tags: Vec<Tag>,
}

impl ChunkType for TagsChunk {
    const CHUNK_TYPE: u16 = 0x2018;

    fn from_block<M>(mut reader: M, _context: &ChunkContext) -> Result<Self, ChunkError>
    where
        M: MemReader,
    {
        let num_tags = reader.read_u16_le()?;
        reader.skip(8)?;
        let mut tags = Vec::with_capacity(usize::from(num_tags).min(reader.remaining() / 17));

        for _ in 0..num_tags {
            let from_frame = reader.read_u16_le()?;
            let to_frame = reader.read_u16_le()?;
            let direction_val = reader.read_u8()?;
            let Some(direction) = LoopDirection::from_u8(direction_val) else {
                return Err(MemReaderError::from(reader.create_invalid_data_error_msg(
                    format!("invalid loop direction {direction_val}"),
                ))
                .into());
            };
            let repeat = reader.read_u16_le()?;
            reader.skip(6)?;
            let _deprecated_color = reader.read_array::<3>()?;
            let _extra = reader.read_u8()?;
            let name = reader.read_length_prefixed_string("tag name")?;

            tags.push(Tag {
                from_frame,
                to_frame,
                direction,
                repeat,
                name,
            });
        }

        Ok(TagsChunk { tags })
    }
}
