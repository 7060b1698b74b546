use aseload_utils::mem_reader::{MemReader, MemReaderError};
use bitflags::bitflags;

use crate::{error::ChunkError, palette::Color};

use super::{ChunkContext, ChunkType};

bitflags! {
    /// Flags for a palette entry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct PaletteEntryFlags: u16 {
        /// The entry has a name.
        const HAS_NAME = 0x0001;
    }
}

/// A single entry of a palette resize chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteSizeEntry {
    /// The entry color, with an explicit alpha.
    pub color: Color,
    /// The entry name, if it has one.
    pub name: Option<String>,
}

/// A chunk that resizes the palette and sets a range of its entries.
///
/// This is decoded for completeness; the assembled palette is built from
/// palette packet chunks only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteSizeChunk {
    /// The palette size after this chunk.
    pub new_size: u32,
    /// Index of the first entry set.
    pub first_index: u32,
    /// Index of the last entry set, inclusive.
    pub last_index: u32,
    // reserved: [0u8; 8]
    /// Entries for `first_index..=last_index`.
    pub entries: Vec<PaletteSizeEntry>,
}

impl ChunkType for PaletteSizeChunk {
    const CHUNK_TYPE: u16 = 0x2019;

    fn from_block<M>(mut reader: M, _context: &ChunkContext) -> Result<Self, ChunkError>
    where
        M: MemReader,
    {
        let new_size = reader.read_u32_le()?;
        let first_index = reader.read_u32_le()?;
        let last_index = reader.read_u32_le()?;
        reader.skip(8)?;

        let Some(span) = last_index.checked_sub(first_index) else {
            return Err(MemReaderError::from(reader.create_invalid_data_error_msg(format!(
                "palette range {first_index}..={last_index} is reversed"
            )))
            .into());
        };
        let entry_count = usize::try_from(span).unwrap_or(usize::MAX).saturating_add(1);

        let mut entries = Vec::with_capacity(entry_count.min(reader.remaining() / 6));
        for _ in 0..entry_count {
            let flags = PaletteEntryFlags::from_bits_truncate(reader.read_u16_le()?);
            let [r, g, b, a] = reader.read_array::<4>()?;
            let name = if flags.contains(PaletteEntryFlags::HAS_NAME) {
                Some(reader.read_length_prefixed_string("entry name")?)
            } else {
                None
            };
            entries.push(PaletteSizeEntry {
                color: Color::from_rgba(r, g, b, a),
                name,
            });
        }

        Ok(PaletteSizeChunk {
            new_size,
            first_index,
            last_index,
            entries,
        })
    }
}
