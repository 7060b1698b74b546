use aseload_utils::mem_reader::MemReader;

use crate::{
    error::ChunkError,
    palette::{Color, MAX_PALETTE_COLORS},
};

use super::{ChunkContext, ChunkType};

/// A run of colors, placed after skipping some palette entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PalettePacket {
    /// Entries to skip past before the first color of this packet.
    pub skip: u8,
    /// The colors, in index order.
    pub colors: Vec<Color>,
}

/// A chunk of palette packets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteChunk {
    /// The packets, in file order.
    pub packets: Vec<PalettePacket>,
}

impl PaletteChunk {
    /// The `(index, color)` pairs this chunk writes into the palette.
    ///
    /// The running index starts at 0 and moves forward by each packet's skip
    /// count, then by one for every color written. Writes past index 255 are
    /// dropped; decoded chunks never have any.
    pub fn writes(&self) -> impl Iterator<Item = (u8, Color)> + '_ {
        let mut index = 0usize;
        self.packets.iter().flat_map(move |packet| {
            index += usize::from(packet.skip);
            let start = index;
            index += packet.colors.len();
            packet
                .colors
                .iter()
                .enumerate()
                .filter_map(move |(offset, color)| {
                    Some((u8::try_from(start + offset).ok()?, *color))
                })
        })
    }
}

impl ChunkType for PaletteChunk {
    const CHUNK_TYPE: u16 = 0x0004;

    fn from_block<M>(mut reader: M, _context: &ChunkContext) -> Result<Self, ChunkError>
    where
        M: MemReader,
    {
        let num_packets = reader.read_u16_le()?;
        let mut packets = Vec::with_capacity(usize::from(num_packets).min(reader.remaining() / 2));
        let mut end = 0usize;
        for _ in 0..num_packets {
            let skip = reader.read_u8()?;
            let count = match reader.read_u8()? {
                0 => 256,
                n => usize::from(n),
            };
            end += usize::from(skip) + count;
            if end > MAX_PALETTE_COLORS {
                return Err(ChunkError::PaletteOverflow {
                    end,
                    limit: MAX_PALETTE_COLORS,
                });
            }
            let mut colors = Vec::with_capacity(count);
            for _ in 0..count {
                let [r, g, b] = reader.read_array::<3>()?;
                colors.push(Color::from_packet_rgb(r, g, b));
            }
            packets.push(PalettePacket { skip, colors });
        }
        Ok(PaletteChunk { packets })
    }
}

#[cfg(test)]
mod tests {
    use aseload_utils::mem_reader::SliceMemReader;
    use datalit::datalit;

    use super::*;
    use crate::raw::ColorDepth;

    const CONTEXT: ChunkContext = ChunkContext {
        color_depth: ColorDepth::Indexed,
        max_inflated_size: 1024,
    };

    #[test]
    fn skips_advance_the_running_index() {
        let red = Color::from_rgba(255, 0, 0, 255);
        let green = Color::from_rgba(0, 255, 0, 255);
        let blue = Color::from_rgba(0, 0, 255, 255);
        let chunk = PaletteChunk {
            packets: vec![
                PalettePacket {
                    skip: 0,
                    colors: vec![red, green],
                },
                PalettePacket {
                    skip: 1,
                    colors: vec![blue],
                },
            ],
        };
        assert_eq!(
            chunk.writes().collect::<Vec<_>>(),
            vec![(0, red), (1, green), (3, blue)]
        );
    }

    #[test]
    fn decodes_packets() {
        let data = datalit!(
            2u16_le,  // packets
            0u8,      // skip
            1u8,      // count
            0x0a141e, // rgb
            2u8,
            1u8,
            0x000000, // black
        );
        let chunk = PaletteChunk::from_block(SliceMemReader::new(&data), &CONTEXT).unwrap();
        assert_eq!(
            chunk.writes().collect::<Vec<_>>(),
            vec![
                (0, Color::from_rgba(10, 20, 30, 255)),
                (3, Color::TRANSPARENT),
            ]
        );
    }

    #[test]
    fn zero_count_means_256_colors() {
        let mut data = datalit!(1u16_le, 0u8, 0u8).to_vec();
        data.extend(std::iter::repeat_n(7u8, 256 * 3));
        let chunk = PaletteChunk::from_block(SliceMemReader::new(&data), &CONTEXT).unwrap();
        assert_eq!(chunk.packets[0].colors.len(), 256);
    }

    #[test]
    fn truncated_packet_is_an_error() {
        let data = datalit!(1u16_le, 0u8, 2u8, 0x0102_0304);
        assert!(matches!(
            PaletteChunk::from_block(SliceMemReader::new(&data), &CONTEXT),
            Err(ChunkError::InvalidData(_))
        ));
    }

    #[test]
    fn skips_past_last_index_are_rejected() {
        let data = datalit!(
            2u16_le,
            255u8, // skip
            1u8,
            0x010203,
            0u8, // writes index 256
            1u8,
            0x010203,
        );
        assert!(matches!(
            PaletteChunk::from_block(SliceMemReader::new(&data), &CONTEXT),
            Err(ChunkError::PaletteOverflow {
                end: 257,
                limit: 256,
            })
        ));
    }

    #[test]
    fn packets_may_reach_last_index() {
        let mut data = datalit!(1u16_le, 250u8, 6u8).to_vec();
        data.extend([9u8; 6 * 3]);
        let chunk = PaletteChunk::from_block(SliceMemReader::new(&data), &CONTEXT).unwrap();
        let last = chunk.writes().last().unwrap();
        assert_eq!(last.0, 255);
    }
}
