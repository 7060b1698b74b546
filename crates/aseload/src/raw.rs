//! The physical layout of a sprite document: header, frames, and chunks.
//!
//! Parsing here is a single forward pass. Each chunk is decoded on its own,
//! with no knowledge of the chunks around it; cross-chunk resolution happens
//! later in [`crate::assemble()`].

use aseload_utils::mem_reader::{MemReader, SliceMemReader};
use bitflags::bitflags;

use crate::error::{ChunkError, Error, Result};

mod cel;
mod color_profile;
mod layer;
mod palette;
mod palette_size;
mod tags;
mod tileset;

pub use self::cel::{CelChunk, CelContent, ImageCel, LinkedCel, TilemapCel};
pub use self::color_profile::{ColorProfile, ColorProfileChunk, FixedPoint};
pub use self::layer::{BlendMode, LayerChunk, LayerFlags, LayerType};
pub use self::palette::{PaletteChunk, PalettePacket};
pub use self::palette_size::{PaletteSizeChunk, PaletteSizeEntry};
pub use self::tags::{LoopDirection, Tag, TagsChunk};
pub use self::tileset::{EmptyTile, ExternalTileset, TilesetChunk, TilesetFlags};

const HEADER_SIZE: usize = 128;
const HEADER_MAGIC: u16 = 0xA5E0;
const FRAME_HEADER_SIZE_U32: u32 = 16;
const FRAME_HEADER_SIZE: usize = FRAME_HEADER_SIZE_U32 as usize;
const FRAME_MAGIC: u16 = 0xF1FA;
const CHUNK_HEADER_SIZE_U32: u32 = 6;
const CHUNK_HEADER_SIZE: usize = CHUNK_HEADER_SIZE_U32 as usize;

/// Upper bound on the size of any single inflated stream, unless configured.
pub const DEFAULT_MAX_INFLATED_SIZE: usize = 256 * 1024 * 1024;

/// The color depth (bits per pixel) of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorDepth {
    /// 8-bit indexes into the palette.
    Indexed,
    /// 16-bit gray and alpha.
    Grayscale,
    /// 32-bit RGBA.
    Rgba,
}

impl ColorDepth {
    fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            8 => Some(ColorDepth::Indexed),
            16 => Some(ColorDepth::Grayscale),
            32 => Some(ColorDepth::Rgba),
            _ => None,
        }
    }

    /// The number of bits used by each pixel.
    #[must_use]
    pub fn bits_per_pixel(self) -> u16 {
        match self {
            ColorDepth::Indexed => 8,
            ColorDepth::Grayscale => 16,
            ColorDepth::Rgba => 32,
        }
    }

    /// The number of bytes per pixel, for depths whose pixels can be decoded.
    pub(crate) fn bytes_per_pixel(self) -> std::result::Result<usize, ChunkError> {
        match self {
            ColorDepth::Indexed => Ok(1),
            ColorDepth::Rgba => Ok(4),
            ColorDepth::Grayscale => Err(ChunkError::UnsupportedColorDepth(self.bits_per_pixel())),
        }
    }
}

bitflags! {
    /// Document-wide flags from the header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: u32 {
        /// Layer opacity is valid.
        const HAS_LAYER_OPACITY = 0x0001;
        /// Layer group blend mode is valid.
        const HAS_LAYER_GROUP_BLEND = 0x0002;
        /// Layers have UUIDs.
        const HAS_LAYER_UUIDS = 0x0004;
    }
}

/// The fixed 128-byte document header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// File size as recorded by the writer.
    pub file_size: u32,
    // magic_number: u16 = 0xA5E0
    /// Number of frames that follow the header.
    pub frame_count: u16,
    /// Canvas width in pixels.
    pub width: u16,
    /// Canvas height in pixels.
    pub height: u16,
    /// Color depth of every image in the document.
    pub color_depth: ColorDepth,
    /// Flags for all layers in the file.
    pub flags: HeaderFlags,
    // speed: u16 (deprecated)
    // reserved: [0u32; 2]
    /// The index of the transparent color if mode is indexed.
    pub transparent_index: u8,
    // reserved: [0u8; 3]
    /// Number of colors, with 0 standing for 256. See [`Header::num_colors`].
    pub raw_num_colors: u16,
    /// Pixel width. With `pixel_height`, gives the pixel aspect ratio.
    pub pixel_width: u8,
    /// Pixel height. With `pixel_width`, gives the pixel aspect ratio.
    pub pixel_height: u8,
    /// Grid origin.
    pub grid_x: i16,
    /// Grid origin.
    pub grid_y: i16,
    /// Grid cell width, with 0 standing for the default.
    pub grid_width: u16,
    /// Grid cell height, with 0 standing for the default.
    pub grid_height: u16,
    // reserved: [0u8; 84]
}

impl Header {
    const DEFAULT_GRID_SIZE: u16 = 16;

    fn read(reader: &mut SliceMemReader<'_>) -> Result<Self> {
        if reader.remaining() < HEADER_SIZE {
            return Err(Error::MalformedHeader(format!(
                "expected {HEADER_SIZE} bytes, found {}",
                reader.remaining()
            )));
        }
        Self::read_fields(reader).map_err(|err| Error::MalformedHeader(err.to_string()))
    }

    fn read_fields(reader: &mut SliceMemReader<'_>) -> aseload_utils::mem_reader::Result<Self> {
        let file_size = reader.read_u32_le()?;
        let magic = reader.read_u16_le()?;
        if magic != HEADER_MAGIC {
            return Err(reader
                .create_invalid_data_error_msg(format!("bad magic number {magic:#06x}"))
                .into());
        }
        let frame_count = reader.read_u16_le()?;
        let width = reader.read_u16_le()?;
        let height = reader.read_u16_le()?;
        let color_depth_bits = reader.read_u16_le()?;
        let Some(color_depth) = ColorDepth::from_bits(color_depth_bits) else {
            return Err(reader
                .create_invalid_data_error_msg(format!("invalid color depth {color_depth_bits}"))
                .into());
        };
        let flags = HeaderFlags::from_bits_truncate(reader.read_u32_le()?);
        let _speed = reader.read_u16_le()?;
        reader.skip(8)?;
        let transparent_index = reader.read_u8()?;
        reader.skip(3)?;
        let raw_num_colors = reader.read_u16_le()?;
        let pixel_width = reader.read_u8()?;
        let pixel_height = reader.read_u8()?;
        let grid_x = reader.read_i16_le()?;
        let grid_y = reader.read_i16_le()?;
        let grid_width = reader.read_u16_le()?;
        let grid_height = reader.read_u16_le()?;
        reader.skip(84)?;

        Ok(Header {
            file_size,
            frame_count,
            width,
            height,
            color_depth,
            flags,
            transparent_index,
            raw_num_colors,
            pixel_width,
            pixel_height,
            grid_x,
            grid_y,
            grid_width,
            grid_height,
        })
    }

    /// Number of colors in the palette.
    #[must_use]
    pub fn num_colors(&self) -> u32 {
        if self.raw_num_colors == 0 {
            256
        } else {
            u32::from(self.raw_num_colors)
        }
    }

    /// The pixel aspect ratio as `(width, height)`.
    ///
    /// Square unless both components are nonzero.
    #[must_use]
    pub fn pixel_ratio(&self) -> (u8, u8) {
        if self.pixel_width == 0 || self.pixel_height == 0 {
            (1, 1)
        } else {
            (self.pixel_width, self.pixel_height)
        }
    }

    /// The grid cell size as `(width, height)`, defaulting to 16×16.
    #[must_use]
    pub fn grid_size(&self) -> (u16, u16) {
        let or_default = |size| {
            if size == 0 {
                Self::DEFAULT_GRID_SIZE
            } else {
                size
            }
        };
        (or_default(self.grid_width), or_default(self.grid_height))
    }
}

/// The 16-byte header at the start of each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    /// Frame data size in bytes, including this header.
    frame_size: u32,
    // magic_number: u16 = 0xF1FA
    old_chunk_count: u16,
    duration_ms: u16,
    // reserved: [0u8; 2]
    new_chunk_count: u32,
}

impl FrameHeader {
    fn read(reader: &mut SliceMemReader<'_>, frame: usize) -> Result<Self> {
        if reader.remaining() < FRAME_HEADER_SIZE {
            return Err(Error::MalformedFrameHeader {
                frame,
                reason: format!(
                    "expected {FRAME_HEADER_SIZE} bytes, found {}",
                    reader.remaining()
                ),
            });
        }
        Self::read_fields(reader).map_err(|err| Error::MalformedFrameHeader {
            frame,
            reason: err.to_string(),
        })
    }

    fn read_fields(reader: &mut SliceMemReader<'_>) -> aseload_utils::mem_reader::Result<Self> {
        let frame_size = reader.read_u32_le()?;
        let magic = reader.read_u16_le()?;
        if magic != FRAME_MAGIC {
            return Err(reader
                .create_invalid_data_error_msg(format!("bad magic number {magic:#06x}"))
                .into());
        }
        let old_chunk_count = reader.read_u16_le()?;
        let duration_ms = reader.read_u16_le()?;
        reader.skip(2)?;
        let new_chunk_count = reader.read_u32_le()?;
        Ok(FrameHeader {
            frame_size,
            old_chunk_count,
            duration_ms,
            new_chunk_count,
        })
    }

    /// The number of chunks in the frame.
    ///
    /// The 16-bit count is authoritative only when the 32-bit count is zero.
    /// An old count of `0xFFFF` always defers to the new count.
    fn chunk_count(&self) -> u32 {
        if self.old_chunk_count == 0xFFFF {
            self.new_chunk_count
        } else if self.new_chunk_count == 0 {
            u32::from(self.old_chunk_count)
        } else {
            self.new_chunk_count
        }
    }
}

/// Settings for chunk decoding.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkContext {
    pub(crate) color_depth: ColorDepth,
    pub(crate) max_inflated_size: usize,
}

impl ChunkContext {
    pub(crate) fn inflate(&self, data: &[u8]) -> std::result::Result<Vec<u8>, ChunkError> {
        Ok(aseload_utils::compression::inflate_zlib(
            data,
            self.max_inflated_size,
        )?)
    }
}

/// A chunk type with a fixed type tag.
trait ChunkType: Sized {
    const CHUNK_TYPE: u16;

    fn from_block<M>(reader: M, context: &ChunkContext) -> std::result::Result<Self, ChunkError>
    where
        M: MemReader;
}

/// A decoded chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// Palette packets (0x0004).
    Palette(PaletteChunk),
    /// A layer description (0x2004).
    Layer(LayerChunk),
    /// A cel (0x2005).
    Cel(CelChunk),
    /// The color profile (0x2007).
    ColorProfile(ColorProfileChunk),
    /// Animation tags (0x2018).
    Tags(TagsChunk),
    /// A palette resize with explicit entries (0x2019).
    PaletteSize(PaletteSizeChunk),
    /// A tileset (0x2023).
    Tileset(TilesetChunk),
    /// A chunk of a type this decoder does not know, kept as is.
    Unknown {
        /// The chunk type tag.
        chunk_type: u16,
        /// The undecoded payload.
        payload: Vec<u8>,
    },
}

impl Chunk {
    fn decode(
        chunk_type: u16,
        mut reader: SliceMemReader<'_>,
        context: &ChunkContext,
    ) -> std::result::Result<Self, ChunkError> {
        let chunk = match chunk_type {
            PaletteChunk::CHUNK_TYPE => Chunk::Palette(PaletteChunk::from_block(&mut reader, context)?),
            LayerChunk::CHUNK_TYPE => Chunk::Layer(LayerChunk::from_block(&mut reader, context)?),
            CelChunk::CHUNK_TYPE => Chunk::Cel(CelChunk::from_block(&mut reader, context)?),
            ColorProfileChunk::CHUNK_TYPE => {
                Chunk::ColorProfile(ColorProfileChunk::from_block(&mut reader, context)?)
            }
            TagsChunk::CHUNK_TYPE => Chunk::Tags(TagsChunk::from_block(&mut reader, context)?),
            PaletteSizeChunk::CHUNK_TYPE => {
                Chunk::PaletteSize(PaletteSizeChunk::from_block(&mut reader, context)?)
            }
            TilesetChunk::CHUNK_TYPE => {
                Chunk::Tileset(TilesetChunk::from_block(&mut reader, context)?)
            }
            _ => {
                log::debug!(
                    "skipping unknown chunk type {chunk_type:#06x} ({} bytes)",
                    reader.remaining()
                );
                return Ok(Chunk::Unknown {
                    chunk_type,
                    payload: reader.remaining_slice().to_vec(),
                });
            }
        };
        if !reader.is_empty() {
            log::debug!(
                "ignoring {} unread bytes at the end of chunk {chunk_type:#06x}",
                reader.remaining()
            );
        }
        Ok(chunk)
    }

    /// The type tag of this chunk.
    #[must_use]
    pub fn chunk_type(&self) -> u16 {
        match self {
            Chunk::Palette(_) => PaletteChunk::CHUNK_TYPE,
            Chunk::Layer(_) => LayerChunk::CHUNK_TYPE,
            Chunk::Cel(_) => CelChunk::CHUNK_TYPE,
            Chunk::ColorProfile(_) => ColorProfileChunk::CHUNK_TYPE,
            Chunk::Tags(_) => TagsChunk::CHUNK_TYPE,
            Chunk::PaletteSize(_) => PaletteSizeChunk::CHUNK_TYPE,
            Chunk::Tileset(_) => TilesetChunk::CHUNK_TYPE,
            Chunk::Unknown { chunk_type, .. } => *chunk_type,
        }
    }
}

/// One frame: a duration and the chunks it holds, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    duration_ms: u16,
    chunks: Vec<Chunk>,
}

impl Frame {
    fn read(
        reader: &mut SliceMemReader<'_>,
        frame: usize,
        context: &ChunkContext,
    ) -> Result<Self> {
        let header = FrameHeader::read(reader, frame)?;
        let chunk_count = header.chunk_count();
        log::trace!(
            "frame {frame}: {} bytes, {chunk_count} chunks",
            header.frame_size
        );

        let mut chunks = Vec::with_capacity(
            usize::try_from(chunk_count)
                .unwrap_or(usize::MAX)
                .min(reader.remaining() / CHUNK_HEADER_SIZE),
        );
        let mut consumed = u64::from(FRAME_HEADER_SIZE_U32);
        for _ in 0..chunk_count {
            let offset = reader.offset();
            let truncated = |declared: u32, available: usize| Error::TruncatedChunk {
                frame,
                offset,
                declared,
                available,
            };
            if reader.remaining() < CHUNK_HEADER_SIZE {
                return Err(truncated(CHUNK_HEADER_SIZE_U32, reader.remaining()));
            }
            let available = reader.remaining();
            let (size, chunk_type) =
                read_chunk_header(reader).map_err(|_| truncated(CHUNK_HEADER_SIZE_U32, available))?;
            if size < CHUNK_HEADER_SIZE_U32 {
                return Err(Error::InvalidChunkSize {
                    frame,
                    offset,
                    size,
                });
            }
            let payload_len = usize::try_from(size - CHUNK_HEADER_SIZE_U32).unwrap_or(usize::MAX);
            let payload = reader
                .split_off(&format!("chunk {chunk_type:#06x}"), payload_len)
                .map_err(|_| truncated(size, available))?;
            let chunk = Chunk::decode(chunk_type, payload, context).map_err(|source| {
                Error::Chunk {
                    frame,
                    chunk_type,
                    offset,
                    source,
                }
            })?;
            chunks.push(chunk);
            consumed += u64::from(size);
        }

        if consumed != u64::from(header.frame_size) {
            return Err(Error::FrameSizeMismatch {
                frame,
                declared: header.frame_size,
                actual: consumed,
            });
        }

        Ok(Frame {
            duration_ms: header.duration_ms,
            chunks,
        })
    }

    /// How long the frame is shown, in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u16 {
        self.duration_ms
    }

    /// The chunks of the frame, in file order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

fn read_chunk_header(
    reader: &mut SliceMemReader<'_>,
) -> aseload_utils::mem_reader::Result<(u32, u16)> {
    let size = reader.read_u32_le()?;
    let chunk_type = reader.read_u16_le()?;
    Ok((size, chunk_type))
}

/// Options for the parsing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    max_inflated_size: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_inflated_size: DEFAULT_MAX_INFLATED_SIZE,
        }
    }
}

impl ParseOptions {
    /// Sets the upper bound on the size of any single inflated stream.
    #[must_use]
    pub fn with_max_inflated_size(mut self, max_inflated_size: usize) -> Self {
        self.max_inflated_size = max_inflated_size;
        self
    }

    /// The upper bound on the size of any single inflated stream.
    #[must_use]
    pub fn max_inflated_size(&self) -> usize {
        self.max_inflated_size
    }
}

/// A parsed document: the header and every frame, with chunks decoded but
/// not yet resolved against each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    header: Header,
    frames: Vec<Frame>,
    trailing_bytes: usize,
}

impl Document {
    /// Parses a complete document from `bytes`.
    pub fn parse(bytes: &[u8], options: &ParseOptions) -> Result<Self> {
        let mut reader = SliceMemReader::new(bytes);
        let header = Header::read(&mut reader)?;
        let context = ChunkContext {
            color_depth: header.color_depth,
            max_inflated_size: options.max_inflated_size,
        };

        let mut frames = Vec::with_capacity(
            usize::from(header.frame_count).min(reader.remaining() / FRAME_HEADER_SIZE),
        );
        for frame in 0..usize::from(header.frame_count) {
            frames.push(Frame::read(&mut reader, frame, &context)?);
        }

        let trailing_bytes = reader.remaining();
        if trailing_bytes > 0 {
            log::warn!(
                "{trailing_bytes} bytes left over after the last frame at offset {}",
                reader.offset()
            );
        }

        Ok(Document {
            header,
            frames,
            trailing_bytes,
        })
    }

    /// The document header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The frames, in order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The number of bytes after the last frame that were not parsed.
    #[must_use]
    pub fn trailing_bytes(&self) -> usize {
        self.trailing_bytes
    }
}

#[cfg(test)]
mod tests {
    use datalit::datalit;

    use super::*;

    fn frame_header(old: u16, new: u32) -> FrameHeader {
        FrameHeader {
            frame_size: 16,
            old_chunk_count: old,
            duration_ms: 100,
            new_chunk_count: new,
        }
    }

    #[test]
    fn old_count_sentinel_defers_to_new_count() {
        assert_eq!(frame_header(0xFFFF, 5).chunk_count(), 5);
        assert_eq!(frame_header(0xFFFF, 0).chunk_count(), 0);
    }

    #[test]
    fn zero_new_count_uses_old_count() {
        assert_eq!(frame_header(3, 0).chunk_count(), 3);
    }

    #[test]
    fn nonzero_new_count_wins() {
        assert_eq!(frame_header(3, 70_000).chunk_count(), 70_000);
    }

    #[test]
    fn header_defaults() {
        let header = Header {
            file_size: 0,
            frame_count: 0,
            width: 1,
            height: 1,
            color_depth: ColorDepth::Indexed,
            flags: HeaderFlags::empty(),
            transparent_index: 0,
            raw_num_colors: 0,
            pixel_width: 0,
            pixel_height: 2,
            grid_x: 0,
            grid_y: 0,
            grid_width: 0,
            grid_height: 8,
        };
        assert_eq!(header.num_colors(), 256);
        assert_eq!(header.pixel_ratio(), (1, 1));
        assert_eq!(header.grid_size(), (16, 8));
    }

    #[test]
    fn reads_header_fields() {
        let mut data = datalit!(
            0x1000u32_le, // file size
            0xA5E0u16_le,
            3u16_le,  // frames
            32u16_le, // width
            24u16_le, // height
            8u16_le,  // indexed
            5u32_le,  // opacity, layer UUIDs
            100u16_le,
            0x0000_0000_0000_0000,
            7u8, // transparent index
            0x000000,
            16u16_le, // colors
            2u8,
            1u8,
            0xfeff, // grid x: -2
            4u16_le,
            0u16_le,
            8u16_le,
        ).to_vec();
        data.resize(HEADER_SIZE, 0);
        let header = Header::read(&mut SliceMemReader::new(&data)).unwrap();
        assert_eq!(header.frame_count, 3);
        assert_eq!((header.width, header.height), (32, 24));
        assert_eq!(header.color_depth, ColorDepth::Indexed);
        assert_eq!(
            header.flags,
            HeaderFlags::HAS_LAYER_OPACITY | HeaderFlags::HAS_LAYER_UUIDS
        );
        assert_eq!(header.transparent_index, 7);
        assert_eq!(header.num_colors(), 16);
        assert_eq!(header.pixel_ratio(), (2, 1));
        assert_eq!((header.grid_x, header.grid_y), (-2, 4));
        assert_eq!(header.grid_size(), (16, 8));
    }

    #[test]
    fn reads_frame_header_fields() {
        let data = datalit!(
            0x20u32_le, // frame size
            0xF1FAu16_le,
            0xFFFFu16_le, // old chunk count
            80u16_le,     // duration
            0x0000,
            2u32_le, // new chunk count
        );
        let header = FrameHeader::read(&mut SliceMemReader::new(&data), 0).unwrap();
        assert_eq!(header.frame_size, 0x20);
        assert_eq!(header.duration_ms, 80);
        assert_eq!(header.chunk_count(), 2);
    }

    #[test]
    fn wrong_frame_magic_is_malformed() {
        let data = datalit!(16u32_le, 0xF1FBu16_le, 0u16_le, 80u16_le, 0x0000, 0u32_le);
        assert!(matches!(
            FrameHeader::read(&mut SliceMemReader::new(&data), 4),
            Err(Error::MalformedFrameHeader { frame: 4, .. })
        ));
    }

    #[test]
    fn short_input_is_a_malformed_header() {
        let err = Document::parse(&[0u8; 127], &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
    }
}
