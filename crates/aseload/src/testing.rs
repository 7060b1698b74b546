//! Builders for sprite documents in tests.
//!
//! Fixed parts of each layout are `datalit!` literals. Only the fields a
//! builder takes as arguments are appended at run time.

use aseload_utils::testing::compress_zlib;
use datalit::datalit;

use crate::raw::{LayerType, Tag, TilesetFlags};

fn u16_len(len: usize) -> [u8; 2] {
    u16::try_from(len).unwrap().to_le_bytes()
}

fn u32_len(len: usize) -> [u8; 4] {
    u32::try_from(len).unwrap().to_le_bytes()
}

fn push_string(data: &mut Vec<u8>, value: &str) {
    data.extend(u16_len(value.len()));
    data.extend(value.as_bytes());
}

/// A chunk ready to be placed in a frame.
#[derive(Clone, Debug)]
pub(crate) struct RawChunk {
    pub(crate) chunk_type: u16,
    pub(crate) payload: Vec<u8>,
}

impl RawChunk {
    pub(crate) fn new(chunk_type: u16, payload: Vec<u8>) -> Self {
        Self {
            chunk_type,
            payload,
        }
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut data = u32_len(self.payload.len() + 6).to_vec();
        data.extend(self.chunk_type.to_le_bytes());
        data.extend(&self.payload);
        data
    }
}

/// How chunk counts are written in a frame header.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ChunkCount {
    /// Old count set, new count zero.
    Old,
    /// Old count `0xFFFF`, new count set.
    New,
    /// Both counts given explicitly.
    Explicit { old: u16, new: u32 },
}

pub(crate) fn frame_bytes(duration_ms: u16, count: ChunkCount, chunks: &[RawChunk]) -> Vec<u8> {
    let body: Vec<u8> = chunks.iter().flat_map(RawChunk::to_bytes).collect();
    let num_chunks = u32::try_from(chunks.len()).unwrap();
    let (old, new) = match count {
        ChunkCount::Old => (u16::try_from(num_chunks).unwrap(), 0),
        ChunkCount::New => (0xFFFF, num_chunks),
        ChunkCount::Explicit { old, new } => (old, new),
    };
    let mut data = u32_len(body.len() + 16).to_vec();
    data.extend(datalit!(0xF1FAu16_le));
    data.extend(old.to_le_bytes());
    data.extend(duration_ms.to_le_bytes());
    data.extend(datalit!(0x0000));
    data.extend(new.to_le_bytes());
    data.extend(body);
    data
}

pub(crate) fn header_bytes(frame_count: u16, width: u16, height: u16, depth_bits: u16) -> Vec<u8> {
    let mut header = datalit!(
        0u32_le, // file size
        0xA5E0u16_le,
    ).to_vec();
    for field in [frame_count, width, height, depth_bits] {
        header.extend(field.to_le_bytes());
    }
    header.extend(datalit!(
        1u32_le,   // flags: layer opacity is valid
        100u16_le, // deprecated speed
        0x0000_0000_0000_0000,
        0u8, // transparent index
        0x000000,
        0u16_le, // number of colors
        1u8,     // pixel width
        1u8,     // pixel height
        0u16_le, // grid x
        0u16_le, // grid y
        16u16_le,
        16u16_le,
    ));
    assert_eq!(header.len(), 44);
    header.resize(128, 0);
    header
}

/// A whole document, with each frame given as its duration and chunks.
pub(crate) fn document_bytes(
    width: u16,
    height: u16,
    depth_bits: u16,
    frames: &[(u16, Vec<RawChunk>)],
) -> Vec<u8> {
    let mut data = header_bytes(u16::try_from(frames.len()).unwrap(), width, height, depth_bits);
    for (duration_ms, chunks) in frames {
        data.extend(frame_bytes(*duration_ms, ChunkCount::New, chunks));
    }
    let file_size = u32_len(data.len());
    data[..4].copy_from_slice(&file_size);
    data
}

/// A palette chunk with one packet per `(skip, colors)` entry.
pub(crate) fn palette_chunk(packets: &[(u8, &[[u8; 3]])]) -> RawChunk {
    let mut data = u16_len(packets.len()).to_vec();
    for (skip, colors) in packets {
        data.push(*skip);
        data.push(u8::try_from(colors.len()).unwrap());
        data.extend(colors.iter().flatten());
    }
    RawChunk::new(0x0004, data)
}

pub(crate) fn layer_chunk(name: &str, layer_type: LayerType) -> RawChunk {
    let type_val: u16 = match layer_type {
        LayerType::Normal => 0,
        LayerType::Group => 1,
        LayerType::Tilemap { .. } => 2,
    };
    let mut data = datalit!(1u16_le).to_vec(); // visible
    data.extend(type_val.to_le_bytes());
    data.extend(datalit!(
        0u16_le, // child level
        0x0000_0000,
        0u16_le, // normal blend
        255u8,
        0x000000,
    ));
    push_string(&mut data, name);
    if let LayerType::Tilemap { tileset_id } = layer_type {
        data.extend(tileset_id.to_le_bytes());
    }
    RawChunk::new(0x2004, data)
}

/// The fixed cel fields for a cel on `layer` at `(x, y)`.
fn cel_prefix(layer: u16, (x, y): (i16, i16), cel_type: u16, z_index: i16) -> Vec<u8> {
    let mut data = layer.to_le_bytes().to_vec();
    data.extend(x.to_le_bytes());
    data.extend(y.to_le_bytes());
    data.extend(datalit!(255u8));
    data.extend(cel_type.to_le_bytes());
    data.extend(z_index.to_le_bytes());
    data.extend(datalit!(0x00_0000_0000));
    data
}

fn image_cel(cel_type: u16, layer: u16, width: u16, height: u16, pixels: &[u8]) -> RawChunk {
    let mut data = cel_prefix(layer, (0, 0), cel_type, 0);
    data.extend(width.to_le_bytes());
    data.extend(height.to_le_bytes());
    data.extend(pixels);
    RawChunk::new(0x2005, data)
}

pub(crate) fn raw_cel_chunk(layer: u16, width: u16, height: u16, pixels: &[u8]) -> RawChunk {
    image_cel(0, layer, width, height, pixels)
}

/// A raw cel drawn `z_index` layers away from its own.
pub(crate) fn z_indexed_cel_chunk(layer: u16, z_index: i16, pixels: &[u8]) -> RawChunk {
    let mut data = cel_prefix(layer, (0, 0), 0, z_index);
    data.extend(datalit!(1u16_le, 1u16_le));
    data.extend(pixels);
    RawChunk::new(0x2005, data)
}

pub(crate) fn compressed_cel_chunk(layer: u16, width: u16, height: u16, pixels: &[u8]) -> RawChunk {
    image_cel(2, layer, width, height, &compress_zlib(pixels))
}

pub(crate) fn linked_cel_chunk(layer: u16, x: i16, y: i16, frame_position: u16) -> RawChunk {
    let mut data = cel_prefix(layer, (x, y), 1, 0);
    data.extend(frame_position.to_le_bytes());
    RawChunk::new(0x2005, data)
}

/// A tilemap cel using the usual masks: 29-bit ID and flips in the top bits.
pub(crate) fn tilemap_cel_chunk(layer: u16, width: u16, height: u16, words: &[u32]) -> RawChunk {
    let tiles: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
    let mut data = cel_prefix(layer, (0, 0), 3, 0);
    data.extend(width.to_le_bytes());
    data.extend(height.to_le_bytes());
    data.extend(datalit!(
        32u16_le,          // bits per tile
        0x1FFF_FFFFu32_le, // tile id
        0x2000_0000u32_le, // x flip
        0x4000_0000u32_le, // y flip
        0x8000_0000u32_le, // diagonal flip
        0x0000_0000_0000_0000_0000,
    ));
    data.extend(compress_zlib(&tiles));
    RawChunk::new(0x2005, data)
}

/// An embedded tileset whose `image` holds the tiles stacked vertically.
pub(crate) fn tileset_chunk(
    id: u32,
    flags: TilesetFlags,
    tile_size: (u16, u16),
    num_tiles: u32,
    image: &[u8],
) -> RawChunk {
    let compressed = compress_zlib(image);
    let mut data = id.to_le_bytes().to_vec();
    data.extend((flags | TilesetFlags::EMBEDDED).bits().to_le_bytes());
    data.extend(num_tiles.to_le_bytes());
    data.extend(tile_size.0.to_le_bytes());
    data.extend(tile_size.1.to_le_bytes());
    data.extend(datalit!(
        1u16_le, // base index
        0x0000_0000_0000_0000_0000_0000_0000,
        5u16_le,
        b"tiles",
    ));
    data.extend(u32_len(compressed.len()));
    data.extend(compressed);
    RawChunk::new(0x2023, data)
}

pub(crate) fn tags_chunk(tags: &[Tag]) -> RawChunk {
    let mut data = u16_len(tags.len()).to_vec();
    data.extend(datalit!(0x0000_0000_0000_0000));
    for tag in tags {
        data.extend(tag.from_frame.to_le_bytes());
        data.extend(tag.to_frame.to_le_bytes());
        data.push(tag.direction as u8);
        data.extend(tag.repeat.to_le_bytes());
        data.extend(datalit!(
            0x0000_0000_0000,
            0x000000, // deprecated color
            0x00,
        ));
        push_string(&mut data, &tag.name);
    }
    RawChunk::new(0x2018, data)
}
