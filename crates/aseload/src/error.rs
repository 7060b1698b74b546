use aseload_utils::{compression::InflateError, mem_reader::MemReaderError};

/// A failure while decoding the payload of a single chunk.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The payload could not be read as the expected structure.
    #[error(transparent)]
    InvalidData(#[from] MemReaderError),

    /// An embedded compressed stream was corrupt or too large.
    #[error("failed to inflate embedded data")]
    Decompression(#[from] InflateError),

    /// The tileset image does not split evenly into its declared tiles.
    #[error(
        "tileset image of {actual_bytes} bytes does not hold {declared_tiles} tiles of {tile_bytes} bytes"
    )]
    TilesetSizeMismatch {
        /// Inflated size of the tileset image.
        actual_bytes: usize,
        /// Size of a single tile.
        tile_bytes: usize,
        /// Tile count declared by the chunk.
        declared_tiles: u32,
    },

    /// The tilemap data does not hold one word per cell.
    #[error("tilemap data of {actual_bytes} bytes does not hold {expected_tiles} tiles")]
    TileCountMismatch {
        /// Number of cells implied by the tilemap dimensions.
        expected_tiles: usize,
        /// Inflated size of the tilemap data.
        actual_bytes: usize,
    },

    /// An image does not hold exactly one pixel per cell of its declared size.
    #[error("image data of {actual_bytes} bytes, expected {expected_bytes}")]
    PixelCountMismatch {
        /// The size implied by the image dimensions and color depth.
        expected_bytes: usize,
        /// The size actually present.
        actual_bytes: usize,
    },

    /// Palette packets write past the last 8-bit palette index.
    #[error("palette packets reach {end} entries, past the limit of {limit}")]
    PaletteOverflow {
        /// One past the highest index the packets would write.
        end: usize,
        /// The most entries a palette can hold.
        limit: usize,
    },

    /// A cel chunk ended right after its fixed fields.
    #[error("cel chunk has no payload")]
    EmptyCelPayload,

    /// Pixel data in this color depth cannot be decoded.
    #[error("unsupported color depth of {0} bits per pixel")]
    UnsupportedColorDepth(u16),

    /// Tilemap data uses a tile word size other than 32 bits.
    #[error("unsupported tilemap word size of {0} bits")]
    UnsupportedBitsPerTile(u16),
}

/// A failure while decoding a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The fixed-size document header is missing or invalid.
    #[error("malformed document header: {0}")]
    MalformedHeader(String),

    /// A frame header is missing or invalid.
    #[error("malformed header for frame {frame}: {reason}")]
    MalformedFrameHeader {
        /// Index of the frame.
        frame: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A chunk declares a size too small to hold its own header.
    #[error("chunk at offset {offset} in frame {frame} declares an invalid size of {size} bytes")]
    InvalidChunkSize {
        /// Index of the frame holding the chunk.
        frame: usize,
        /// Absolute byte offset of the chunk.
        offset: usize,
        /// The declared size.
        size: u32,
    },

    /// A chunk declares more bytes than the input has left.
    #[error(
        "chunk at offset {offset} in frame {frame} declares {declared} bytes, but only {available} remain"
    )]
    TruncatedChunk {
        /// Index of the frame holding the chunk.
        frame: usize,
        /// Absolute byte offset of the chunk.
        offset: usize,
        /// The declared size, including the chunk header.
        declared: u32,
        /// Bytes left in the input at the chunk offset.
        available: usize,
    },

    /// The chunks of a frame do not add up to its declared size.
    #[error("frame {frame} declares {declared} bytes, but its header and chunks take {actual}")]
    FrameSizeMismatch {
        /// Index of the frame.
        frame: usize,
        /// The size from the frame header.
        declared: u32,
        /// Frame header size plus the sizes of all chunks read.
        actual: u64,
    },

    /// A chunk payload could not be decoded.
    #[error("failed to decode chunk {chunk_type:#06x} at offset {offset} in frame {frame}")]
    Chunk {
        /// Index of the frame holding the chunk.
        frame: usize,
        /// The chunk type tag.
        chunk_type: u16,
        /// Absolute byte offset of the chunk.
        offset: usize,
        /// The underlying failure.
        #[source]
        source: ChunkError,
    },

    /// A tag covers frames that the document does not have.
    #[error("tag {name:?} covers frames {from}..={to}, but the document has {frame_count} frames")]
    TagRangeOutOfBounds {
        /// Name of the tag.
        name: String,
        /// First frame of the tag.
        from: u16,
        /// Last frame of the tag.
        to: u16,
        /// Number of frames in the document.
        frame_count: usize,
    },

    /// An indexed pixel refers to a color past the end of the palette.
    #[error("palette index {index} is out of range for a palette of {palette_len} colors")]
    PaletteIndexOutOfRange {
        /// The offending index.
        index: u8,
        /// The number of colors in the palette.
        palette_len: usize,
    },

    /// A tilemap cell refers to a tile its tileset does not have.
    #[error("tile {tile_id} is out of range for tileset {tileset_id} with {tile_count} tiles")]
    TileIdOutOfRange {
        /// The offending tile ID.
        tile_id: u32,
        /// ID of the tileset the cell was resolved against.
        tileset_id: u32,
        /// Number of tiles in the tileset.
        tile_count: usize,
    },

    /// A linked cel points at a frame with no cel on the same layer.
    #[error("cel on layer {layer} in frame {frame} links to frame {target}, which has no cel there")]
    DanglingLinkedCel {
        /// Index of the frame holding the link.
        frame: usize,
        /// The layer of the cel.
        layer: u16,
        /// The frame the link points at.
        target: u16,
    },

    /// The document uses a color depth whose pixels cannot be decoded.
    #[error("unsupported color depth of {0} bits per pixel")]
    UnsupportedColorDepth(u16),

    /// A tilemap cel has no tileset to resolve its tiles against.
    #[error("tilemap cel on layer {layer} in frame {frame} has no tileset")]
    MissingTileset {
        /// Index of the frame holding the cel.
        frame: usize,
        /// The layer of the cel.
        layer: u16,
    },
}

/// Result type for document decoding.
pub type Result<T> = std::result::Result<T, Error>;
