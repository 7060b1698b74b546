//! Decoder for chunked sprite documents in the Aseprite format.
//!
//! Using the format description at: <https://github.com/aseprite/aseprite/blob/main/docs/ase-file-specs.md>
//!
//! Decoding happens in two passes:
//!
//! - Parsing ([`raw`]): the header, frames, and chunks are read in a single
//!   forward pass into a [`Document`]. Each chunk is decoded in isolation.
//!   Compressed pixel data is inflated and sliced, but nothing is resolved
//!   against other chunks.
//!
//! - Assembly ([`assemble()`]): the document is walked as a whole to build the
//!   palette, resolve indexed pixels and linked cels, attach tilemaps to
//!   their tilesets, and turn tags into named animation states. The result is
//!   an [`Asset`] with every image in RGBA.
//!
//! Most callers want [`decode`]. The two passes are available separately for
//! tools that need the physical layout.

#![warn(missing_docs)]

mod assemble;
mod error;
mod model;
mod palette;
mod pixels;
pub mod raw;
#[cfg(test)]
mod testing;

pub use self::assemble::{AssemblyOptions, TagRangePolicy, assemble};
pub use self::error::{ChunkError, Error, Result};
pub use self::model::{
    AnimationFrame, AnimationState, Asset, Drawable, Image, ResolvedCel, StateView, TileView,
    Tilemap, Tileset,
};
pub use self::palette::{Color, MAX_PALETTE_COLORS, Palette};
pub use self::pixels::{PixelGrid, TileBitmasks, TileRef};
pub use self::raw::{Document, ParseOptions};

/// Options for both decoding passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    parse: ParseOptions,
    assembly: AssemblyOptions,
}

impl DecodeOptions {
    /// Sets the upper bound on the size of any single inflated stream.
    #[must_use]
    pub fn with_max_inflated_size(mut self, max_inflated_size: usize) -> Self {
        self.parse = self.parse.with_max_inflated_size(max_inflated_size);
        self
    }

    /// Sets how tags that run past the last frame are handled.
    #[must_use]
    pub fn with_tag_range_policy(mut self, policy: TagRangePolicy) -> Self {
        self.assembly = self.assembly.with_tag_range_policy(policy);
        self
    }

    /// Options for the parsing pass.
    #[must_use]
    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse
    }

    /// Options for the assembly pass.
    #[must_use]
    pub fn assembly_options(&self) -> &AssemblyOptions {
        &self.assembly
    }
}

/// Parses `bytes` into a [`Document`] with default options, without
/// assembling it.
pub fn parse_document(bytes: &[u8]) -> Result<Document> {
    Document::parse(bytes, &ParseOptions::default())
}

/// Decodes a complete sprite document with default options.
pub fn decode(bytes: &[u8]) -> Result<Asset> {
    decode_with_options(bytes, &DecodeOptions::default())
}

/// Decodes a complete sprite document.
pub fn decode_with_options(bytes: &[u8], options: &DecodeOptions) -> Result<Asset> {
    let document = Document::parse(bytes, &options.parse)?;
    assemble(&document, &options.assembly)
}
