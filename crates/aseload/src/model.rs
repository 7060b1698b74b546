//! The assembled, render-ready asset.
//!
//! Everything here owns its pixels as RGBA. Tilemap cells refer to tileset
//! images by index, and [`TileView`] borrows the image for a cell from its
//! tileset without copying it.

use std::ops::RangeInclusive;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{
    palette::{Color, Palette},
    pixels::TileRef,
    raw::{ColorProfile, EmptyTile, LoopDirection},
};

/// A row-major RGBA image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Image {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) pixels: Vec<Color>,
}

impl Image {
    /// Creates an image from row-major pixels.
    ///
    /// Returns `None` if `pixels` does not hold exactly `width * height`
    /// colors.
    #[must_use]
    pub fn new(width: u16, height: u16, pixels: Vec<Color>) -> Option<Self> {
        (pixels.len() == usize::from(width) * usize::from(height)).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// All pixels, row by row.
    #[must_use]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// The pixel at `(x, y)`, if it is inside the image.
    #[must_use]
    pub fn pixel(&self, x: u16, y: u16) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }

    /// The pixels as packed RGBA bytes, row by row.
    #[must_use]
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|color| color.to_rgba()).collect()
    }
}

/// A set of equally sized tile images.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Tileset {
    pub(crate) id: u32,
    pub(crate) name: String,
    pub(crate) tile_width: u16,
    pub(crate) tile_height: u16,
    pub(crate) empty_tile: EmptyTile,
    pub(crate) tiles: Vec<Image>,
}

impl Tileset {
    /// The tileset ID.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The tileset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of every tile, as `(width, height)`.
    #[must_use]
    pub fn tile_size(&self) -> (u16, u16) {
        (self.tile_width, self.tile_height)
    }

    /// How tilemaps using this tileset mark an empty cell.
    #[must_use]
    pub fn empty_tile(&self) -> EmptyTile {
        self.empty_tile
    }

    /// Returns true if `tile` shows nothing in this tileset.
    #[must_use]
    pub fn is_empty_tile(&self, tile: &TileRef) -> bool {
        self.empty_tile.matches(tile)
    }

    /// The tile images, by tile ID.
    #[must_use]
    pub fn tiles(&self) -> &[Image] {
        &self.tiles
    }

    /// The image for `tile_id`, if the tileset has one.
    #[must_use]
    pub fn tile(&self, tile_id: u32) -> Option<&Image> {
        self.tiles.get(usize::try_from(tile_id).ok()?)
    }

    /// Pairs a tile reference with this tileset.
    #[must_use]
    pub fn view(&self, tile: TileRef) -> TileView<'_> {
        TileView {
            tileset: self,
            tile,
        }
    }
}

/// A tile reference together with the tileset it points into.
#[derive(Debug, Clone, Copy)]
pub struct TileView<'a> {
    tileset: &'a Tileset,
    tile: TileRef,
}

impl<'a> TileView<'a> {
    /// The underlying tile reference.
    #[must_use]
    pub fn tile(&self) -> TileRef {
        self.tile
    }

    /// Returns true if this cell shows no tile.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tileset.is_empty_tile(&self.tile)
    }

    /// The tile image, or `None` for an empty cell.
    #[must_use]
    pub fn image(&self) -> Option<&'a Image> {
        if self.is_empty() {
            return None;
        }
        self.tileset.tile(self.tile.tile_id)
    }
}

/// A grid of tile references.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Tilemap {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) tileset_id: u32,
    pub(crate) cells: Vec<TileRef>,
}

impl Tilemap {
    /// Width in tiles.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in tiles.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// ID of the tileset the cells refer to.
    #[must_use]
    pub fn tileset_id(&self) -> u32 {
        self.tileset_id
    }

    /// All cells, row by row.
    #[must_use]
    pub fn cells(&self) -> &[TileRef] {
        &self.cells
    }

    /// The cell at `(x, y)`, if it is inside the grid.
    #[must_use]
    pub fn cell(&self, x: u16, y: u16) -> Option<TileRef> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }

    /// Views of every cell against `tileset`, row by row.
    pub fn tile_views<'a>(&'a self, tileset: &'a Tileset) -> impl Iterator<Item = TileView<'a>> {
        self.cells.iter().map(move |tile| tileset.view(*tile))
    }
}

/// The content drawn by a cel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Drawable {
    /// A palette-resolved image.
    Image(Image),
    /// A tile grid.
    Tilemap(Tilemap),
}

/// A cel with its content resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ResolvedCel {
    pub(crate) layer_index: u16,
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) opacity: u8,
    pub(crate) z_index: i16,
    pub(crate) content: Drawable,
}

impl ResolvedCel {
    /// The layer the cel is on.
    #[must_use]
    pub fn layer_index(&self) -> u16 {
        self.layer_index
    }

    /// Position on the canvas, as `(x, y)`.
    #[must_use]
    pub fn position(&self) -> (i16, i16) {
        (self.x, self.y)
    }

    /// Cel opacity.
    #[must_use]
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Ordering relative to other layers in the frame.
    #[must_use]
    pub fn z_index(&self) -> i16 {
        self.z_index
    }

    /// The position of the cel in the frame's draw order: its layer index
    /// moved by its z-index.
    #[must_use]
    pub fn draw_order(&self) -> i32 {
        i32::from(self.layer_index) + i32::from(self.z_index)
    }

    /// What the cel draws.
    #[must_use]
    pub fn content(&self) -> &Drawable {
        &self.content
    }
}

/// One frame of the asset.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AnimationFrame {
    pub(crate) duration_ms: u16,
    pub(crate) cels: Vec<ResolvedCel>,
}

impl AnimationFrame {
    /// How long the frame is shown, in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u16 {
        self.duration_ms
    }

    /// The cels of the frame, in file order.
    #[must_use]
    pub fn cels(&self) -> &[ResolvedCel] {
        &self.cels
    }

    /// The cels back to front.
    ///
    /// Cels are sorted by [`ResolvedCel::draw_order`], and equal orders put
    /// the lower z-index first. A frame where every z-index is 0 keeps file
    /// order.
    #[must_use]
    pub fn cels_in_draw_order(&self) -> Vec<&ResolvedCel> {
        let mut cels: Vec<_> = self.cels.iter().collect();
        if cels.iter().any(|cel| cel.z_index != 0) {
            cels.sort_by_key(|cel| (cel.draw_order(), cel.z_index));
        }
        cels
    }
}

/// A named, inclusive range of frames, built from a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AnimationState {
    pub(crate) name: String,
    pub(crate) from: usize,
    pub(crate) to: usize,
    pub(crate) direction: LoopDirection,
    pub(crate) repeat: u16,
}

impl AnimationState {
    /// The state name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The frame indexes covered, inclusive.
    #[must_use]
    pub fn frame_range(&self) -> RangeInclusive<usize> {
        self.from..=self.to
    }

    /// Playback order.
    #[must_use]
    pub fn direction(&self) -> LoopDirection {
        self.direction
    }

    /// How many times to play the range, with 0 meaning forever.
    #[must_use]
    pub fn repeat(&self) -> u16 {
        self.repeat
    }
}

/// An [`AnimationState`] together with the frames it covers.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    state: &'a AnimationState,
    frames: &'a [AnimationFrame],
}

impl<'a> StateView<'a> {
    /// The state description.
    #[must_use]
    pub fn state(&self) -> &'a AnimationState {
        self.state
    }

    /// The state name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.state.name
    }

    /// The frames of the state, in order.
    #[must_use]
    pub fn frames(&self) -> &'a [AnimationFrame] {
        self.frames
    }

    /// The duration of each frame, in milliseconds.
    #[must_use]
    pub fn durations(&self) -> Vec<u16> {
        self.frames.iter().map(AnimationFrame::duration_ms).collect()
    }

    /// Returns true if the state spans more than one frame.
    #[must_use]
    pub fn has_animation(&self) -> bool {
        self.frames.len() > 1
    }
}

/// A fully decoded sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Asset {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) palette: Palette,
    pub(crate) color_profile: ColorProfile,
    pub(crate) tilesets: Vec<Tileset>,
    pub(crate) frames: Vec<AnimationFrame>,
    pub(crate) states: Vec<AnimationState>,
}

impl Asset {
    /// Canvas size, as `(width, height)`.
    #[must_use]
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// The document palette.
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The document color profile.
    #[must_use]
    pub fn color_profile(&self) -> &ColorProfile {
        &self.color_profile
    }

    /// All tilesets, in file order.
    #[must_use]
    pub fn tilesets(&self) -> &[Tileset] {
        &self.tilesets
    }

    /// The tileset with the given ID.
    #[must_use]
    pub fn tileset(&self, id: u32) -> Option<&Tileset> {
        self.tilesets.iter().find(|tileset| tileset.id == id)
    }

    /// Every frame of the document, in order.
    #[must_use]
    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    /// All animation states, in tag order.
    pub fn states(&self) -> impl Iterator<Item = StateView<'_>> {
        self.states.iter().map(|state| self.view_state(state))
    }

    /// The first animation state with the given name.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<StateView<'_>> {
        self.states
            .iter()
            .find(|state| state.name == name)
            .map(|state| self.view_state(state))
    }

    fn view_state<'a>(&'a self, state: &'a AnimationState) -> StateView<'a> {
        StateView {
            state,
            frames: self.frames.get(state.frame_range()).unwrap_or_default(),
        }
    }
}
