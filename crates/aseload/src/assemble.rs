//! The document-wide pass that turns parsed chunks into an [`Asset`].
//!
//! Assembly is pure: it reads a [`Document`] and never changes it, so the
//! same document always assembles to the same asset.

use crate::{
    error::{Error, Result},
    model::{AnimationFrame, AnimationState, Asset, Drawable, Image, ResolvedCel, Tilemap, Tileset},
    palette::{Color, Palette},
    pixels::PixelGrid,
    raw::{
        CelChunk, CelContent, Chunk, ColorDepth, ColorProfile, Document, LayerChunk, LayerType, Tag,
        TilemapCel, TilesetChunk,
    },
};

/// What to do with a tag whose last frame is past the end of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagRangePolicy {
    /// Fail assembly with [`Error::TagRangeOutOfBounds`].
    #[default]
    Fail,
    /// End the state at the last frame of the document.
    Clamp,
}

/// Options for the assembly pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblyOptions {
    tag_range_policy: TagRangePolicy,
}

impl AssemblyOptions {
    /// Sets how out-of-range tags are handled.
    #[must_use]
    pub fn with_tag_range_policy(mut self, policy: TagRangePolicy) -> Self {
        self.tag_range_policy = policy;
        self
    }

    /// How out-of-range tags are handled.
    #[must_use]
    pub fn tag_range_policy(&self) -> TagRangePolicy {
        self.tag_range_policy
    }
}

/// Everything gathered from the chunks of a document, in file order.
#[derive(Default)]
struct Collected<'a> {
    palette: Palette,
    layers: Vec<&'a LayerChunk>,
    tilesets: Vec<&'a TilesetChunk>,
    tags: Vec<&'a Tag>,
    color_profile: Option<&'a ColorProfile>,
}

impl<'a> Collected<'a> {
    fn from_document(document: &'a Document) -> Self {
        let mut collected = Collected::default();
        for chunk in document.frames().iter().flat_map(|frame| frame.chunks()) {
            match chunk {
                Chunk::Palette(palette) => collected.palette.apply(palette.writes()),
                Chunk::Layer(layer) => collected.layers.push(layer),
                Chunk::Tileset(tileset) => collected.tilesets.push(tileset),
                Chunk::Tags(tags) => collected.tags.extend(&tags.tags),
                Chunk::ColorProfile(profile) => collected.color_profile = Some(&profile.profile),
                Chunk::Cel(_) | Chunk::PaletteSize(_) | Chunk::Unknown { .. } => {}
            }
        }
        collected
    }
}

/// Maps pixels to colors, looking indexed pixels up in `palette`.
///
/// An index past the end of the palette is an error, never wrapped.
fn resolve_pixels(pixels: &PixelGrid, palette: &Palette) -> Result<Vec<Color>> {
    match pixels {
        PixelGrid::Rgba(colors) => Ok(colors.clone()),
        PixelGrid::Indexed(indexes) => indexes
            .iter()
            .map(|&index| {
                palette
                    .get(usize::from(index))
                    .ok_or(Error::PaletteIndexOutOfRange {
                        index,
                        palette_len: palette.len(),
                    })
            })
            .collect(),
    }
}

fn resolve_tileset(chunk: &TilesetChunk, palette: &Palette) -> Result<Tileset> {
    let tiles = chunk
        .tiles
        .iter()
        .map(|tile| {
            Ok(Image {
                width: chunk.tile_width,
                height: chunk.tile_height,
                pixels: resolve_pixels(tile, palette)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Tileset {
        id: chunk.id,
        name: chunk.name.clone(),
        tile_width: chunk.tile_width,
        tile_height: chunk.tile_height,
        empty_tile: chunk.empty_tile(),
        tiles,
    })
}

/// Cel content before links are followed.
enum Pending {
    Ready(Drawable),
    Link(u16),
}

struct Assembler<'a> {
    collected: Collected<'a>,
    tilesets: Vec<Tileset>,
}

impl Assembler<'_> {
    /// Finds the tileset for a tilemap cel on `layer_index`.
    ///
    /// Uses the tileset named by the layer. A document without layer
    /// information falls back to its only tileset.
    fn tileset_for_layer(&self, layer_index: u16) -> Option<&Tileset> {
        match self.collected.layers.get(usize::from(layer_index)) {
            Some(LayerChunk {
                layer_type: LayerType::Tilemap { tileset_id },
                ..
            }) => self.tilesets.iter().find(|tileset| tileset.id == *tileset_id),
            _ => match self.tilesets.as_slice() {
                [only] => Some(only),
                _ => None,
            },
        }
    }

    fn resolve_tilemap(&self, frame: usize, layer: u16, tilemap: &TilemapCel) -> Result<Tilemap> {
        let tileset = self
            .tileset_for_layer(layer)
            .ok_or(Error::MissingTileset { frame, layer })?;
        for cell in &tilemap.tiles {
            if !tileset.is_empty_tile(cell) && tileset.tile(cell.tile_id).is_none() {
                return Err(Error::TileIdOutOfRange {
                    tile_id: cell.tile_id,
                    tileset_id: tileset.id,
                    tile_count: tileset.tiles.len(),
                });
            }
        }
        Ok(Tilemap {
            width: tilemap.width,
            height: tilemap.height,
            tileset_id: tileset.id,
            cells: tilemap.tiles.clone(),
        })
    }

    fn resolve_content(&self, frame: usize, cel: &CelChunk) -> Result<Pending> {
        Ok(Pending::Ready(match &cel.content {
            CelContent::Raw(image) | CelContent::Compressed(image) => Drawable::Image(Image {
                width: image.width,
                height: image.height,
                pixels: resolve_pixels(&image.pixels, &self.collected.palette)?,
            }),
            CelContent::CompressedTilemap(tilemap) => {
                Drawable::Tilemap(self.resolve_tilemap(frame, cel.layer_index, tilemap)?)
            }
            CelContent::Linked(link) => return Ok(Pending::Link(link.frame_position)),
        }))
    }

    fn resolve_frames(&self, document: &Document) -> Result<Vec<AnimationFrame>> {
        // Linked cels may point at any frame, so every direct cel is resolved
        // before any link is followed.
        let mut direct = Vec::with_capacity(document.frames().len());
        for (frame_index, frame) in document.frames().iter().enumerate() {
            let mut cels = Vec::new();
            for chunk in frame.chunks() {
                if let Chunk::Cel(cel) = chunk {
                    cels.push((cel, self.resolve_content(frame_index, cel)?));
                }
            }
            direct.push(cels);
        }

        let find_direct = |frame: usize, layer: u16| {
            direct.get(frame)?.iter().find_map(|(cel, content)| match content {
                Pending::Ready(drawable) if cel.layer_index == layer => Some(drawable),
                _ => None,
            })
        };

        let mut frames = Vec::with_capacity(direct.len());
        for (frame_index, (frame, cels)) in document.frames().iter().zip(&direct).enumerate() {
            let mut resolved = Vec::with_capacity(cels.len());
            for (cel, content) in cels {
                let content = match content {
                    Pending::Ready(drawable) => drawable.clone(),
                    &Pending::Link(target) => find_direct(usize::from(target), cel.layer_index)
                        .ok_or(Error::DanglingLinkedCel {
                            frame: frame_index,
                            layer: cel.layer_index,
                            target,
                        })?
                        .clone(),
                };
                resolved.push(ResolvedCel {
                    layer_index: cel.layer_index,
                    x: cel.x,
                    y: cel.y,
                    opacity: cel.opacity,
                    z_index: cel.z_index,
                    content,
                });
            }
            frames.push(AnimationFrame {
                duration_ms: frame.duration_ms(),
                cels: resolved,
            });
        }
        Ok(frames)
    }
}

fn build_state(tag: &Tag, frame_count: usize, policy: TagRangePolicy) -> Result<AnimationState> {
    let from = usize::from(tag.from_frame);
    let mut to = usize::from(tag.to_frame);
    let out_of_bounds = || Error::TagRangeOutOfBounds {
        name: tag.name.clone(),
        from: tag.from_frame,
        to: tag.to_frame,
        frame_count,
    };

    if from > to || from >= frame_count {
        return Err(out_of_bounds());
    }
    if to >= frame_count {
        match policy {
            TagRangePolicy::Fail => return Err(out_of_bounds()),
            TagRangePolicy::Clamp => {
                log::warn!(
                    "tag {:?} ends at frame {to}, clamping to last frame {}",
                    tag.name,
                    frame_count - 1
                );
                to = frame_count - 1;
            }
        }
    }

    Ok(AnimationState {
        name: tag.name.clone(),
        from,
        to,
        direction: tag.direction,
        repeat: tag.repeat,
    })
}

/// Builds an [`Asset`] from a parsed document.
pub fn assemble(document: &Document, options: &AssemblyOptions) -> Result<Asset> {
    let header = document.header();
    if header.color_depth == ColorDepth::Grayscale {
        return Err(Error::UnsupportedColorDepth(header.color_depth.bits_per_pixel()));
    }

    let collected = Collected::from_document(document);
    let tilesets = collected
        .tilesets
        .iter()
        .map(|chunk| resolve_tileset(chunk, &collected.palette))
        .collect::<Result<Vec<_>>>()?;
    let assembler = Assembler {
        collected,
        tilesets,
    };

    let frames = assembler.resolve_frames(document)?;
    let states = assembler
        .collected
        .tags
        .iter()
        .map(|tag| build_state(tag, frames.len(), options.tag_range_policy))
        .collect::<Result<Vec<_>>>()?;

    let Assembler {
        collected,
        tilesets,
    } = assembler;
    Ok(Asset {
        width: header.width,
        height: header.height,
        palette: collected.palette,
        color_profile: collected.color_profile.cloned().unwrap_or_default(),
        tilesets,
        frames,
        states,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::LoopDirection;

    fn tag(from: u16, to: u16) -> Tag {
        Tag {
            from_frame: from,
            to_frame: to,
            direction: LoopDirection::Forward,
            repeat: 0,
            name: "run".to_string(),
        }
    }

    #[test]
    fn indexed_pixels_resolve_through_palette() {
        let red = Color::from_rgba(255, 0, 0, 255);
        let blue = Color::from_rgba(0, 0, 255, 255);
        let palette = Palette::from_colors(vec![red, blue]);
        let colors = resolve_pixels(&PixelGrid::Indexed(vec![1, 0, 1]), &palette).unwrap();
        assert_eq!(colors, vec![blue, red, blue]);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let palette = Palette::from_colors(vec![Color::TRANSPARENT; 2]);
        assert!(matches!(
            resolve_pixels(&PixelGrid::Indexed(vec![0, 2]), &palette),
            Err(Error::PaletteIndexOutOfRange {
                index: 2,
                palette_len: 2,
            })
        ));
    }

    #[test]
    fn state_covers_inclusive_range() {
        let state = build_state(&tag(2, 4), 6, TagRangePolicy::Fail).unwrap();
        assert_eq!(state.frame_range(), 2..=4);
    }

    #[test]
    fn tag_past_end_fails_by_default() {
        assert!(matches!(
            build_state(&tag(2, 6), 6, TagRangePolicy::default()),
            Err(Error::TagRangeOutOfBounds {
                to: 6,
                frame_count: 6,
                ..
            })
        ));
    }

    #[test]
    fn tag_past_end_can_be_clamped() {
        let state = build_state(&tag(2, 9), 6, TagRangePolicy::Clamp).unwrap();
        assert_eq!(state.frame_range(), 2..=5);
    }

    #[test]
    fn reversed_or_unreachable_tags_always_fail() {
        for bad in [tag(4, 2), tag(6, 8)] {
            assert!(matches!(
                build_state(&bad, 6, TagRangePolicy::Clamp),
                Err(Error::TagRangeOutOfBounds { .. })
            ));
        }
    }
}
