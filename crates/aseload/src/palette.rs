//! Colors and the document-wide palette.

#[cfg(feature = "serde")]
use serde::Serialize;

/// An RGBA color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[repr(C)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color::from_rgba(0, 0, 0, 0);

    /// Creates a new `Color` from RGBA components.
    #[must_use]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from an RGB triple stored in a palette packet.
    ///
    /// Packets carry no alpha channel. Pure black is transparent, and every
    /// other color is opaque.
    #[must_use]
    pub const fn from_packet_rgb(r: u8, g: u8, b: u8) -> Self {
        let a = if r == 0 && g == 0 && b == 0 { 0 } else { 255 };
        Self { r, g, b, a }
    }

    /// Returns the red component.
    #[must_use]
    pub fn red(self) -> u8 {
        self.r
    }

    /// Returns the green component.
    #[must_use]
    pub fn green(self) -> u8 {
        self.g
    }

    /// Returns the blue component.
    #[must_use]
    pub fn blue(self) -> u8 {
        self.b
    }

    /// Returns the alpha component.
    #[must_use]
    pub fn alpha(self) -> u8 {
        self.a
    }

    /// Returns the components in RGBA order.
    #[must_use]
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// The most colors a palette can hold, one per 8-bit pixel index.
pub const MAX_PALETTE_COLORS: usize = 256;

/// An ordered list of colors, addressed by 8-bit pixel indexes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Creates an empty palette.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a palette from the given colors.
    #[must_use]
    pub fn from_colors(colors: Vec<Color>) -> Self {
        Self { colors }
    }

    /// Sets the color at `index`, growing the palette if needed.
    ///
    /// Entries between the old end of the palette and `index` become
    /// [`Color::TRANSPARENT`]. An existing entry is overwritten.
    pub fn set(&mut self, index: u8, color: Color) {
        let index = usize::from(index);
        if index >= self.colors.len() {
            self.colors.resize(index + 1, Color::TRANSPARENT);
        }
        self.colors[index] = color;
    }

    /// Applies a sequence of `(index, color)` writes in order.
    pub fn apply<I>(&mut self, writes: I)
    where
        I: IntoIterator<Item = (u8, Color)>,
    {
        for (index, color) in writes {
            self.set(index, color);
        }
    }

    /// Returns the color at `index`, if the palette has one.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    /// The number of colors in the palette.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Returns true if the palette has no colors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The colors, in index order.
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}
