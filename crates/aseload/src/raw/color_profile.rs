use aseload_utils::mem_reader::{MemReader, MemReaderError};
use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::error::ChunkError;

use super::{ChunkContext, ChunkType};

bitflags! {
    /// Flags for color profile.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct ColorProfileFlags: u16 {
        /// Use fixed gamma.
        const FIXED_GAMMA = 0x0001;
    }
}

/// A signed 16.16 fixed-point number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FixedPoint(i32);

impl FixedPoint {
    /// Creates a value from its raw 16.16 representation.
    #[must_use]
    pub fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// The raw 16.16 representation.
    #[must_use]
    pub fn to_bits(self) -> i32 {
        self.0
    }

    /// The value as a float.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 65536.0
    }
}

/// The color space of the document.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ColorProfile {
    /// No profile.
    #[default]
    None,
    /// sRGB.
    Srgb,
    /// An embedded ICC profile, carried as opaque bytes.
    EmbeddedIcc(Vec<u8>),
}

/// A chunk describing the color profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorProfileChunk {
    /// The profile.
    pub profile: ColorProfile,
    /// A gamma override, present only when the fixed-gamma flag is set.
    pub fixed_gamma: Option<FixedPoint>,
}

impl ChunkType for ColorProfileChunk {
    const CHUNK_TYPE: u16 = 0x2007;

    fn from_block<M>(mut reader: M, _context: &ChunkContext) -> Result<Self, ChunkError>
    where
        M: MemReader,
    {
        let type_val = reader.read_u16_le()?;
        let flags = ColorProfileFlags::from_bits_truncate(reader.read_u16_le()?);
        let gamma = reader.read_value::<i32>("fixed gamma")?;
        reader.skip(8)?;

        let profile = match type_val {
            0 => ColorProfile::None,
            1 => ColorProfile::Srgb,
            2 => {
                let len = reader.read_u32_le()?;
                ColorProfile::EmbeddedIcc(
                    reader.read_bytes(usize::try_from(len).unwrap_or(usize::MAX))?,
                )
            }
            _ => {
                return Err(MemReaderError::from(reader.create_invalid_data_error_msg(
                    format!("invalid color profile type {type_val}"),
                ))
                .into());
            }
        };

        let fixed_gamma = flags
            .contains(ColorProfileFlags::FIXED_GAMMA)
            .then_some(FixedPoint::from_bits(gamma));

        Ok(ColorProfileChunk {
            profile,
            fixed_gamma,
        })
    }
}

#[cfg(test)]
mod tests {
    use aseload_utils::mem_reader::SliceMemReader;
    use datalit::datalit;

    use super::*;
    use crate::raw::ColorDepth;

    const CONTEXT: ChunkContext = ChunkContext {
        color_depth: ColorDepth::Rgba,
        max_inflated_size: 1024,
    };

    #[test]
    fn srgb_with_fixed_gamma() {
        let data = datalit!(
            1u16_le,          // sRGB
            1u16_le,          // fixed gamma
            0x0002_8000u32_le, // 2.5
            0x0000_0000_0000_0000,
        );
        let chunk = ColorProfileChunk::from_block(SliceMemReader::new(&data), &CONTEXT).unwrap();
        assert_eq!(chunk.profile, ColorProfile::Srgb);
        let gamma = chunk.fixed_gamma.unwrap();
        assert!((gamma.to_f64() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn gamma_is_absent_without_flag() {
        let data = datalit!(0u16_le, 0u16_le, 0x0001_0000u32_le, 0x0000_0000_0000_0000);
        let chunk = ColorProfileChunk::from_block(SliceMemReader::new(&data), &CONTEXT).unwrap();
        assert_eq!(chunk.profile, ColorProfile::None);
        assert_eq!(chunk.fixed_gamma, None);
    }

    #[test]
    fn carries_icc_bytes() {
        let data = datalit!(
            2u16_le, // embedded ICC
            0u16_le,
            0u32_le,
            0x0000_0000_0000_0000,
            3u32_le,
            0xaabbcc,
        );
        let chunk = ColorProfileChunk::from_block(SliceMemReader::new(&data), &CONTEXT).unwrap();
        assert_eq!(chunk.profile, ColorProfile::EmbeddedIcc(vec![0xAA, 0xBB, 0xCC]));
    }

    #[test]
    fn truncated_icc_is_an_error() {
        let data = datalit!(
            2u16_le,
            0u16_le,
            0u32_le,
            0x0000_0000_0000_0000,
            10u32_le,
            0xaa,
        );
        assert!(ColorProfileChunk::from_block(SliceMemReader::new(&data), &CONTEXT).is_err());
    }
}
