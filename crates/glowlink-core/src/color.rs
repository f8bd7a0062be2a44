//! Color primitives and screen regions

use crate::{Error, Result};
use std::fmt;

/// An 8-bit RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` (or `rrggbb`) hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 {
            return Err(Error::InvalidColor(s.to_string()));
        }
        let byte = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| Error::InvalidColor(s.to_string()))
        };
        Ok(Self {
            r: byte(0..2)?,
            g: byte(2..4)?,
            b: byte(4..6)?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Screen edge regions, in canonical wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Region {
    Top = 0,
    Right = 1,
    Bottom = 2,
    Left = 3,
}

impl Region {
    /// All regions in canonical order
    pub const ALL: [Region; 4] = [Region::Top, Region::Right, Region::Bottom, Region::Left];

    pub fn from_index(index: u8) -> Result<Self> {
        match index {
            0 => Ok(Region::Top),
            1 => Ok(Region::Right),
            2 => Ok(Region::Bottom),
            3 => Ok(Region::Left),
            other => Err(Error::InvalidRegion(other)),
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }
}

/// One captured color sample: four streamed edge regions plus a dominant
/// color used only for local display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionColors {
    pub top: Rgb,
    pub right: Rgb,
    pub bottom: Rgb,
    pub left: Rgb,
    pub dominant: Rgb,
}

impl RegionColors {
    pub fn new(top: Rgb, right: Rgb, bottom: Rgb, left: Rgb, dominant: Rgb) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
            dominant,
        }
    }

    /// Same color everywhere, dominant included
    pub fn uniform(color: Rgb) -> Self {
        Self::new(color, color, color, color, color)
    }

    /// Placeholder shown when streaming is stopped
    pub fn neutral() -> Self {
        Self::uniform(Rgb::BLACK)
    }

    /// The four transmitted regions in canonical order; `dominant` is not
    /// part of the wire format
    pub fn streamed(&self) -> [Rgb; 4] {
        [self.top, self.right, self.bottom, self.left]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let c = Rgb::from_hex("#102030").unwrap();
        assert_eq!(c, Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(c.to_string(), "#102030");

        assert_eq!(Rgb::from_hex("ffffff").unwrap(), Rgb::new(255, 255, 255));
    }

    #[test]
    fn test_hex_rejects_garbage() {
        assert!(Rgb::from_hex("#12345").is_err());
        assert!(Rgb::from_hex("#1234567").is_err());
        assert!(Rgb::from_hex("#gg0000").is_err());
        assert!(Rgb::from_hex("").is_err());
    }

    #[test]
    fn test_region_indices() {
        for (i, region) in Region::ALL.iter().enumerate() {
            assert_eq!(region.index() as usize, i);
            assert_eq!(Region::from_index(i as u8).unwrap(), *region);
        }
        assert!(Region::from_index(4).is_err());
    }

    #[test]
    fn test_streamed_excludes_dominant() {
        let colors = RegionColors::new(
            Rgb::new(1, 0, 0),
            Rgb::new(2, 0, 0),
            Rgb::new(3, 0, 0),
            Rgb::new(4, 0, 0),
            Rgb::new(9, 9, 9),
        );
        assert_eq!(
            colors.streamed(),
            [
                Rgb::new(1, 0, 0),
                Rgb::new(2, 0, 0),
                Rgb::new(3, 0, 0),
                Rgb::new(4, 0, 0)
            ]
        );
    }
}
