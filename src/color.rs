//! Background/fill colors parsed from hex strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// An opaque RGB color. Serialized as a `#rrggbb` hex string so the model
/// round-trips through JSON the way the editing surface supplies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Parse `#rrggbb` or the shorthand `#rgb`. The leading `#` is required.
    pub fn from_hex(s: &str) -> Result<Self> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| Error::validation("backgroundColor", format!("missing '#' in {s:?}")))?;

        let invalid =
            || Error::validation("backgroundColor", format!("{s:?} is not a hex color"));

        match hex.len() {
            3 => {
                let mut c = [0u8; 3];
                for (i, ch) in hex.chars().enumerate() {
                    let v = ch.to_digit(16).ok_or_else(invalid)? as u8;
                    c[i] = v * 16 + v;
                }
                Ok(Color::new(c[0], c[1], c[2]))
            }
            6 => {
                let parse = |r: &str| u8::from_str_radix(r, 16).map_err(|_| invalid());
                Ok(Color::new(
                    parse(&hex[0..2])?,
                    parse(&hex[2..4])?,
                    parse(&hex[4..6])?,
                ))
            }
            _ => Err(invalid()),
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// RGBA bytes at full opacity, the framebuffer's pixel layout
    pub fn rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
