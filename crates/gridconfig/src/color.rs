use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An 8-bit sRGB color written as `#rrggbb` or `#rgb` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Normalised channels in `[0, 1]`, in the order the shader expects.
    pub fn to_unit(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(format!("invalid color '{raw}'; expected #rrggbb or #rgb"));
        }
        match hex.len() {
            6 => {
                let channel = |index: usize| {
                    u8::from_str_radix(&hex[index..index + 2], 16)
                        .map_err(|err| format!("invalid color '{raw}': {err}"))
                };
                Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
            }
            3 => {
                let channel = |index: usize| {
                    u8::from_str_radix(&hex[index..index + 1], 16)
                        .map(|nibble| nibble * 17)
                        .map_err(|err| format!("invalid color '{raw}': {err}"))
                };
                Ok(Self::new(channel(0)?, channel(1)?, channel(2)?))
            }
            _ => Err(format!("invalid color '{raw}'; expected #rrggbb or #rgb")),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!("#392e4e".parse::<Rgb>().unwrap(), Rgb::new(0x39, 0x2e, 0x4e));
        assert_eq!("FF9FFC".parse::<Rgb>().unwrap(), Rgb::new(0xff, 0x9f, 0xfc));
        assert_eq!("#fff".parse::<Rgb>().unwrap(), Rgb::new(255, 255, 255));
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
        assert!("".parse::<Rgb>().is_err());
    }

    #[test]
    fn unit_channels_span_zero_to_one() {
        let unit = Rgb::new(0, 255, 51).to_unit();
        assert_eq!(unit[0], 0.0);
        assert_eq!(unit[1], 1.0);
        assert!((unit[2] - 0.2).abs() < 1e-6);
    }
}
