//! Color utility functions shared by the class catalog and the validator.
//!
//! Class colors are carried as lowercase `#rrggbb` strings. Colors for classes
//! that a source format does not color explicitly come from a [`Palette`].

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Format an RGB triple as a lowercase `#rrggbb` string.
pub fn format_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Parse a `#rrggbb` (or `rrggbb`) string into an RGB triple.
pub fn parse_hex(value: &str) -> Option<[u8; 3]> {
    let digits = value.strip_prefix('#').unwrap_or(value);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Check that a string is exactly `#` followed by six hex digits.
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7 && value.starts_with('#') && parse_hex(value).is_some()
}

/// Normalize a color coming from a source format.
///
/// Accepts `#RRGGBB`, `RRGGBB` and `rgb(r, g, b)`. Returns `None` for anything else.
pub fn normalize_hex(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<u8> = inner
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .collect();
        return match parts.as_slice() {
            [r, g, b] => Some(format_hex([*r, *g, *b])),
            _ => None,
        };
    }
    parse_hex(trimmed).map(format_hex)
}

/// Source of class colors.
///
/// Each color is three independent uniform bytes. Colors handed out by one
/// palette never repeat, so every class of a run gets a distinct color.
#[derive(Debug, Clone)]
pub struct Palette {
    rng: StdRng,
    issued: HashSet<String>,
}

impl Palette {
    /// Create a palette seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Create a reproducible palette.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Create a palette drawing from the given generator.
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            issued: HashSet::new(),
        }
    }

    /// Mark an externally chosen color as taken.
    pub fn reserve(&mut self, color: &str) {
        self.issued.insert(color.to_string());
    }

    /// Draw the next unused color.
    pub fn next_color(&mut self) -> String {
        loop {
            let rgb = [
                self.rng.random::<u8>(),
                self.rng.random::<u8>(),
                self.rng.random::<u8>(),
            ];
            let color = format_hex(rgb);
            if self.issued.insert(color.clone()) {
                return color;
            }
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex([255, 0, 16]), "#ff0010");
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#FF0010"), Some([255, 0, 16]));
        assert_eq!(parse_hex("00ff00"), Some([0, 255, 0]));
        assert_eq!(parse_hex("#ff00"), None);
        assert_eq!(parse_hex("#gg0000"), None);
    }

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex("#ABCDEF").as_deref(), Some("#abcdef"));
        assert_eq!(normalize_hex("rgb(1, 2, 255)").as_deref(), Some("#0102ff"));
        assert_eq!(normalize_hex("red"), None);
    }

    #[test]
    fn test_palette_colors_are_distinct_and_valid() {
        let mut palette = Palette::seeded(7);
        let colors: Vec<String> = (0..200).map(|_| palette.next_color()).collect();
        let unique: HashSet<&String> = colors.iter().collect();

        assert_eq!(unique.len(), colors.len());
        assert!(colors.iter().all(|c| is_hex_color(c)));
        assert!(colors.iter().all(|c| c == &c.to_lowercase()));
    }

    #[test]
    fn test_seeded_palette_is_reproducible() {
        let mut a = Palette::seeded(42);
        let mut b = Palette::seeded(42);
        assert_eq!(a.next_color(), b.next_color());
        assert_eq!(a.next_color(), b.next_color());
    }
}
