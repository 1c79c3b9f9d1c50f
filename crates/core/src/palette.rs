//! Color helpers for tag swatches and cover placeholders.

use once_cell::sync::Lazy;
use regex::Regex;

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("failed to compile hex color regex")
});

/// Whether `input` is a `#rgb` or `#rrggbb` color.
pub fn is_hex_color(input: &str) -> bool {
    HEX_COLOR_RE.is_match(input)
}

/// Split a `#rgb`/`#rrggbb` color into its channels.
pub fn parse_hex(input: &str) -> Option<(u8, u8, u8)> {
    let trimmed = input.trim();
    if !is_hex_color(trimmed) {
        return None;
    }
    let digits = trimmed.trim_start_matches('#');
    if digits.len() == 3 {
        let mut channels = digits
            .chars()
            .map(|ch| ch.to_digit(16).map(|value| (value * 17) as u8));
        return Some((channels.next()??, channels.next()??, channels.next()??));
    }
    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Pastel color derived from `seed`; the same seed always gives the same color.
pub fn pastel_from_seed(seed: &str) -> String {
    let hue = (fnv1a(seed) % 360) as f64;
    let (r, g, b) = hsl_to_rgb(hue, 0.70, 0.80);
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Up to two uppercase initials taken from the words of `title`.
pub fn initials(title: &str) -> String {
    let letters: String = title
        .split_whitespace()
        .filter_map(|word| word.chars().find(|ch| ch.is_alphanumeric()))
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}

fn fnv1a(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in input.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let scale = |channel: f64| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (scale(r1), scale(g1), scale(b1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_hex_colors() {
        assert!(is_hex_color("#abc"));
        assert!(is_hex_color("#A1B2C3"));
        assert!(!is_hex_color("abc"));
        assert!(!is_hex_color("#abcd"));
        assert!(!is_hex_color("#ggg"));
    }

    #[test]
    fn expands_short_hex() {
        assert_eq!(parse_hex("#fff"), Some((255, 255, 255)));
        assert_eq!(parse_hex("#102030"), Some((16, 32, 48)));
        assert_eq!(parse_hex("red"), None);
    }

    #[test]
    fn pastel_is_deterministic_and_light() {
        let first = pastel_from_seed("tag-1");
        assert_eq!(first, pastel_from_seed("tag-1"));
        assert!(is_hex_color(&first));
        let (r, g, b) = parse_hex(&first).expect("valid color");
        assert!(r.max(g).max(b) > 200);
    }

    #[test]
    fn initials_use_first_two_words() {
        assert_eq!(initials("dungeon pals"), "DP");
        assert_eq!(initials("Hades"), "H");
        assert_eq!(initials("  "), "?");
        assert_eq!(initials("the legend of zelda"), "TL");
    }
}
