//! Hex colour parsing for frame settings.

/// Parse `#RRGGBB`, `RRGGBB` or `#RGB`.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some([r, g, b])
        }
        3 => {
            let mut rgb = [0u8; 3];
            for (slot, ch) in rgb.iter_mut().zip(hex.chars()) {
                let v = ch.to_digit(16)? as u8;
                *slot = v * 16 + v;
            }
            Some(rgb)
        }
        _ => None,
    }
}

/// Parse a colour, logging and using `fallback` when invalid.
pub fn color_or(value: &str, fallback: [u8; 3]) -> [u8; 3] {
    parse_hex_color(value).unwrap_or_else(|| {
        tracing::warn!("Invalid colour '{}', using fallback", value);
        fallback
    })
}
