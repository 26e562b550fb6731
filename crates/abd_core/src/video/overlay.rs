//! Timed `drawtext` overlays for the black-screen clip.

use std::path::PathBuf;

/// Most overlays rendered into one clip.
pub const MAX_OVERLAYS: usize = 500;

/// Upper bound of the glow/border width in pixels.
pub const MAX_GLOW_WIDTH: i32 = 20;

/// A text shown during `[start, end)` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub font_size: u32,
    /// ffmpeg colour (`white`, `0xRRGGBB`).
    pub color: String,
    /// x/y expressions, e.g. `(w-text_w)/2`.
    pub x: String,
    pub y: String,
    /// Border ("glow") width, clamped to `0..=20`.
    pub glow_width: i32,
    pub glow_color: String,
    pub font_file: Option<PathBuf>,
}

impl TextOverlay {
    /// Centred white text near the bottom of the frame.
    pub fn caption(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            font_size: 48,
            color: "white".to_string(),
            x: "(w-text_w)/2".to_string(),
            y: "h-(text_h*3)".to_string(),
            glow_width: 0,
            glow_color: "black".to_string(),
            font_file: None,
        }
    }

    fn to_filter(&self) -> String {
        let mut filter = format!(
            "drawtext=expansion=none:text={}:fontsize={}:fontcolor={}:x={}:y={}",
            escape_drawtext(&self.text),
            self.font_size,
            escape_value(&self.color),
            escape_value(&self.x),
            escape_value(&self.y)
        );
        let border = self.glow_width.clamp(0, MAX_GLOW_WIDTH);
        if border > 0 {
            filter.push_str(&format!(
                ":borderw={}:bordercolor={}",
                border,
                escape_value(&self.glow_color)
            ));
        }
        if let Some(font) = &self.font_file {
            filter.push_str(&format!(
                ":fontfile={}",
                escape_value(&font.to_string_lossy())
            ));
        }
        filter.push_str(&format!(
            ":enable='gte(t,{:.3})*lt(t,{:.3})'",
            self.start, self.end
        ));
        filter
    }
}

/// Escape overlay text for a `drawtext` inside a filtergraph.
///
/// Line breaks become spaces. `%` needs no escaping because every filter
/// is emitted with `expansion=none`.
pub fn escape_drawtext(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r') { ' ' } else { ch })
        .collect();
    escape_value(&flat)
}

/// Escape any option value of a filter that sits in a filtergraph.
///
/// ffmpeg unescapes twice: the filtergraph parser first, then the filter's
/// own `key=value` parser. The value is escaped for the inner level, and
/// the result again for the outer one.
fn escape_value(value: &str) -> String {
    let inner = escape_chars(value, &['\\', '\'', ':']);
    escape_chars(&inner, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Filter chain for the overlays, `None` when there is nothing to draw.
///
/// Entries with an empty window are dropped; at most [`MAX_OVERLAYS`] are used.
pub fn drawtext_chain(overlays: &[TextOverlay]) -> Option<String> {
    let filters: Vec<String> = overlays
        .iter()
        .filter(|o| o.end > o.start && !o.text.trim().is_empty())
        .take(MAX_OVERLAYS)
        .map(TextOverlay::to_filter)
        .collect();
    (!filters.is_empty()).then(|| filters.join(","))
}
