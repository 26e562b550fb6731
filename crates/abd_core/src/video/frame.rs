//! Still frame rendering for custom-frame mode.
//!
//! Layout: background, optional bordered cover left of centre, title right
//! of centre with optional artist/album lines and an optional glow.

use std::fs;
use std::path::{Path, PathBuf};

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle, WrapStyle};
use fontdue::{Font, FontSettings};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use super::color::color_or;
use crate::config::FrameSettings;
use crate::models::{BackgroundMode, TrackMetadata};

#[cfg(target_os = "macos")]
const FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
];
#[cfg(all(unix, not(target_os = "macos")))]
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/noto/NotoSans-Bold.ttf",
];
#[cfg(windows)]
const FONT_CANDIDATES: &[&str] = &["C:\\Windows\\Fonts\\arialbd.ttf", "C:\\Windows\\Fonts\\arial.ttf"];

/// Load the configured font, else the first system candidate that parses.
pub fn load_font(configured: &str) -> Option<Font> {
    let configured = configured.trim();
    let candidates = std::iter::once(configured)
        .filter(|p| !p.is_empty())
        .chain(FONT_CANDIDATES.iter().copied());

    for candidate in candidates {
        let Ok(bytes) = fs::read(candidate) else {
            continue;
        };
        match Font::from_bytes(bytes, FontSettings::default()) {
            Ok(font) => {
                tracing::debug!("Frame font: {}", candidate);
                return Some(font);
            }
            Err(e) => tracing::warn!("Could not parse font {}: {}", candidate, e),
        }
    }
    None
}

/// Renders per-track frames with fixed style and size.
pub struct FrameRenderer {
    width: u32,
    height: u32,
    settings: FrameSettings,
    font: Option<Font>,
    background: RgbaImage,
    fallback_cover: Option<DynamicImage>,
}

impl FrameRenderer {
    /// Prepare the background and style once for all tracks.
    pub fn new(settings: &FrameSettings, width: u32, height: u32, font: Option<Font>) -> Self {
        let fallback_cover = non_empty(&settings.fallback_cover).and_then(|p| open_image(&p));
        Self {
            width,
            height,
            background: render_background(settings, width, height),
            settings: settings.clone(),
            font,
            fallback_cover,
        }
    }

    /// Pick the cover for a track: embedded, sidecar, then configured fallback.
    pub fn choose_cover(
        &self,
        metadata: &TrackMetadata,
        sidecar: Option<&Path>,
    ) -> Option<DynamicImage> {
        if !self.settings.show_cover {
            return None;
        }
        metadata
            .cover
            .as_deref()
            .and_then(|bytes| image::load_from_memory(bytes).ok())
            .or_else(|| sidecar.and_then(open_image))
            .or_else(|| self.fallback_cover.clone())
    }

    /// Render one frame.
    pub fn render(&self, metadata: &TrackMetadata, cover: Option<&DynamicImage>) -> RgbaImage {
        let mut canvas = self.background.clone();
        let (w, h) = (self.width as i64, self.height as i64);
        let gap = (w / 40).max(8);

        if let Some(cover) = cover {
            let size = ((h as f64 * 0.55).min(w as f64 * 0.35)).max(16.0) as u32;
            let border = self.settings.cover_border.min(size / 4);
            let thumb = cover.resize_to_fill(size, size, FilterType::Lanczos3).to_rgba8();

            let x = w / 2 - gap - (size + 2 * border) as i64;
            let y = (h - (size + 2 * border) as i64) / 2;
            if border > 0 {
                let frame_color = color_or(&self.settings.text_color, [255, 255, 255]);
                let framed = RgbaImage::from_pixel(
                    size + 2 * border,
                    size + 2 * border,
                    Rgba([frame_color[0], frame_color[1], frame_color[2], 255]),
                );
                imageops::overlay(&mut canvas, &framed, x, y);
            }
            imageops::overlay(&mut canvas, &thumb, x + border as i64, y + border as i64);
        }

        if let Some(font) = &self.font {
            self.draw_text_block(&mut canvas, font, metadata, (w / 2 + gap) as f32);
        }

        canvas
    }

    fn draw_text_block(&self, canvas: &mut RgbaImage, font: &Font, meta: &TrackMetadata, x: f32) {
        let h = self.height as f32;
        let max_width = (self.width as f32 - x - self.width as f32 / 20.0).max(32.0);
        let title_px = (h / 14.0).max(12.0);
        let line_px = (h / 24.0).max(10.0);
        let text_color = color_or(&self.settings.text_color, [255, 255, 255]);

        let mut lines: Vec<(String, f32, u8)> = vec![(meta.title.clone(), title_px, 255)];
        if self.settings.show_artist {
            if let Some(artist) = &meta.artist {
                lines.push((artist.clone(), line_px, 220));
            }
        }
        if self.settings.show_album {
            if let Some(album) = &meta.album {
                lines.push((album.clone(), line_px, 180));
            }
        }

        let block_height: f32 = lines.iter().map(|(_, px, _)| px * 1.4).sum();
        let mut y = (h - block_height) / 2.0;

        for (index, (text, px, alpha)) in lines.iter().enumerate() {
            if index == 0 && self.settings.glow {
                self.draw_glow(canvas, font, text, *px, x, y, max_width);
            }
            let color = [text_color[0], text_color[1], text_color[2], *alpha];
            draw_text(canvas, font, text, *px, x, y, max_width, color);
            y += px * 1.4;
        }
    }

    /// Offset low-opacity copies on a square grid around the title.
    #[allow(clippy::too_many_arguments)]
    fn draw_glow(
        &self,
        canvas: &mut RgbaImage,
        font: &Font,
        text: &str,
        px: f32,
        x: f32,
        y: f32,
        max_width: f32,
    ) {
        let intensity = self.settings.glow_intensity.clamp(0.0, 1.0);
        if intensity <= 0.0 {
            return;
        }
        let radius = (intensity * 8.0).round().max(1.0) as i32;
        let alpha = (intensity * 48.0).round().clamp(4.0, 255.0) as u8;
        let glow = color_or(&self.settings.glow_color, [0x6F, 0xA8, 0xFF]);
        let step = (radius / 3).max(1);

        let mut dy = -radius;
        while dy <= radius {
            let mut dx = -radius;
            while dx <= radius {
                if dx != 0 || dy != 0 {
                    draw_text(
                        canvas,
                        font,
                        text,
                        px,
                        x + dx as f32,
                        y + dy as f32,
                        max_width,
                        [glow[0], glow[1], glow[2], alpha],
                    );
                }
                dx += step;
            }
            dy += step;
        }
    }
}

fn non_empty(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

fn open_image(path: &Path) -> Option<DynamicImage> {
    match image::open(path) {
        Ok(img) => Some(img),
        Err(e) => {
            tracing::warn!("Could not load image {}: {}", path.display(), e);
            None
        }
    }
}

/// Background for every frame; image mode falls back to black.
fn render_background(settings: &FrameSettings, width: u32, height: u32) -> RgbaImage {
    let top = color_or(&settings.background_color, [0x10, 0x10, 0x18]);
    match settings.background {
        BackgroundMode::Solid => {
            RgbaImage::from_pixel(width, height, Rgba([top[0], top[1], top[2], 255]))
        }
        BackgroundMode::Gradient => {
            let bottom = color_or(&settings.gradient_color, [0, 0, 0]);
            let span = height.saturating_sub(1).max(1) as f32;
            RgbaImage::from_fn(width, height, |_, y| {
                let t = y as f32 / span;
                let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
                Rgba([mix(top[0], bottom[0]), mix(top[1], bottom[1]), mix(top[2], bottom[2]), 255])
            })
        }
        BackgroundMode::Image => non_empty(&settings.background_image)
            .and_then(|p| open_image(&p))
            .map(|img| img.resize_to_fill(width, height, FilterType::Lanczos3).to_rgba8())
            .unwrap_or_else(|| RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))),
    }
}

/// Rasterise text with its top-left corner at (x, y).
#[allow(clippy::too_many_arguments)]
fn draw_text(
    canvas: &mut RgbaImage,
    font: &Font,
    text: &str,
    px: f32,
    x: f32,
    y: f32,
    max_width: f32,
    color: [u8; 4],
) {
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings {
        x,
        y,
        max_width: Some(max_width),
        wrap_style: WrapStyle::Word,
        ..LayoutSettings::default()
    });
    layout.append(&[font], &TextStyle::new(text, px, 0));

    for glyph in layout.glyphs() {
        if glyph.width == 0 || glyph.height == 0 {
            continue;
        }
        let (_, bitmap) = font.rasterize_config(glyph.key);
        blend_mask(
            canvas,
            glyph.x.round() as i64,
            glyph.y.round() as i64,
            glyph.width,
            glyph.height,
            &bitmap,
            color,
        );
    }
}

fn blend_mask(
    canvas: &mut RgbaImage,
    x: i64,
    y: i64,
    width: usize,
    height: usize,
    mask: &[u8],
    color: [u8; 4],
) {
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    for row in 0..height {
        let py = y + row as i64;
        if py < 0 || py >= ch {
            continue;
        }
        for col in 0..width {
            let px = x + col as i64;
            if px < 0 || px >= cw {
                continue;
            }
            let coverage = mask.get(row * width + col).copied().unwrap_or(0);
            if coverage == 0 {
                continue;
            }
            let alpha = u16::from(coverage) * u16::from(color[3]) / 255;
            let pixel = canvas.get_pixel_mut(px as u32, py as u32);
            for channel in 0..3 {
                let dst = u16::from(pixel.0[channel]);
                let src = u16::from(color[channel]);
                pixel.0[channel] = ((src * alpha + dst * (255 - alpha)) / 255) as u8;
            }
        }
    }
}
