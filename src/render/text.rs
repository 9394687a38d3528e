use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use kurbo::Point;
use std::path::Path;
use std::sync::Arc;
use vello_cpu::peniko::{Blob, FontData};
use vello_cpu::Glyph;

use crate::error::{SpindleError, SpindleResult};

/// Title font: `fontdue` for metrics and glyph lookup, the same bytes as
/// `vello_cpu` font data for drawing.
#[derive(Clone)]
pub struct TextOverlay {
    font: Arc<Font>,
    data: FontData,
}

impl TextOverlay {
    pub fn from_bytes(bytes: &[u8]) -> SpindleResult<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(SpindleError::font)?;
        Ok(Self {
            font: Arc::new(font),
            data: FontData::new(Blob::from(bytes.to_vec()), 0),
        })
    }

    pub fn font_data(&self) -> &FontData {
        &self.data
    }

    /// Width of rendered text in pixels.
    pub fn measure_width(&self, text: &str, size: f32) -> f32 {
        text.chars()
            .map(|ch| self.font.metrics(ch, size).advance_width)
            .sum()
    }

    /// Positioned glyphs for one line of `text` centered on `at`.
    pub fn glyphs(&self, text: &str, at: Point, size: f32) -> Vec<Glyph> {
        let (ascent, descent) = self
            .font
            .horizontal_line_metrics(size)
            .map(|m| (m.ascent, m.descent))
            .unwrap_or((size * 0.8, -size * 0.2));
        let baseline = at.y as f32 + (ascent + descent) / 2.0;
        let mut pen = at.x as f32 - self.measure_width(text, size) / 2.0;
        text.chars()
            .map(|ch| {
                let glyph = Glyph {
                    id: u32::from(self.font.lookup_glyph_index(ch)),
                    x: pen,
                    y: baseline,
                };
                pen += self.font.metrics(ch, size).advance_width;
                glyph
            })
            .collect()
    }
}

impl std::fmt::Debug for TextOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextOverlay").finish_non_exhaustive()
    }
}

pub fn load_font_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read font: {}", path.display()))
}

/// Download a TTF/OTF font. Only runs at startup, never per frame.
pub fn load_font_from_url(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading font from {}", url);
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to fetch font from {}", url))?
        .error_for_status()
        .with_context(|| format!("Font request failed: {}", url))?;
    let bytes = response.bytes().context("Failed to read font response body")?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_font_bytes() {
        let err = TextOverlay::from_bytes(b"definitely not a font").unwrap_err();
        assert!(matches!(err, SpindleError::Font(_)));
    }
}
