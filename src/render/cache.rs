//! Prerendered layers: a gradient background, a fixed layer with the whole
//! record in ghost ink, and a cumulative stack where entry `i` holds the
//! fixed layer plus the first `i` slices of progress.

use kurbo::Point;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::time::Instant;

use super::graphics::Graphics;
use super::groove::{self, Marker, GHOST_INK, GHOST_MARKER_ALPHA, GROOVE_INK};
use super::raster::{Layer, Raster};
use super::scene::Track;
use super::text::TextOverlay;
use crate::config::RenderConfig;
use crate::error::{SpindleError, SpindleResult};
use crate::geometry::spiral::Spiral;

const GUIDE_INK: [u8; 4] = [255, 255, 255, 110];
const LABEL_INK: [u8; 4] = [255, 255, 255, 230];

/// Everything besides the track that decides how layers look.
#[derive(Clone, Debug)]
pub struct Style {
    pub render: RenderConfig,
    pub text: Option<TextOverlay>,
    pub font_size: f64,
}

/// Identity of a cache: rebuilt when either the track or the canvas changes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub track_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct RenderCache {
    key: CacheKey,
    background: Layer,
    /// `K + 1` layers, `stack[0]` is the fixed layer alone.
    stack: Vec<Layer>,
    markers: Vec<Marker>,
    /// Theta at each section edge `i / K`, `K + 1` entries.
    boundaries: Vec<f64>,
}

impl RenderCache {
    pub fn build(
        track: &Track,
        spiral: &Spiral,
        style: &Style,
        width: u32,
        height: u32,
    ) -> SpindleResult<Self> {
        if width == 0 || height == 0 {
            return Err(SpindleError::validation(format!(
                "canvas must be non-empty, got {}x{}",
                width, height
            )));
        }
        let k = style.render.sections;
        if k == 0 {
            return Err(SpindleError::validation("need at least one section layer"));
        }

        let started = Instant::now();
        let key = CacheKey {
            track_id: track.id.clone(),
            width,
            height,
        };

        let boundaries: Vec<f64> = (0..=k)
            .map(|i| spiral.theta_for_progress(i as f64 / k as f64))
            .collect();
        let markers = groove::place_markers(&track.analysis, spiral, &style.render);

        let mut background = Raster::new(width, height)?;
        let center = Point::new(f64::from(width) / 2.0, f64::from(height) / 2.0);
        background.radial_gradient(center, center.x.hypot(center.y), track.key_colors);
        let background = background.into_layer();

        let mut fixed = Raster::new(width, height)?.with_text(style.text.clone());
        draw_fixed(&mut fixed, track, spiral, style, &markers);

        let slices = (0..k)
            .into_par_iter()
            .map(|i| {
                let mut layer = Raster::new(width, height)?;
                draw_section(&mut layer, spiral, &markers, i, boundaries[i], boundaries[i + 1]);
                Ok(layer.into_layer())
            })
            .collect::<SpindleResult<Vec<Layer>>>()?;

        let mut stack = Vec::with_capacity(k + 1);
        stack.push(fixed.into_layer());
        for slice in &slices {
            let mut merged = Raster::new(width, height)?;
            if let Some(below) = stack.last() {
                merged.image(below, Point::ZERO);
            }
            merged.image(slice, Point::ZERO);
            stack.push(merged.into_layer());
        }

        log::info!(
            "Prerendered {} layers at {}x{} in {:.0}ms",
            stack.len() + 1,
            width,
            height,
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            key,
            background,
            stack,
            markers,
            boundaries,
        })
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn background(&self) -> &Layer {
        &self.background
    }

    /// Cumulative layers: `stack()[i]` shows the record with `i` sections done.
    pub fn stack(&self) -> &[Layer] {
        &self.stack
    }

    /// Number of progress slices, `K`.
    pub fn sections(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }
}

fn draw_fixed(layer: &mut Raster, track: &Track, spiral: &Spiral, style: &Style, markers: &[Marker]) {
    let (w, h) = layer.size();
    layer.translate(f64::from(w) / 2.0, f64::from(h) / 2.0);

    // half a groove beyond the outermost and innermost turns
    let margin = spiral.params().b * PI;
    let outer = spiral.distance(spiral.theta_end()) + margin;
    let inner = (spiral.distance(spiral.theta_start()) - margin).max(0.0);
    layer.no_fill();
    layer.stroke(GUIDE_INK);
    layer.stroke_weight(2.0);
    layer.circle(Point::ZERO, outer * 2.0);
    layer.circle(Point::ZERO, inner * 2.0);

    let fs = style.font_size;
    layer.no_stroke();
    layer.fill(LABEL_INK);
    if !track.title.is_empty() {
        layer.text(&track.title, Point::new(0.0, -0.6 * fs), fs);
    }
    if !track.artist.is_empty() {
        layer.text(&track.artist, Point::new(0.0, 0.8 * fs), fs * 0.7);
    }

    layer.stroke(GHOST_INK);
    layer.stroke_weight(1.0);
    groove::stroke_spiral(layer, spiral, spiral.theta_start(), spiral.theta_end());

    for marker in markers {
        groove::draw_marker(layer, marker, GHOST_MARKER_ALPHA);
    }
}

fn draw_section(
    layer: &mut Raster,
    spiral: &Spiral,
    markers: &[Marker],
    index: usize,
    from: f64,
    to: f64,
) {
    let (w, h) = layer.size();
    layer.translate(f64::from(w) / 2.0, f64::from(h) / 2.0);
    layer.stroke(GROOVE_INK);
    layer.stroke_weight(1.5);
    let lines = groove::stroke_spiral(layer, spiral, from, to);

    let mut drawn = 0;
    for marker in markers.iter().filter(|m| m.section == index) {
        groove::draw_marker(layer, marker, 255);
        drawn += 1;
    }
    log::debug!("Section {}: {} lines, {} markers", index, lines, drawn);
}
