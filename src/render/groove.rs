//! Spiral strokes and segment markers, shared by the prerendered layers and
//! the live part of each frame.

use kurbo::Point;

use super::graphics::{Graphics, Rgba8};
use crate::audio::analysis::AudioAnalysis;
use crate::color::rgb::Rgb;
use crate::config::RenderConfig;
use crate::geometry::spiral::Spiral;

pub const GROOVE_INK: Rgba8 = [18, 18, 22, 230];
pub const GHOST_INK: Rgba8 = [18, 18, 22, 56];
pub const GHOST_MARKER_ALPHA: u8 = 70;

/// A segment placed on the spiral.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub progress_pct: f64,
    pub position: Point,
    pub radius: f64,
    pub color: Rgb,
    /// Cached section layer that owns this marker.
    pub section: usize,
}

/// Which of `sections` equal progress slices `pct` falls in.
pub fn section_index(pct: f64, sections: usize) -> usize {
    let last = sections.saturating_sub(1);
    if !(pct > 0.0) {
        return 0;
    }
    ((pct * sections as f64).floor() as usize).min(last)
}

/// Radial offset for a pitch class, centered on the groove.
pub fn pitch_offset(avg_pitch: usize, spread: f64) -> f64 {
    (avg_pitch as f64 - 5.5) * spread
}

/// One marker per segment, index-aligned with `analysis.segments`.
pub fn place_markers(analysis: &AudioAnalysis, spiral: &Spiral, cfg: &RenderConfig) -> Vec<Marker> {
    analysis
        .segments
        .iter()
        .map(|seg| {
            let theta = spiral.theta_for_progress(seg.progress_pct);
            Marker {
                progress_pct: seg.progress_pct,
                position: spiral.point_at(theta, pitch_offset(seg.avg_pitch, cfg.pitch_spread)),
                radius: seg.relative_loudness * cfg.marker_scale,
                color: seg.color,
                section: section_index(seg.progress_pct, cfg.sections),
            }
        })
        .collect()
}

/// Stroke the spiral between two angles with the current stroke style.
/// Returns the number of line segments issued.
pub fn stroke_spiral<G: Graphics>(g: &mut G, spiral: &Spiral, from: f64, to: f64) -> usize {
    let points: Vec<Point> = spiral.walk(from, to).map(|t| spiral.point_at(t, 0.0)).collect();
    g.polyline(&points);
    let count = points.len().saturating_sub(1);
    log::trace!("Stroked {} spiral segments up to theta {:.3}", count, to);
    count
}

pub fn draw_marker<G: Graphics>(g: &mut G, marker: &Marker, alpha: u8) {
    g.no_stroke();
    g.fill(marker.color.to_rgba8(alpha));
    g.circle(marker.position, marker.radius * 2.0);
}
