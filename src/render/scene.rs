//! Per-frame composition: pulse and rotation, cached layers, the live tail
//! of the spiral and the traveling marker.

use kurbo::Point;
use std::f64::consts::TAU;

use super::cache::{CacheKey, RenderCache, Style};
use super::graphics::Graphics;
use super::groove::{self, GROOVE_INK};
use super::pulse::PulseEnvelope;
use super::raster::centered;
use crate::audio::analysis::{enrich, AudioAnalysis, RawAnalysis};
use crate::audio::features::AudioFeatures;
use crate::color::palette::ColorPalette;
use crate::color::rgb::Rgb;
use crate::error::{SpindleError, SpindleResult};
use crate::geometry::spiral::Spiral;

/// Upper bound on bisection steps in [`find_bounds`]; sorted input needs
/// at most log2(segments).
const MAX_BOUND_STEPS: usize = 64;

/// A loaded track: enriched analysis plus display metadata.
#[derive(Clone, Debug)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub analysis: AudioAnalysis,
    pub key_colors: [Rgb; 3],
}

impl Track {
    pub fn new(raw: &RawAnalysis, features: &AudioFeatures, title: String, artist: String) -> Self {
        let mut palette = ColorPalette::new(features);
        let analysis = enrich(raw, &mut palette);
        Self {
            id: features.uri.clone(),
            title,
            artist,
            analysis,
            key_colors: palette.key_colors(),
        }
    }
}

/// Segments around a progress value and the interpolation fraction between
/// their start times.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub current: usize,
    pub next: usize,
    pub t: f64,
}

/// Binary search for `current.progress_pct <= pct < next.progress_pct`.
///
/// Past the last segment this clamps to `(last, last, 0.5)`; before the
/// first it clamps to `(first, first, 0)`. Failing to bracket means the
/// segments are not sorted.
pub fn find_bounds(analysis: &AudioAnalysis, progress_pct: f64) -> SpindleResult<Bounds> {
    let segments = &analysis.segments;
    if segments.len() < 2 {
        return Err(SpindleError::validation(format!(
            "need at least two segments, got {}",
            segments.len()
        )));
    }

    let last = segments.len() - 1;
    if progress_pct >= segments[last].progress_pct {
        return Ok(Bounds {
            current: last,
            next: last,
            t: 0.5,
        });
    }
    if progress_pct < segments[0].progress_pct {
        return Ok(Bounds {
            current: 0,
            next: 0,
            t: 0.0,
        });
    }

    let progress_ms = progress_pct * analysis.duration_ms();
    let (mut lo, mut hi) = (0, last);
    for _ in 0..MAX_BOUND_STEPS {
        if lo >= hi {
            break;
        }
        let mid = lo + (hi - lo) / 2;
        let (cur, next) = (&segments[mid], &segments[mid + 1]);
        if cur.progress_pct <= progress_pct && progress_pct < next.progress_pct {
            let span = next.start_ms - cur.start_ms;
            let t = if span > 0.0 {
                (progress_ms - cur.start_ms) / span
            } else {
                0.0
            };
            return Ok(Bounds {
                current: mid,
                next: mid + 1,
                t,
            });
        }
        if progress_pct < cur.progress_pct {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    Err(SpindleError::malformed(format!(
        "no segment pair brackets progress {:.6}",
        progress_pct
    )))
}

/// Clamp drifted progress into `[0, 1]`.
pub fn clamp_progress(pct: f64) -> f64 {
    if pct.is_nan() {
        return 0.0;
    }
    if !(0.0..=1.0).contains(&pct) {
        log::trace!("Progress {:.4} outside [0, 1], clamping", pct);
    }
    pct.clamp(0.0, 1.0)
}

/// Everything a frame needs apart from the cache.
#[derive(Clone, Debug)]
pub struct Scene {
    track: Track,
    spiral: Spiral,
    style: Style,
    pulse: PulseEnvelope,
}

impl Scene {
    pub fn new(track: Track, spiral: Spiral, style: Style) -> Self {
        let pulse = PulseEnvelope::new(style.render.pulse_window_ms, style.render.pulse_strength);
        Self {
            track,
            spiral,
            style,
            pulse,
        }
    }

    #[cfg(test)]
    pub fn track(&self) -> &Track {
        &self.track
    }

    #[cfg(test)]
    pub fn spiral(&self) -> &Spiral {
        &self.spiral
    }

    fn cache_key(&self, width: u32, height: u32) -> CacheKey {
        CacheKey {
            track_id: self.track.id.clone(),
            width,
            height,
        }
    }

    /// Draw one frame at an already clamped progress.
    pub fn draw_frame<G: Graphics>(
        &self,
        g: &mut G,
        cache: &RenderCache,
        pct: f64,
    ) -> SpindleResult<()> {
        let (w, h) = g.size();
        let analysis = &self.track.analysis;
        let k = cache.sections();

        g.image(cache.background(), Point::ZERO);

        let scale = self.pulse.scale_at(&analysis.beats, pct * analysis.duration_ms());
        let angle = self.style.render.rotation_turns * TAU * pct;
        let offset = centered(w, h);

        g.push();
        g.translate(f64::from(w) / 2.0, f64::from(h) / 2.0);
        g.scale(scale);
        g.rotate(angle);

        let elapsed = ((pct * k as f64).floor() as usize).min(k);
        g.image(&cache.stack()[elapsed], offset);

        let theta_now = self.spiral.theta_for_progress(pct);
        if elapsed < k {
            g.stroke(GROOVE_INK);
            g.stroke_weight(1.5);
            groove::stroke_spiral(g, &self.spiral, cache.boundaries()[elapsed], theta_now);
        }

        let (position, color) = self.traveling_marker(cache, pct, theta_now)?;
        g.stroke(Rgb::WHITE.to_rgba8(220));
        g.stroke_weight(2.0);
        g.fill(color.to_rgba8(255));
        g.circle(position, self.style.render.marker_scale * 4.0);

        if elapsed < k {
            let live = cache
                .markers()
                .iter()
                .filter(|m| m.section == elapsed && m.progress_pct <= pct);
            for marker in live {
                groove::draw_marker(g, marker, 255);
            }
        }

        g.pop();
        Ok(())
    }

    /// Position and color between the bounding segments, kept from sinking
    /// inside the spiral's current radius.
    pub fn traveling_marker(
        &self,
        cache: &RenderCache,
        pct: f64,
        theta_now: f64,
    ) -> SpindleResult<(Point, Rgb)> {
        let bounds = find_bounds(&self.track.analysis, pct)?;
        let markers = cache.markers();
        let (a, b) = (&markers[bounds.current], &markers[bounds.next]);

        let mut position = a.position.lerp(b.position, bounds.t);
        let color = a.color.lerp(b.color, bounds.t);
        if position.x.hypot(position.y) < self.spiral.distance(theta_now) {
            position = self.spiral.point_at(theta_now, 0.0);
        }
        Ok((position, color))
    }
}

/// A scene plus its layer cache, rebuilt whenever the track or canvas size
/// changes.
#[derive(Debug)]
pub struct Visualizer {
    scene: Scene,
    cache: Option<RenderCache>,
    builds: usize,
}

impl Visualizer {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            cache: None,
            builds: 0,
        }
    }

    #[cfg(test)]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Number of cache builds so far.
    #[cfg(test)]
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// Switch tracks. A different track discards the current cache.
    #[allow(dead_code)]
    pub fn set_track(&mut self, track: Track) {
        if track.id != self.scene.track.id {
            log::info!("Track changed to {}, dropping render cache", track.id);
            self.cache = None;
        }
        self.scene.track = track;
    }

    pub fn ensure_cache(&mut self, width: u32, height: u32) -> SpindleResult<&RenderCache> {
        refresh(&self.scene, &mut self.cache, &mut self.builds, width, height)
    }

    pub fn render<G: Graphics>(&mut self, g: &mut G, progress_pct: f64) -> SpindleResult<()> {
        let pct = clamp_progress(progress_pct);
        let (width, height) = g.size();
        let cache = refresh(&self.scene, &mut self.cache, &mut self.builds, width, height)?;
        self.scene.draw_frame(g, cache, pct)
    }
}

/// Reuse `slot` when its key matches, otherwise build a complete new cache
/// and swap it in.
fn refresh<'a>(
    scene: &Scene,
    slot: &'a mut Option<RenderCache>,
    builds: &mut usize,
    width: u32,
    height: u32,
) -> SpindleResult<&'a RenderCache> {
    let key = scene.cache_key(width, height);
    let cache = match slot.take() {
        Some(cache) if *cache.key() == key => cache,
        previous => {
            if let Some(old) = previous {
                log::info!(
                    "Render cache stale ({}x{} -> {}x{}), rebuilding",
                    old.key().width,
                    old.key().height,
                    width,
                    height
                );
            }
            *builds += 1;
            RenderCache::build(&scene.track, &scene.spiral, &scene.style, width, height)?
        }
    };
    Ok(slot.insert(cache))
}
