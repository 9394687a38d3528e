//! CPU pixel target backed by `vello_cpu`, and the immutable [`Layer`]s it
//! bakes into.

use kurbo::{Affine, Point, Vec2};
use std::sync::Arc;
use vello_cpu::kurbo::{self as vk, Shape};
use vello_cpu::peniko::{Color, Gradient, ImageSampler};
use vello_cpu::{Pixmap, RenderContext};

use super::graphics::{Graphics, Rgba8, StateStack};
use super::text::TextOverlay;
use crate::color::rgb::Rgb;
use crate::error::{SpindleError, SpindleResult};

/// Flattening tolerance for circles, in user units.
const CURVE_TOLERANCE: f64 = 0.1;

/// A finished raster, drawn into other targets as an image paint.
#[derive(Clone)]
pub struct Layer {
    pixmap: Arc<Pixmap>,
    width: u32,
    height: u32,
}

impl Layer {
    /// Wrap premultiplied RGBA8 bytes.
    #[cfg(test)]
    pub fn from_premul(bytes: &[u8], width: u32, height: u32) -> SpindleResult<Self> {
        let (w, h) = canvas_dims(width, height)?;
        if bytes.len() != width as usize * height as usize * 4 {
            return Err(SpindleError::validation(format!(
                "layer is {} bytes, {}x{} needs {}",
                bytes.len(),
                width,
                height,
                width as usize * height as usize * 4
            )));
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
            .collect();
        Ok(Self {
            pixmap: Arc::new(Pixmap::from_parts_with_opacity(pixels, w, h, true)),
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn paint(&self) -> vello_cpu::Image {
        vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::clone(&self.pixmap)),
            sampler: ImageSampler::default(),
        }
    }

    /// Premultiplied pixel.
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let data = self.pixmap.data_as_u8_slice();
        [data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]
    }

    #[cfg(test)]
    pub fn painted(&self) -> usize {
        self.pixmap
            .data_as_u8_slice()
            .chunks_exact(4)
            .filter(|p| p[3] > 0)
            .count()
    }
}

/// Layers compare by identity: two handles are equal when they share pixels.
impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixmap, &other.pixmap)
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Retained drawing target. Commands accumulate in the render context and
/// are rasterized when pixels are read.
pub struct Raster {
    width: u32,
    height: u32,
    ctx: RenderContext,
    pixmap: Pixmap,
    dirty: bool,
    states: StateStack,
    text: Option<TextOverlay>,
}

impl Raster {
    /// Transparent raster.
    pub fn new(width: u32, height: u32) -> SpindleResult<Self> {
        let (w, h) = canvas_dims(width, height)?;
        Ok(Self {
            width,
            height,
            ctx: RenderContext::new(w, h),
            pixmap: Pixmap::new(w, h),
            dirty: false,
            states: StateStack::default(),
            text: None,
        })
    }

    pub fn with_text(mut self, text: Option<TextOverlay>) -> Self {
        self.text = text;
        self
    }

    /// Drop everything drawn so far and return to the default state.
    pub fn reset(&mut self) {
        self.ctx.reset();
        self.states = StateStack::default();
        self.dirty = true;
    }

    /// Premultiplied RGBA8 rows. Opaque frames read the same as straight
    /// alpha.
    pub fn as_rgba(&mut self) -> &[u8] {
        self.rasterize();
        self.pixmap.data_as_u8_slice()
    }

    pub fn into_layer(mut self) -> Layer {
        self.rasterize();
        Layer {
            pixmap: Arc::new(self.pixmap),
            width: self.width,
            height: self.height,
        }
    }

    /// Opaque three-stop radial gradient over the whole raster: `stops[0]`
    /// at the center, `stops[1]` halfway, `stops[2]` from `radius` outward.
    pub fn radial_gradient(&mut self, center: Point, radius: f64, stops: [Rgb; 3]) {
        let [inner, mid, outer] = stops.map(|c| {
            let [r, g, b, _] = c.to_rgba8(255);
            Color::from_rgba8(r, g, b, 255)
        });
        let gradient = Gradient::new_radial((center.x, center.y), radius.max(f64::EPSILON) as f32)
            .with_stops([(0.0, inner), (0.5, mid), (1.0, outer)]);
        self.ctx.set_transform(vk::Affine::IDENTITY);
        self.ctx.set_paint_transform(vk::Affine::IDENTITY);
        self.ctx.set_paint(gradient);
        self.ctx.fill_rect(&vk::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));
        self.dirty = true;
    }

    fn rasterize(&mut self) {
        if !self.dirty {
            return;
        }
        self.pixmap.data_as_u8_slice_mut().fill(0);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.pixmap);
        self.dirty = false;
    }

    /// Load the current transform and return the state it came from.
    fn begin(&mut self) -> super::graphics::DrawState {
        let s = *self.state();
        self.ctx.set_transform(to_cpu(s.transform));
        self.dirty = true;
        s
    }

    fn stroke_with(&mut self, path: &vk::BezPath, color: Rgba8, weight: f64) {
        self.ctx.set_paint(paint_color(color));
        self.ctx.set_stroke(vk::Stroke::new(weight));
        self.ctx.stroke_path(path);
    }

    #[cfg(test)]
    pub fn pixel(&mut self, x: u32, y: u32) -> Rgba8 {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let data = self.as_rgba();
        [data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("states", &self.states)
            .finish_non_exhaustive()
    }
}

impl Graphics for Raster {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn states(&self) -> &StateStack {
        &self.states
    }

    fn states_mut(&mut self) -> &mut StateStack {
        &mut self.states
    }

    fn line(&mut self, from: Point, to: Point) {
        self.polyline(&[from, to]);
    }

    fn polyline(&mut self, points: &[Point]) {
        let s = self.begin();
        let (Some(color), [first, rest @ ..]) = (s.stroke, points) else {
            return;
        };
        if rest.is_empty() {
            return;
        }
        let mut path = vk::BezPath::new();
        path.move_to(to_cpu_point(*first));
        for p in rest {
            path.line_to(to_cpu_point(*p));
        }
        self.stroke_with(&path, color, s.stroke_weight);
    }

    fn point(&mut self, at: Point) {
        let s = self.begin();
        if let Some(color) = s.stroke {
            let dot = vk::Circle::new(to_cpu_point(at), s.stroke_weight / 2.0);
            self.ctx.set_paint(paint_color(color));
            self.ctx.fill_path(&dot.to_path(CURVE_TOLERANCE));
        }
    }

    fn circle(&mut self, center: Point, diameter: f64) {
        let s = self.begin();
        let path = vk::Circle::new(to_cpu_point(center), diameter / 2.0).to_path(CURVE_TOLERANCE);
        if let Some(fill) = s.fill {
            self.ctx.set_paint(paint_color(fill));
            self.ctx.fill_path(&path);
        }
        if let Some(stroke) = s.stroke {
            self.stroke_with(&path, stroke, s.stroke_weight);
        }
    }

    fn rect(&mut self, origin: Point, width: f64, height: f64) {
        let s = self.begin();
        if let Some(fill) = s.fill {
            self.ctx.set_paint(paint_color(fill));
            self.ctx.fill_rect(&vk::Rect::new(
                origin.x,
                origin.y,
                origin.x + width,
                origin.y + height,
            ));
        }
    }

    fn text(&mut self, text: &str, at: Point, size: f64) {
        let s = self.begin();
        let (Some(overlay), Some(color)) = (self.text.clone(), s.fill) else {
            log::debug!("No font loaded, skipping text {:?}", text);
            return;
        };
        let glyphs = overlay.glyphs(text, at, size as f32);
        self.ctx.set_paint(paint_color(color));
        self.ctx
            .glyph_run(overlay.font_data())
            .font_size(size as f32)
            .fill_glyphs(glyphs.into_iter());
    }

    fn image(&mut self, layer: &Layer, top_left: Point) {
        let transform = self.state().transform * Affine::translate(top_left.to_vec2());
        self.ctx.set_transform(to_cpu(transform));
        self.ctx.set_paint_transform(vk::Affine::IDENTITY);
        self.ctx.set_paint(layer.paint());
        self.ctx.fill_rect(&vk::Rect::new(
            0.0,
            0.0,
            f64::from(layer.width()),
            f64::from(layer.height()),
        ));
        self.dirty = true;
    }
}

fn canvas_dims(width: u32, height: u32) -> SpindleResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| SpindleError::validation(format!("canvas width {} exceeds u16", width)))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| SpindleError::validation(format!("canvas height {} exceeds u16", height)))?;
    if w == 0 || h == 0 {
        return Err(SpindleError::validation(format!(
            "canvas must be non-empty, got {}x{}",
            width, height
        )));
    }
    Ok((w, h))
}

fn paint_color([r, g, b, a]: Rgba8) -> Color {
    Color::from_rgba8(r, g, b, a)
}

fn to_cpu(a: Affine) -> vk::Affine {
    vk::Affine::new(a.as_coeffs())
}

fn to_cpu_point(p: Point) -> vk::Point {
    vk::Point::new(p.x, p.y)
}

/// Offset that places a `width` x `height` layer centered on the origin.
pub fn centered(width: u32, height: u32) -> Point {
    (Vec2::new(f64::from(width), f64::from(height)) * -0.5).to_point()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba8 = [255, 0, 0, 255];

    fn raster(w: u32, h: u32) -> Raster {
        Raster::new(w, h).expect("raster")
    }

    /// Resampling may round a channel by a step or two.
    fn close(a: Rgba8, b: Rgba8) -> bool {
        a.iter().zip(b).all(|(&x, y)| x.abs_diff(y) <= 2)
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(Raster::new(0, 10).is_err());
        assert!(Raster::new(70_000, 10).is_err());
        assert!(Layer::from_premul(&[0; 12], 2, 2).is_err());
    }

    #[test]
    fn fresh_raster_is_transparent() {
        let mut r = raster(8, 8);
        assert!(r.as_rgba().iter().all(|&b| b == 0));
    }

    #[test]
    fn horizontal_line_covers_its_row() {
        let mut r = raster(20, 10);
        r.stroke(RED);
        r.stroke_weight(2.0);
        r.line(Point::new(2.0, 5.0), Point::new(18.0, 5.0));
        assert_eq!(r.pixel(10, 5), RED);
        assert_eq!(r.pixel(10, 1)[3], 0);
        assert_eq!(r.pixel(0, 5)[3], 0);
    }

    #[test]
    fn no_stroke_draws_nothing() {
        let mut r = raster(8, 8);
        r.no_stroke();
        r.line(Point::new(0.0, 4.0), Point::new(8.0, 4.0));
        r.point(Point::new(4.0, 4.0));
        assert!(r.as_rgba().iter().all(|&b| b == 0));
    }

    #[test]
    fn filled_circle_under_transform() {
        let mut r = raster(40, 40);
        r.no_stroke();
        r.fill(RED);
        r.translate(20.0, 20.0);
        r.scale(2.0);
        r.circle(Point::ZERO, 10.0);
        // radius 10 after scaling
        assert_eq!(r.pixel(20, 20), RED);
        assert_eq!(r.pixel(26, 20), RED);
        assert_eq!(r.pixel(33, 20)[3], 0);
    }

    #[test]
    fn rect_fills_its_area() {
        let mut r = raster(10, 10);
        r.fill([0, 0, 255, 255]);
        r.rect(Point::new(2.0, 2.0), 3.0, 4.0);
        assert_eq!(r.pixel(3, 4), [0, 0, 255, 255]);
        assert_eq!(r.pixel(7, 4)[3], 0);
    }

    #[test]
    fn gradient_fills_opaque() {
        let mut r = raster(21, 21);
        let stops = [Rgb::WHITE, Rgb::new(128.0, 128.0, 128.0), Rgb::BLACK];
        r.radial_gradient(Point::new(10.5, 10.5), 10.0, stops);
        assert!(r.as_rgba().chunks_exact(4).all(|p| p[3] == 255));
        let center = r.pixel(10, 10);
        let corner = r.pixel(0, 0);
        assert!(center[0] > 200);
        assert!(corner[0] < 40);
    }

    #[test]
    fn reset_clears_drawing() {
        let mut r = raster(10, 10);
        r.fill(RED);
        r.rect(Point::ZERO, 10.0, 10.0);
        assert_eq!(r.pixel(5, 5), RED);
        r.reset();
        assert_eq!(r.pixel(5, 5)[3], 0);
    }

    #[test]
    fn drawing_after_a_read_keeps_earlier_content() {
        let mut r = raster(10, 10);
        r.fill(RED);
        r.rect(Point::ZERO, 5.0, 10.0);
        assert_eq!(r.pixel(2, 5), RED);
        r.fill([0, 0, 255, 255]);
        r.rect(Point::new(5.0, 0.0), 5.0, 10.0);
        assert_eq!(r.pixel(2, 5), RED);
        assert_eq!(r.pixel(7, 5), [0, 0, 255, 255]);
    }

    #[test]
    fn layer_blit_identity_and_rotation() {
        let mut src = raster(10, 10);
        src.fill(RED);
        src.no_stroke();
        src.rect(Point::ZERO, 5.0, 10.0);
        let layer = src.into_layer();
        assert_eq!(layer.pixel(1, 5), RED);

        let mut dst = raster(10, 10);
        dst.image(&layer, Point::ZERO);
        assert!(close(dst.pixel(1, 5), RED));
        assert!(dst.pixel(8, 5)[3] <= 2);

        // half a turn about the center swaps the painted half
        let mut rotated = raster(10, 10);
        rotated.translate(5.0, 5.0);
        rotated.rotate(std::f64::consts::PI);
        rotated.image(&layer, centered(10, 10));
        assert!(close(rotated.pixel(8, 5), RED));
        assert!(rotated.pixel(1, 5)[3] <= 2);
    }

    #[test]
    fn layers_compare_by_identity() {
        let a = raster(4, 4).into_layer();
        let b = raster(4, 4).into_layer();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
