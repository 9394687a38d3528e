//! Drawing surface contract shared by the pixel target and the command
//! recorder.

use kurbo::{Affine, Point};

use super::raster::Layer;

/// Straight-alpha RGBA8.
pub type Rgba8 = [u8; 4];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawState {
    pub transform: Affine,
    pub stroke: Option<Rgba8>,
    pub stroke_weight: f64,
    pub fill: Option<Rgba8>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            stroke: Some([0, 0, 0, 255]),
            stroke_weight: 1.0,
            fill: Some([255, 255, 255, 255]),
        }
    }
}

#[cfg(test)]
impl DrawState {
    /// Uniform scale of the current transform, used to size strokes.
    pub fn scale_factor(&self) -> f64 {
        self.transform.determinant().abs().sqrt()
    }
}

#[derive(Clone, Debug, Default)]
pub struct StateStack {
    current: DrawState,
    saved: Vec<DrawState>,
}

impl StateStack {
    pub fn current(&self) -> &DrawState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut DrawState {
        &mut self.current
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Unbalanced pops leave the state untouched.
    pub fn pop(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.current = state;
        }
    }
}

/// Canvas-style immediate-mode drawing. Transforms compose in call order:
/// `translate` then `rotate` rotates about the translated origin.
pub trait Graphics {
    fn size(&self) -> (u32, u32);
    fn states(&self) -> &StateStack;
    fn states_mut(&mut self) -> &mut StateStack;

    fn line(&mut self, from: Point, to: Point);
    /// Round dot sized by the stroke weight.
    #[allow(dead_code)]
    fn point(&mut self, at: Point);
    fn circle(&mut self, center: Point, diameter: f64);
    #[allow(dead_code)]
    fn rect(&mut self, origin: Point, width: f64, height: f64);
    /// Text centered on `at`, drawn in the fill color.
    fn text(&mut self, text: &str, at: Point, size: f64);
    /// Composite a cached layer with its top-left corner at `top_left`.
    fn image(&mut self, layer: &Layer, top_left: Point);

    /// Connected lines through `points`.
    fn polyline(&mut self, points: &[Point]) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1]);
        }
    }

    fn state(&self) -> &DrawState {
        self.states().current()
    }

    fn push(&mut self) {
        self.states_mut().push();
    }

    fn pop(&mut self) {
        self.states_mut().pop();
    }

    fn translate(&mut self, x: f64, y: f64) {
        let state = self.states_mut().current_mut();
        state.transform = state.transform * Affine::translate((x, y));
    }

    fn rotate(&mut self, angle: f64) {
        let state = self.states_mut().current_mut();
        state.transform = state.transform * Affine::rotate(angle);
    }

    fn scale(&mut self, factor: f64) {
        let state = self.states_mut().current_mut();
        state.transform = state.transform * Affine::scale(factor);
    }

    fn stroke(&mut self, color: Rgba8) {
        self.states_mut().current_mut().stroke = Some(color);
    }

    fn no_stroke(&mut self) {
        self.states_mut().current_mut().stroke = None;
    }

    fn stroke_weight(&mut self, weight: f64) {
        self.states_mut().current_mut().stroke_weight = weight;
    }

    fn fill(&mut self, color: Rgba8) {
        self.states_mut().current_mut().fill = Some(color);
    }

    fn no_fill(&mut self) {
        self.states_mut().current_mut().fill = None;
    }
}

/// A primitive as issued, in device coordinates.
#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Line {
        from: Point,
        to: Point,
        color: Option<Rgba8>,
        weight: f64,
    },
    Point {
        at: Point,
        color: Option<Rgba8>,
        weight: f64,
    },
    Circle {
        center: Point,
        radius: f64,
        stroke: Option<Rgba8>,
        fill: Option<Rgba8>,
    },
    Rect {
        origin: Point,
        width: f64,
        height: f64,
        fill: Option<Rgba8>,
    },
    Text {
        text: String,
        at: Point,
        size: f64,
    },
    Image {
        layer: Layer,
        transform: Affine,
    },
}

/// Records draw calls instead of rasterizing them.
#[cfg(test)]
#[derive(Debug)]
pub struct CommandRecorder {
    width: u32,
    height: u32,
    states: StateStack,
    pub commands: Vec<DrawCommand>,
}

#[cfg(test)]
impl CommandRecorder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            states: StateStack::default(),
            commands: Vec::new(),
        }
    }

    pub fn images(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Image { .. }))
    }

    pub fn lines(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
    }

    pub fn circles(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Circle { .. }))
    }
}

#[cfg(test)]
impl Graphics for CommandRecorder {
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
        let s = *self.state();
        self.commands.push(DrawCommand::Line {
            from: s.transform * from,
            to: s.transform * to,
            color: s.stroke,
            weight: s.stroke_weight * s.scale_factor(),
        });
    }

    fn point(&mut self, at: Point) {
        let s = *self.state();
        self.commands.push(DrawCommand::Point {
            at: s.transform * at,
            color: s.stroke,
            weight: s.stroke_weight * s.scale_factor(),
        });
    }

    fn circle(&mut self, center: Point, diameter: f64) {
        let s = *self.state();
        self.commands.push(DrawCommand::Circle {
            center: s.transform * center,
            radius: diameter / 2.0 * s.scale_factor(),
            stroke: s.stroke,
            fill: s.fill,
        });
    }

    fn rect(&mut self, origin: Point, width: f64, height: f64) {
        let s = *self.state();
        let k = s.scale_factor();
        self.commands.push(DrawCommand::Rect {
            origin: s.transform * origin,
            width: width * k,
            height: height * k,
            fill: s.fill,
        });
    }

    fn text(&mut self, text: &str, at: Point, size: f64) {
        let s = *self.state();
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            at: s.transform * at,
            size: size * s.scale_factor(),
        });
    }

    fn image(&mut self, layer: &Layer, top_left: Point) {
        let s = *self.state();
        self.commands.push(DrawCommand::Image {
            layer: layer.clone(),
            transform: s.transform * Affine::translate(top_left.to_vec2()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn transforms_compose_in_call_order() {
        let mut g = CommandRecorder::new(100, 100);
        g.translate(50.0, 50.0);
        g.rotate(FRAC_PI_2);
        g.line(Point::new(0.0, 0.0), Point::new(10.0, 0.0));

        let DrawCommand::Line { from, to, .. } = &g.commands[0] else {
            panic!("expected a line");
        };
        assert!((from.x - 50.0).abs() < 1e-9 && (from.y - 50.0).abs() < 1e-9);
        assert!((to.x - 50.0).abs() < 1e-9 && (to.y - 60.0).abs() < 1e-9);
    }

    #[test]
    fn push_pop_restores_state() {
        let mut g = CommandRecorder::new(10, 10);
        g.stroke([1, 2, 3, 4]);
        g.push();
        g.scale(3.0);
        g.no_stroke();
        g.stroke_weight(2.0);
        g.point(Point::new(1.0, 1.0));
        g.pop();
        g.point(Point::new(1.0, 1.0));
        // extra pop is ignored
        g.pop();

        assert_eq!(
            g.commands,
            vec![
                DrawCommand::Point {
                    at: Point::new(3.0, 3.0),
                    color: None,
                    weight: 6.0,
                },
                DrawCommand::Point {
                    at: Point::new(1.0, 1.0),
                    color: Some([1, 2, 3, 4]),
                    weight: 1.0,
                },
            ]
        );
    }
}
