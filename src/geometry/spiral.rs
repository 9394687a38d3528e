//! Archimedean spiral parametrized by cumulative angle, with arc-length
//! progress and its numerical inverse.

use kurbo::Point;
use serde::Deserialize;
use std::f64::consts::{PI, TAU};

use crate::error::{SpindleError, SpindleResult};

const MAX_BISECTION_STEPS: usize = 10_000;

/// Arc-length tolerance used when no explicit one is given.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpiralParams {
    /// Radius at theta = 0.
    pub a: f64,
    /// Radial growth per radian, sets the groove spacing.
    pub b: f64,
    /// Where drawing starts. Every 2π is one turn.
    pub theta_start: f64,
    /// Full turns from theta = 0 to the end of the spiral.
    pub rotations: f64,
}

impl Default for SpiralParams {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: PI,
            theta_start: 16.0 * PI,
            rotations: 28.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Spiral {
    params: SpiralParams,
    theta_end: f64,
    precision: f64,
    step_max: f64,
    arc_start: f64,
    arc_end: f64,
}

impl Spiral {
    pub fn new(params: SpiralParams, precision: f64, step_max: f64) -> SpindleResult<Self> {
        if !(params.a > 0.0) {
            return Err(SpindleError::validation("spiral `a` must be positive"));
        }
        if !(params.rotations > 0.0) {
            return Err(SpindleError::validation("spiral rotations must be positive"));
        }
        if !(precision > 0.0) || !(step_max > 0.0) {
            return Err(SpindleError::validation(
                "spiral precision and step_max must be positive",
            ));
        }
        let theta_end = params.rotations * TAU;
        if !(params.theta_start >= 0.0 && params.theta_start < theta_end) {
            return Err(SpindleError::validation(format!(
                "theta_start {} must lie in [0, {})",
                params.theta_start, theta_end
            )));
        }

        let mut spiral = Self {
            params,
            theta_end,
            precision,
            step_max,
            arc_start: 0.0,
            arc_end: 0.0,
        };
        spiral.arc_start = spiral.arc_length(params.theta_start);
        spiral.arc_end = spiral.arc_length(theta_end);
        Ok(spiral)
    }

    pub fn params(&self) -> SpiralParams {
        self.params
    }

    pub fn theta_start(&self) -> f64 {
        self.params.theta_start
    }

    pub fn theta_end(&self) -> f64 {
        self.theta_end
    }

    /// Radius at `theta`.
    pub fn distance(&self, theta: f64) -> f64 {
        self.params.a + self.params.b * theta
    }

    /// Closed-form arc length from 0 to `theta`.
    pub fn arc_length(&self, theta: f64) -> f64 {
        0.5 * self.params.a * (theta * (theta * theta + 1.0).sqrt() + theta.asinh())
    }

    /// Angular increment for rasterizing the curve as short lines.
    pub fn angular_step(&self, theta: f64) -> f64 {
        self.step_max.min(self.precision / (TAU * theta))
    }

    pub fn point_at(&self, theta: f64, offset: f64) -> Point {
        let r = self.distance(theta) + offset;
        Point::new(theta.cos() * r, theta.sin() * r)
    }

    /// Invert [`Spiral::arc_length`] by bisection over `[0, theta_end]`.
    ///
    /// Targets outside the spiral's range converge on the nearest end.
    pub fn find_theta(&self, target: f64, tolerance: f64) -> f64 {
        let mut low = 0.0;
        let mut high = self.theta_end;
        let mut t = high / 2.0;

        for _ in 0..MAX_BISECTION_STEPS {
            let current = self.arc_length(t);
            if (current - target).abs() < tolerance {
                break;
            }
            if current > target {
                high = t;
            } else {
                low = t;
            }
            t = low + (high - low) / 2.0;
        }
        t
    }

    /// Fraction of the drawn spiral (from `theta_start`) covered at `theta`.
    pub fn progress_pct(&self, theta: f64) -> f64 {
        (self.arc_length(theta) - self.arc_start) / (self.arc_end - self.arc_start)
    }

    /// Inverse of [`Spiral::progress_pct`]. `pct` is clamped to `[0, 1]`.
    pub fn theta_for_progress(&self, pct: f64) -> f64 {
        if !(pct > 0.0) {
            return self.params.theta_start;
        }
        if pct >= 1.0 {
            return self.theta_end;
        }
        let target = self.arc_start + pct * (self.arc_end - self.arc_start);
        self.find_theta(target, DEFAULT_TOLERANCE)
    }

    /// Angles for drawing `[from, to]` as a polyline, ending exactly on `to`.
    pub fn walk(&self, from: f64, to: f64) -> ThetaWalk<'_> {
        ThetaWalk {
            spiral: self,
            next: Some(from),
            to,
        }
    }
}

pub struct ThetaWalk<'a> {
    spiral: &'a Spiral,
    next: Option<f64>,
    to: f64,
}

impl Iterator for ThetaWalk<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let theta = self.next?;
        self.next = if theta < self.to {
            Some((theta + self.spiral.angular_step(theta)).min(self.to))
        } else {
            None
        };
        Some(theta)
    }
}
