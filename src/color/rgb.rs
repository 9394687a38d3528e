use serde::Serialize;
use std::ops::{Add, Mul};

/// Linear RGB color with unclamped `f64` channels on the 0-255 scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(255.0, 255.0, 255.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Hue in degrees, saturation and lightness in percent.
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = saturation.clamp(0.0, 100.0) / 100.0;
        let l = lightness.clamp(0.0, 100.0) / 100.0;

        if s == 0.0 {
            let v = l * 255.0;
            return Self::new(v, v, v);
        }

        let t2 = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let t1 = 2.0 * l - t2;

        let channel = |offset: f64| {
            let mut t3 = h + offset;
            if t3 < 0.0 {
                t3 += 1.0;
            }
            if t3 > 1.0 {
                t3 -= 1.0;
            }
            let v = if 6.0 * t3 < 1.0 {
                t1 + (t2 - t1) * 6.0 * t3
            } else if 2.0 * t3 < 1.0 {
                t2
            } else if 3.0 * t3 < 2.0 {
                t1 + (t2 - t1) * (2.0 / 3.0 - t3) * 6.0
            } else {
                t1
            };
            v * 255.0
        };

        Self::new(channel(1.0 / 3.0), channel(0.0), channel(-1.0 / 3.0))
    }

    pub fn lerp(self, other: Rgb, t: f64) -> Self {
        self * (1.0 - t) + other * t
    }

    /// Clamp into displayable RGBA8 with the given alpha.
    pub fn to_rgba8(self, alpha: u8) -> [u8; 4] {
        let q = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        [q(self.r), q(self.g), q(self.b), alpha]
    }

    pub fn hex(self) -> String {
        let [r, g, b, _] = self.to_rgba8(255);
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

impl Add for Rgb {
    type Output = Rgb;

    fn add(self, rhs: Rgb) -> Rgb {
        Rgb::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl Mul<f64> for Rgb {
    type Output = Rgb;

    fn mul(self, t: f64) -> Rgb {
        Rgb::new(self.r * t, self.g * t, self.b * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rgb, b: Rgb) -> bool {
        (a.r - b.r).abs() < 1e-9 && (a.g - b.g).abs() < 1e-9 && (a.b - b.b).abs() < 1e-9
    }

    #[test]
    fn primary_hues() {
        assert!(close(Rgb::from_hsl(0.0, 100.0, 50.0), Rgb::new(255.0, 0.0, 0.0)));
        assert!(close(Rgb::from_hsl(120.0, 100.0, 50.0), Rgb::new(0.0, 255.0, 0.0)));
        assert!(close(Rgb::from_hsl(240.0, 100.0, 50.0), Rgb::new(0.0, 0.0, 255.0)));
        // 360 wraps back to red
        assert!(close(Rgb::from_hsl(360.0, 100.0, 50.0), Rgb::new(255.0, 0.0, 0.0)));
    }

    #[test]
    fn zero_saturation_is_gray() {
        let c = Rgb::from_hsl(200.0, 0.0, 50.0);
        assert!(close(c, Rgb::new(127.5, 127.5, 127.5)));
    }

    #[test]
    fn lerp_endpoints() {
        let a = Rgb::new(10.0, 20.0, 30.0);
        let b = Rgb::new(110.0, 220.0, 30.0);
        assert!(close(a.lerp(b, 0.0), a));
        assert!(close(a.lerp(b, 1.0), b));
        assert!(close(a.lerp(b, 0.5), Rgb::new(60.0, 120.0, 30.0)));
    }

    #[test]
    fn rgba8_clamps_out_of_range() {
        assert_eq!(Rgb::new(-4.0, 300.0, 127.6).to_rgba8(9), [0, 255, 128, 9]);
        assert_eq!(Rgb::new(255.0, 0.0, 16.0).hex(), "#ff0010");
    }
}
