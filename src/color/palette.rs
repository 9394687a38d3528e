use xxhash_rust::xxh3::xxh3_64;

use super::rgb::Rgb;
use crate::audio::features::AudioFeatures;

/// Feature-seeded color generator.
///
/// Three key colors span a triangle in RGB space; [`ColorPalette::sample_color`]
/// draws uniformly from that triangle. The stream is deterministic per seed but
/// is not bit-compatible with any other generator, so samples only repeat
/// across builds of this crate.
pub struct ColorPalette {
    rng: fastrand::Rng,
    key_colors: [Rgb; 3],
}

impl ColorPalette {
    pub fn new(features: &AudioFeatures) -> Self {
        Self::from_parts(
            features.danceability,
            features.energy,
            features.key,
            features.valence,
            features.acousticness,
            &features.uri,
        )
    }

    pub fn from_parts(
        danceability: f64,
        energy: f64,
        key: i32,
        valence: f64,
        acousticness: f64,
        seed: &str,
    ) -> Self {
        let hue1 = danceability * 360.0;
        let hue2 = energy * 360.0;
        // key -1 (none detected) lands just below 0 and wraps round the hue circle
        let hue3 = remap(f64::from(key), 0.0, 11.0, 0.0, 360.0);

        let saturation = 25.0 + valence * 75.0;
        let lightness = 50.0 + acousticness * 25.0;

        let key_colors = [
            Rgb::from_hsl(hue1, saturation, lightness),
            Rgb::from_hsl(hue2, saturation, lightness),
            Rgb::from_hsl(hue3, saturation, lightness),
        ];

        log::debug!(
            "Palette for {}: {} {} {}",
            seed,
            key_colors[0].hex(),
            key_colors[1].hex(),
            key_colors[2].hex()
        );

        Self {
            rng: fastrand::Rng::with_seed(xxh3_64(seed.as_bytes())),
            key_colors,
        }
    }

    pub fn key_colors(&self) -> [Rgb; 3] {
        self.key_colors
    }

    /// Draw the next color. Consumes two values from the stream, so the call
    /// order decides which event gets which color.
    pub fn sample_color(&mut self) -> Rgb {
        let r1 = self.rng.f64();
        let r2 = self.rng.f64();
        let [f1, f2, f3] = barycentric_weights(r1, r2);

        let [c1, c2, c3] = self.key_colors;
        c1 * f1 + c2 * f2 + c3 * f3
    }
}

/// Weights for a uniform sample over a triangle from two uniform draws.
pub fn barycentric_weights(r1: f64, r2: f64) -> [f64; 3] {
    let s = r1.sqrt();
    [1.0 - s, s * (1.0 - r2), r2 * s]
}

/// Linear remap of `value` from `[in_min, in_max]` onto `[out_min, out_max]`.
pub fn remap(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    out_min + (value - in_min) * (out_max - out_min) / (in_max - in_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette(seed: &str) -> ColorPalette {
        ColorPalette::from_parts(0.7, 0.4, 5, 0.6, 0.2, seed)
    }

    #[test]
    fn undetected_key_wraps_the_hue() {
        let p = ColorPalette::from_parts(0.0, 0.0, -1, 1.0, 0.0, "seed");
        let expected = Rgb::from_hsl(360.0 - 360.0 / 11.0, 100.0, 50.0);
        let got = p.key_colors()[2];
        assert!((got.r - expected.r).abs() < 1e-9);
        assert!((got.g - expected.g).abs() < 1e-9);
        assert!((got.b - expected.b).abs() < 1e-9);
        assert_ne!(got, Rgb::from_hsl(0.0, 100.0, 50.0));
    }

    #[test]
    fn weights_are_convex() {
        let draws = [0.0, 1e-9, 0.25, 0.5, 0.75, 0.999_999];
        for &r1 in &draws {
            for &r2 in &draws {
                let w = barycentric_weights(r1, r2);
                let sum: f64 = w.iter().sum();
                assert!((sum - 1.0).abs() < 1e-12, "sum {} for ({}, {})", sum, r1, r2);
                assert!(w.iter().all(|&f| f >= 0.0));
            }
        }
    }

    #[test]
    fn key_color_hues_follow_features() {
        let p = ColorPalette::from_parts(0.0, 1.0 / 3.0, 11, 1.0, 0.0, "x");
        let [c1, c2, c3] = p.key_colors();
        // full saturation, 50% lightness: pure red, pure green, red again (key 11 -> 360)
        assert!((c1.r - 255.0).abs() < 1e-9 && c1.g.abs() < 1e-9);
        assert!((c2.g - 255.0).abs() < 1e-9 && c2.r.abs() < 1e-9);
        assert!((c3.r - 255.0).abs() < 1e-9 && c3.b.abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = palette("spotify:track:abc");
        let mut b = palette("spotify:track:abc");
        for _ in 0..64 {
            assert_eq!(a.sample_color(), b.sample_color());
        }
    }

    #[test]
    fn different_seed_diverges() {
        let mut a = palette("spotify:track:abc");
        let mut b = palette("spotify:track:abd");
        let sa: Vec<Rgb> = (0..8).map(|_| a.sample_color()).collect();
        let sb: Vec<Rgb> = (0..8).map(|_| b.sample_color()).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn samples_stay_inside_key_color_range() {
        let mut p = palette("bounds");
        let keys = p.key_colors();
        let lo = |f: fn(&Rgb) -> f64| keys.iter().map(f).fold(f64::INFINITY, f64::min);
        let hi = |f: fn(&Rgb) -> f64| keys.iter().map(f).fold(f64::NEG_INFINITY, f64::max);
        for _ in 0..200 {
            let c = p.sample_color();
            assert!(c.r >= lo(|c| c.r) - 1e-9 && c.r <= hi(|c| c.r) + 1e-9);
            assert!(c.g >= lo(|c| c.g) - 1e-9 && c.g <= hi(|c| c.g) + 1e-9);
            assert!(c.b >= lo(|c| c.b) - 1e-9 && c.b <= hi(|c| c.b) + 1e-9);
        }
    }

    #[test]
    fn remap_is_linear() {
        assert_eq!(remap(5.5, 0.0, 11.0, 0.0, 360.0), 180.0);
        assert_eq!(remap(-3.0, -3.0, 7.0, 1.0, 2.0), 1.0);
        assert_eq!(remap(7.0, -3.0, 7.0, 1.0, 2.0), 2.0);
    }
}
