use crate::audio::analysis::Beat;

/// Beat-synchronous scale bump applied to the whole frame.
#[derive(Clone, Copy, Debug)]
pub struct PulseEnvelope {
    /// Distance (ms) from a beat at which the bump has fully decayed.
    window_ms: f64,
    /// Extra scale at the peak of a full-confidence beat.
    strength: f64,
}

impl PulseEnvelope {
    pub fn new(window_ms: f64, strength: f64) -> Self {
        Self {
            window_ms: window_ms.max(f64::EPSILON),
            strength,
        }
    }

    /// Scale factor for a beat `distance_ms` away.
    pub fn bump(&self, distance_ms: f64, confidence: f64) -> f64 {
        let x = distance_ms / self.window_ms;
        let value = 1.0 + self.strength * smooth_step(1.0 - x * x);
        1.0 + (value - 1.0) * confidence
    }

    /// Scale factor from the beat nearest to `progress_ms`; 1 with no beats.
    pub fn scale_at(&self, beats: &[Beat], progress_ms: f64) -> f64 {
        nearest_beat(beats, progress_ms)
            .map(|beat| self.bump(progress_ms - beat.start_ms, beat.raw.confidence))
            .unwrap_or(1.0)
    }
}

/// Beat with the smallest absolute distance; earlier beat on ties.
pub fn nearest_beat(beats: &[Beat], progress_ms: f64) -> Option<&Beat> {
    beats.iter().min_by(|a, b| {
        let da = (a.start_ms - progress_ms).abs();
        let db = (b.start_ms - progress_ms).abs();
        da.total_cmp(&db)
    })
}

fn smooth_ramp(t: f64) -> f64 {
    if t > 0.0 {
        (-1.0 / t).exp()
    } else {
        0.0
    }
}

/// Smooth 0 -> 1 transition over `[0, 1]`, flat outside it.
fn smooth_step(t: f64) -> f64 {
    let a = smooth_ramp(t);
    a / (a + smooth_ramp(1.0 - t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::RawTimedEvent;

    fn beat(start_ms: f64, confidence: f64) -> Beat {
        Beat {
            raw: RawTimedEvent {
                start: start_ms / 1000.0,
                duration: 0.5,
                confidence,
            },
            progress_pct: 0.0,
            start_ms,
        }
    }

    fn pulse() -> PulseEnvelope {
        PulseEnvelope::new(150.0, 0.05)
    }

    #[test]
    fn smooth_step_limits() {
        assert_eq!(smooth_step(0.0), 0.0);
        assert_eq!(smooth_step(1.0), 1.0);
        assert_eq!(smooth_step(-3.0), 0.0);
        assert_eq!(smooth_step(4.0), 1.0);
        assert!((smooth_step(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn peaks_on_the_beat() {
        let p = pulse();
        let peak = p.bump(0.0, 1.0);
        assert!((peak - 1.05).abs() < 1e-12);
        for d in [1.0, 20.0, 75.0, 120.0, 149.0] {
            assert!(p.bump(d, 1.0) < peak);
            assert!(p.bump(-d, 1.0) < peak);
        }
        assert!(p.bump(20.0, 1.0) > p.bump(75.0, 1.0));
    }

    #[test]
    fn flat_outside_window() {
        let p = pulse();
        for d in [150.0, -150.0, 151.0, 400.0, -10_000.0] {
            for c in [0.0, 0.3, 1.0] {
                assert_eq!(p.bump(d, c), 1.0, "d = {}, c = {}", d, c);
            }
        }
    }

    #[test]
    fn confidence_scales_the_bump() {
        let p = pulse();
        assert_eq!(p.bump(0.0, 0.0), 1.0);
        assert!((p.bump(0.0, 0.5) - 1.025).abs() < 1e-12);
    }

    #[test]
    fn no_beats_no_pulse() {
        assert_eq!(pulse().scale_at(&[], 1234.0), 1.0);
    }

    #[test]
    fn uses_nearest_beat() {
        let beats = vec![beat(0.0, 1.0), beat(500.0, 0.2), beat(1000.0, 1.0)];
        let near = nearest_beat(&beats, 560.0).map(|b| b.start_ms);
        assert_eq!(near, Some(500.0));
        // tie goes to the earlier beat
        let tie = nearest_beat(&beats, 250.0).map(|b| b.start_ms);
        assert_eq!(tie, Some(0.0));

        let p = pulse();
        assert_eq!(p.scale_at(&beats, 500.0), p.bump(0.0, 0.2));
        assert!((p.scale_at(&beats, 1000.0) - 1.05).abs() < 1e-12);
    }
}
