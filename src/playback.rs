//! Local interpolation of playback position between sparse snapshots.

use std::time::Duration;

use crate::error::{SpindleError, SpindleResult};

/// Position reported by the player at some instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackSnapshot {
    pub progress_ms: f64,
    pub duration_ms: f64,
}

/// Extrapolates the latest snapshot with the wall-clock time since it was
/// captured. Instants are offsets from any fixed origin.
#[derive(Clone, Debug)]
pub struct PlaybackClock {
    snapshot: PlaybackSnapshot,
    captured_at: Duration,
    lead_ms: f64,
    warned: bool,
}

impl PlaybackClock {
    pub fn new(snapshot: PlaybackSnapshot, captured_at: Duration, lead_ms: f64) -> SpindleResult<Self> {
        check(&snapshot)?;
        Ok(Self {
            snapshot,
            captured_at,
            lead_ms,
            warned: false,
        })
    }

    /// Replace the snapshot with a fresher one.
    #[allow(dead_code)]
    pub fn update(&mut self, snapshot: PlaybackSnapshot, captured_at: Duration) -> SpindleResult<()> {
        check(&snapshot)?;
        self.snapshot = snapshot;
        self.captured_at = captured_at;
        Ok(())
    }

    /// Unclamped position at `now`, lead included. `now` before the capture
    /// instant counts as no time elapsed.
    pub fn progress_ms(&self, now: Duration) -> f64 {
        let elapsed = now.saturating_sub(self.captured_at).as_secs_f64() * 1000.0;
        self.snapshot.progress_ms + elapsed + self.lead_ms
    }

    /// Position at `now` as a fraction of the track, clamped to `[0, 1]`.
    pub fn progress_pct(&mut self, now: Duration) -> f64 {
        let pct = self.progress_ms(now) / self.snapshot.duration_ms;
        if !(0.0..=1.0).contains(&pct) && !self.warned {
            log::warn!("Playback progress {:.4} drifted outside the track, clamping", pct);
            self.warned = true;
        }
        pct.clamp(0.0, 1.0)
    }

    pub fn is_finished(&self, now: Duration) -> bool {
        self.progress_ms(now) >= self.snapshot.duration_ms
    }
}

fn check(snapshot: &PlaybackSnapshot) -> SpindleResult<()> {
    if !(snapshot.duration_ms.is_finite() && snapshot.duration_ms > 0.0) {
        return Err(SpindleError::validation(format!(
            "track duration must be positive, got {}ms",
            snapshot.duration_ms
        )));
    }
    if !snapshot.progress_ms.is_finite() {
        return Err(SpindleError::validation("playback position is not a number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(progress_ms: f64, lead_ms: f64) -> PlaybackClock {
        let snapshot = PlaybackSnapshot {
            progress_ms,
            duration_ms: 10_000.0,
        };
        PlaybackClock::new(snapshot, Duration::from_secs(5), lead_ms).expect("clock")
    }

    #[test]
    fn interpolates_from_the_snapshot() {
        let c = clock(2_000.0, 0.0);
        assert_eq!(c.progress_ms(Duration::from_secs(5)), 2_000.0);
        assert_eq!(c.progress_ms(Duration::from_millis(6_500)), 3_500.0);
        // before the capture instant
        assert_eq!(c.progress_ms(Duration::from_secs(1)), 2_000.0);
    }

    #[test]
    fn lead_is_added() {
        let mut c = clock(5_000.0, 20.0);
        assert_eq!(c.progress_ms(Duration::from_secs(5)), 5_020.0);
        assert!((c.progress_pct(Duration::from_secs(5)) - 0.502).abs() < 1e-12);
    }

    #[test]
    fn clamps_drift_past_the_end() {
        let mut c = clock(9_000.0, 0.0);
        assert!(!c.is_finished(Duration::from_secs(5)));
        let later = Duration::from_secs(8);
        assert_eq!(c.progress_pct(later), 1.0);
        assert!(c.is_finished(later));
        assert_eq!(c.progress_pct(later), 1.0);
    }

    #[test]
    fn clamps_negative_positions() {
        let mut c = clock(-300.0, 0.0);
        assert_eq!(c.progress_pct(Duration::from_secs(5)), 0.0);
    }

    #[test]
    fn update_resets_the_origin() {
        let mut c = clock(0.0, 0.0);
        let fresh = PlaybackSnapshot {
            progress_ms: 7_000.0,
            duration_ms: 10_000.0,
        };
        c.update(fresh, Duration::from_secs(20)).expect("update");
        assert_eq!(c.progress_ms(Duration::from_secs(21)), 8_000.0);
    }

    #[test]
    fn rejects_empty_tracks() {
        let snapshot = PlaybackSnapshot {
            progress_ms: 0.0,
            duration_ms: 0.0,
        };
        assert!(PlaybackClock::new(snapshot, Duration::ZERO, 0.0).is_err());
        let mut c = clock(0.0, 0.0);
        let bad = PlaybackSnapshot {
            progress_ms: f64::NAN,
            duration_ms: 10_000.0,
        };
        assert!(c.update(bad, Duration::ZERO).is_err());
    }
}
