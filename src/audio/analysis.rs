use serde::{Deserialize, Serialize};

use crate::color::palette::{remap, ColorPalette};
use crate::color::rgb::Rgb;

/// Bars, beats and tatums share this shape.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawTimedEvent {
    pub start: f64,
    pub duration: f64,
    pub confidence: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawSection {
    pub start: f64,
    pub duration: f64,
    pub confidence: f64,
    pub loudness: f64,
    pub tempo: f64,
    #[serde(default)]
    pub tempo_confidence: f64,
    pub key: i32,
    #[serde(default)]
    pub key_confidence: f64,
    pub mode: i32,
    #[serde(default)]
    pub mode_confidence: f64,
    pub time_signature: i32,
    #[serde(default)]
    pub time_signature_confidence: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawSegment {
    pub start: f64,
    pub duration: f64,
    pub confidence: f64,
    pub loudness_start: f64,
    pub loudness_max_time: f64,
    pub loudness_max: f64,
    #[serde(default)]
    pub loudness_end: f64,
    /// 12 pitch-class strengths, C through B.
    pub pitches: Vec<f64>,
    pub timbre: Vec<f64>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawTrack {
    pub num_samples: u64,
    /// Seconds.
    pub duration: f64,
    pub sample_md5: String,
    pub offset_seconds: f64,
    pub window_seconds: f64,
    pub analysis_sample_rate: u32,
    pub analysis_channels: u32,
    pub end_of_fade_in: f64,
    pub start_of_fade_out: f64,
    pub loudness: f64,
    pub tempo: f64,
    pub tempo_confidence: f64,
    pub time_signature: i32,
    pub time_signature_confidence: f64,
    pub key: i32,
    pub key_confidence: f64,
    pub mode: i32,
    pub mode_confidence: f64,
    pub codestring: String,
    pub code_version: f64,
    pub echoprintstring: String,
    pub echoprint_version: f64,
    pub synchstring: String,
    pub synch_version: f64,
    pub rhythmstring: String,
    pub rhythm_version: f64,
}

/// Analysis payload exactly as delivered by the metadata collaborator.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawAnalysis {
    #[serde(default)]
    pub bars: Vec<RawTimedEvent>,
    #[serde(default)]
    pub beats: Vec<RawTimedEvent>,
    #[serde(default)]
    pub sections: Vec<RawSection>,
    pub segments: Vec<RawSegment>,
    #[serde(default)]
    pub tatums: Vec<RawTimedEvent>,
    pub track: RawTrack,
}

#[derive(Clone, Debug, Serialize)]
pub struct TimedEvent {
    #[serde(flatten)]
    pub raw: RawTimedEvent,
    pub progress_pct: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Beat {
    #[serde(flatten)]
    pub raw: RawTimedEvent,
    pub progress_pct: f64,
    pub start_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Section {
    #[serde(flatten)]
    pub raw: RawSection,
    pub start_progress_pct: f64,
    pub end_progress_pct: f64,
    pub color: Rgb,
}

#[derive(Clone, Debug, Serialize)]
pub struct Segment {
    #[serde(flatten)]
    pub raw: RawSegment,
    pub progress_pct: f64,
    pub start_ms: f64,
    /// Index of the strongest pitch class. Named after the upstream field; it
    /// is an arg-max, not a mean.
    pub avg_pitch: usize,
    /// `loudness_max` remapped across the whole track onto `[1, 2]`.
    pub relative_loudness: f64,
    pub color: Rgb,
}

#[derive(Clone, Debug, Serialize)]
pub struct TrackInfo {
    #[serde(flatten)]
    pub raw: RawTrack,
    pub beat_timings_ms: Vec<f64>,
}

/// Analysis enriched once per track and read-only afterwards.
#[derive(Clone, Debug, Serialize)]
pub struct AudioAnalysis {
    pub bars: Vec<TimedEvent>,
    pub beats: Vec<Beat>,
    pub sections: Vec<Section>,
    pub segments: Vec<Segment>,
    pub tatums: Vec<TimedEvent>,
    pub track: TrackInfo,
}

impl AudioAnalysis {
    pub fn duration_ms(&self) -> f64 {
        self.track.raw.duration * 1000.0
    }
}

/// Derive timing and progress fields. Pure: colors are left black until
/// [`paint`] runs.
pub fn process(raw: &RawAnalysis) -> AudioAnalysis {
    let duration = raw.track.duration;
    let pct = |t: f64| t / duration;

    let timed = |events: &[RawTimedEvent]| -> Vec<TimedEvent> {
        events
            .iter()
            .map(|e| TimedEvent {
                raw: e.clone(),
                progress_pct: pct(e.start),
            })
            .collect()
    };

    let beats = raw
        .beats
        .iter()
        .map(|b| Beat {
            raw: b.clone(),
            progress_pct: pct(b.start),
            start_ms: b.start * 1000.0,
        })
        .collect();

    let sections = raw
        .sections
        .iter()
        .map(|s| Section {
            raw: s.clone(),
            start_progress_pct: pct(s.start),
            end_progress_pct: pct(s.start + s.duration),
            color: Rgb::BLACK,
        })
        .collect();

    let (min_loudness, max_loudness) = raw.segments.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), s| (lo.min(s.loudness_max), hi.max(s.loudness_max)),
    );

    let segments = raw
        .segments
        .iter()
        .map(|s| Segment {
            raw: s.clone(),
            progress_pct: pct(s.start),
            start_ms: s.start * 1000.0,
            avg_pitch: strongest_pitch(&s.pitches),
            relative_loudness: relative_loudness(s.loudness_max, min_loudness, max_loudness),
            color: Rgb::BLACK,
        })
        .collect();

    AudioAnalysis {
        bars: timed(&raw.bars),
        beats,
        sections,
        segments,
        tatums: timed(&raw.tatums),
        track: TrackInfo {
            raw: raw.track.clone(),
            beat_timings_ms: raw.beats.iter().map(|b| b.start * 1000.0).collect(),
        },
    }
}

/// Assign palette colors: every segment in order, then every section in order.
pub fn paint(analysis: &mut AudioAnalysis, palette: &mut ColorPalette) {
    for segment in &mut analysis.segments {
        segment.color = palette.sample_color();
    }
    for section in &mut analysis.sections {
        section.color = palette.sample_color();
    }
}

/// [`process`] followed by [`paint`].
pub fn enrich(raw: &RawAnalysis, palette: &mut ColorPalette) -> AudioAnalysis {
    let mut analysis = process(raw);
    paint(&mut analysis, palette);
    log::info!(
        "Analysis: {} segments, {} sections, {} beats, {:.1}s",
        analysis.segments.len(),
        analysis.sections.len(),
        analysis.beats.len(),
        analysis.track.raw.duration
    );
    analysis
}

/// Arg-max over the pitch vector; the first maximum wins ties and an
/// all-zero vector yields 0.
pub fn strongest_pitch(pitches: &[f64]) -> usize {
    let (_, idx) = pitches
        .iter()
        .enumerate()
        .fold((0.0, 0), |(best, best_idx), (i, &p)| {
            if p > best {
                (p, i)
            } else {
                (best, best_idx)
            }
        });
    idx
}

fn relative_loudness(value: f64, min: f64, max: f64) -> f64 {
    if min == max {
        return 1.0;
    }
    remap(value, min, max, 1.0, 2.0)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn first_maximum_wins() {
        assert_eq!(strongest_pitch(&[0.5, 0.9, 0.9, 0.1]), 1);
        assert_eq!(strongest_pitch(&[0.0, 0.0, 0.0]), 0);
        assert_eq!(strongest_pitch(&[0.1, 0.2, 0.3, 1.0]), 3);
        assert_eq!(strongest_pitch(&[]), 0);
    }

    #[test]
    fn loudness_spans_one_to_two() {
        let mut raw = raw_track();
        raw.segments[3].loudness_max = -60.0;
        raw.segments[7].loudness_max = 5.0;
        let analysis = process(&raw);
        assert_eq!(analysis.segments[3].relative_loudness, 1.0);
        assert_eq!(analysis.segments[7].relative_loudness, 2.0);
        assert!(analysis
            .segments
            .iter()
            .all(|s| (1.0..=2.0).contains(&s.relative_loudness)));
    }

    #[test]
    fn flat_loudness_maps_to_one() {
        let mut raw = raw_track();
        for s in &mut raw.segments {
            s.loudness_max = -12.0;
        }
        let analysis = process(&raw);
        assert!(analysis.segments.iter().all(|s| s.relative_loudness == 1.0));
    }

    #[test]
    fn progress_and_millisecond_fields() {
        let analysis = process(&raw_track());
        let seg = &analysis.segments[5];
        assert_eq!(seg.progress_pct, 50.0 / 200.0);
        assert_eq!(seg.start_ms, 50_000.0);
        assert_eq!(seg.avg_pitch, 5);

        let beat = &analysis.beats[3];
        assert_eq!(beat.start_ms, 1500.0);
        assert_eq!(beat.progress_pct, 1.5 / 200.0);

        let section = &analysis.sections[1];
        assert_eq!(section.start_progress_pct, 0.4);
        assert_eq!(section.end_progress_pct, 1.0);

        assert_eq!(analysis.bars[10].progress_pct, 20.0 / 200.0);
        assert_eq!(analysis.tatums[8].progress_pct, 2.0 / 200.0);
        assert_eq!(analysis.track.beat_timings_ms.len(), 400);
        assert_eq!(analysis.track.beat_timings_ms[2], 1000.0);
        assert_eq!(analysis.duration_ms(), 200_000.0);
    }

    #[test]
    fn colors_follow_event_order() {
        let raw = raw_track();
        let mut palette = ColorPalette::from_parts(0.3, 0.6, 4, 0.5, 0.5, "order");
        let analysis = enrich(&raw, &mut palette);

        let mut reference = ColorPalette::from_parts(0.3, 0.6, 4, 0.5, 0.5, "order");
        for seg in &analysis.segments {
            assert_eq!(seg.color, reference.sample_color());
        }
        for section in &analysis.sections {
            assert_eq!(section.color, reference.sample_color());
        }
    }

    #[test]
    fn deserializes_upstream_shape() {
        let json = r#"{
            "bars": [{"start": 0.0, "duration": 2.0, "confidence": 0.5}],
            "beats": [{"start": 0.0, "duration": 0.5, "confidence": 0.9}],
            "sections": [{"start": 0.0, "duration": 4.0, "confidence": 1.0,
                "loudness": -7.1, "tempo": 120.0, "tempo_confidence": 0.3,
                "key": 9, "key_confidence": 0.2, "mode": 0, "mode_confidence": 0.4,
                "time_signature": 4, "time_signature_confidence": 1.0}],
            "segments": [{"start": 0.0, "duration": 0.3, "confidence": 0.1,
                "loudness_start": -60.0, "loudness_max_time": 0.1,
                "loudness_max": -20.0, "loudness_end": 0.0,
                "pitches": [1.0, 0.5], "timbre": [0.0]}],
            "tatums": [],
            "meta": {"analyzer_version": "4.0.0"},
            "track": {"duration": 4.0, "sample_md5": "", "codestring": "x", "tempo": 120.0}
        }"#;
        let raw: RawAnalysis = serde_json::from_str(json).expect("parse");
        assert_eq!(raw.segments.len(), 1);
        assert_eq!(raw.sections[0].key, 9);
        assert_eq!(raw.track.duration, 4.0);
    }
}
