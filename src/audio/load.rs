use anyhow::{Context, Result};
use std::path::Path;

use super::analysis::RawAnalysis;
use super::features::AudioFeatures;
use crate::error::{SpindleError, SpindleResult};

/// Sections further apart than this (seconds) are reported as a gap.
const SECTION_GAP_TOLERANCE: f64 = 0.01;

pub fn load_analysis(path: &Path) -> Result<RawAnalysis> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read analysis file: {}", path.display()))?;
    let raw: RawAnalysis = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse analysis JSON: {}", path.display()))?;
    validate(&raw)?;
    log::info!(
        "Loaded analysis: {} segments, {:.1}s",
        raw.segments.len(),
        raw.track.duration
    );
    Ok(raw)
}

pub fn load_features(path: &Path) -> Result<AudioFeatures> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read features file: {}", path.display()))?;
    let features: AudioFeatures = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse features JSON: {}", path.display()))?;
    if !(-1..=11).contains(&features.key) {
        log::warn!("Feature key {} is not a pitch class or -1", features.key);
    }
    Ok(features)
}

/// Reject analysis the renderer cannot work with.
pub fn validate(raw: &RawAnalysis) -> SpindleResult<()> {
    let duration = raw.track.duration;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(SpindleError::validation(format!(
            "track duration must be positive, got {}",
            duration
        )));
    }

    if raw.segments.len() < 2 {
        return Err(SpindleError::validation(format!(
            "need at least two segments, got {}",
            raw.segments.len()
        )));
    }

    check_sorted("bars", raw.bars.iter().map(|e| e.start))?;
    check_sorted("beats", raw.beats.iter().map(|e| e.start))?;
    check_sorted("tatums", raw.tatums.iter().map(|e| e.start))?;
    check_sorted("sections", raw.sections.iter().map(|e| e.start))?;
    check_sorted("segments", raw.segments.iter().map(|e| e.start))?;

    if raw.segments.iter().any(|s| !s.loudness_max.is_finite()) {
        return Err(SpindleError::validation("segment loudness_max must be finite"));
    }

    for pair in raw.sections.windows(2) {
        let end = pair[0].start + pair[0].duration;
        if (pair[1].start - end).abs() > SECTION_GAP_TOLERANCE {
            log::warn!(
                "Sections do not tile the track: {:.3}s ends, next starts at {:.3}s",
                end,
                pair[1].start
            );
        }
    }

    Ok(())
}

fn check_sorted(name: &str, starts: impl Iterator<Item = f64>) -> SpindleResult<()> {
    let mut prev = f64::NEG_INFINITY;
    for (i, start) in starts.enumerate() {
        if !start.is_finite() {
            return Err(SpindleError::validation(format!(
                "{}[{}] has non-finite start",
                name, i
            )));
        }
        if start < prev {
            return Err(SpindleError::validation(format!(
                "{} not sorted: [{}] starts at {} after {}",
                name, i, start, prev
            )));
        }
        prev = start;
    }
    Ok(())
}
