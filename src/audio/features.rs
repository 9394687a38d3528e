use serde::{Deserialize, Serialize};

/// Track-level descriptors from the features endpoint.
///
/// Only the fields the palette reads are required; the rest default so
/// trimmed payloads still load.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AudioFeatures {
    pub danceability: f64,
    pub energy: f64,
    /// Pitch class of the track, 0 = C through 11 = B.
    pub key: i32,
    pub valence: f64,
    pub acousticness: f64,
    #[serde(default)]
    pub loudness: f64,
    #[serde(default)]
    pub mode: i32,
    #[serde(default)]
    pub speechiness: f64,
    #[serde(default)]
    pub instrumentalness: f64,
    #[serde(default)]
    pub liveness: f64,
    #[serde(default)]
    pub tempo: f64,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub time_signature: i32,
    #[serde(default)]
    pub id: Option<String>,
    /// Stable track identifier, also the palette seed.
    pub uri: String,
}
