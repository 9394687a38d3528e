use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spindle", about = "Renders a track as a rotating spiral record synced to playback")]
pub struct Cli {
    /// Audio analysis JSON (bars, beats, sections, segments, tatums, track)
    pub analysis: PathBuf,

    /// Audio features JSON (danceability, energy, key, valence, acousticness, uri)
    pub features: PathBuf,

    /// Output file: MP4 video, or PNG with --snapshot
    #[arg(short, long, default_value = "output.mp4")]
    pub output: PathBuf,

    /// Audio file to mux into the video
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Track title drawn on the record
    #[arg(long)]
    pub title: Option<String>,

    /// Artist drawn under the title
    #[arg(long)]
    pub artist: Option<String>,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 1200)]
    pub height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// Playback position of the first frame, in milliseconds
    #[arg(long, default_value_t = 0.0)]
    pub start_ms: f64,

    /// Render only this many seconds instead of the rest of the track
    #[arg(long)]
    pub duration_secs: Option<f64>,

    /// Render a single PNG at this progress fraction (0.0-1.0)
    #[arg(long)]
    pub snapshot: Option<f64>,

    /// Number of cached section layers
    #[arg(long)]
    pub sections: Option<usize>,

    /// TTF/OTF font for the title text
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Download the title font from a URL
    #[arg(long)]
    pub font_url: Option<String>,

    /// Config file (default: ./spindle.toml or ~/.config/spindle/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the key colors and sixteen palette samples, then exit
    #[arg(long)]
    pub print_palette: bool,
}
