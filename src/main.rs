mod audio;
mod cli;
mod color;
mod config;
mod encode;
mod error;
mod geometry;
mod playback;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use audio::features::AudioFeatures;
use cli::Cli;
use color::palette::ColorPalette;
use config::Config;
use encode::ffmpeg::{AudioInput, FfmpegEncoder, VideoSettings};
use geometry::spiral::Spiral;
use playback::{PlaybackClock, PlaybackSnapshot};
use render::cache::Style;
use render::raster::Raster;
use render::scene::{Scene, Track, Visualizer};
use render::text::{load_font_file, load_font_from_url, TextOverlay};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();
    let mut cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("{:#}", e);
                Config::default()
            }
        },
        None => Config::default(),
    };

    // Config values apply only where the CLI is at its default
    if cli.width == 1200 { cli.width = cfg.output.width; }
    if cli.height == 1200 { cli.height = cfg.output.height; }
    if cli.fps == 30 { cli.fps = cfg.output.fps; }
    if cli.crf == 18 { cli.crf = cfg.output.crf; }
    if cli.codec == "libx264" { cli.codec = cfg.output.codec.clone(); }
    if cli.font.is_none() { cli.font = cfg.text.font.clone(); }
    if cli.font_url.is_none() { cli.font_url = cfg.text.font_url.clone(); }
    if let Some(sections) = cli.sections {
        cfg.render.sections = sections;
    }

    let features = audio::load::load_features(&cli.features)?;
    if cli.print_palette {
        print_palette(&features);
        return Ok(());
    }
    let raw = audio::load::load_analysis(&cli.analysis)?;

    log::info!("spindle - spiral record visualizer");
    log::info!("Track: {}", features.uri);
    log::info!("Output: {}", cli.output.display());
    log::info!("Resolution: {}x{} @ {}fps", cli.width, cli.height, cli.fps);

    let text = load_text_overlay(cli.font.as_deref(), cli.font_url.as_deref());
    let spiral = Spiral::new(cfg.spiral, cfg.render.precision, cfg.render.step_max)
        .context("Invalid spiral parameters")?;
    let track = Track::new(
        &raw,
        &features,
        cli.title.clone().unwrap_or_default(),
        cli.artist.clone().unwrap_or_default(),
    );
    let style = Style {
        render: cfg.render.clone(),
        text,
        font_size: cfg.text.font_size,
    };
    let duration_ms = track.analysis.duration_ms();
    let mut visualizer = Visualizer::new(Scene::new(track, spiral, style));

    let (width, height) = (cli.width, cli.height);
    visualizer.ensure_cache(width, height)?;

    if let Some(pct) = cli.snapshot {
        let mut frame = Raster::new(width, height)?;
        visualizer.render(&mut frame, pct)?;
        let mut encoder = FfmpegEncoder::snapshot(&cli.output, width, height)?;
        encoder.write_frame(frame.as_rgba())?;
        encoder.finish()?;
        log::info!("Snapshot at {:.1}% written to {}", pct * 100.0, cli.output.display());
        return Ok(());
    }

    let start_ms = cli.start_ms.clamp(0.0, duration_ms);
    let end_ms = cli
        .duration_secs
        .map(|secs| (start_ms + secs * 1000.0).min(duration_ms))
        .unwrap_or(duration_ms);
    let total_frames = ((end_ms - start_ms) / 1000.0 * f64::from(cli.fps)).ceil().max(0.0) as u64;
    if total_frames == 0 {
        anyhow::bail!("Nothing to render between {:.0}ms and {:.0}ms", start_ms, end_ms);
    }
    log::info!("Rendering {} frames ({:.1}s)", total_frames, (end_ms - start_ms) / 1000.0);

    let snapshot = PlaybackSnapshot {
        progress_ms: start_ms,
        duration_ms,
    };
    let mut clock = PlaybackClock::new(snapshot, Duration::ZERO, cfg.render.lead_ms)?;

    let audio = cli.audio.as_deref().map(|path| AudioInput { path, start_ms });
    let video = VideoSettings {
        width,
        height,
        fps: cli.fps,
        codec: &cli.codec,
        pix_fmt: &cli.pix_fmt,
        crf: cli.crf,
    };
    let mut encoder = FfmpegEncoder::new(&cli.output, audio, &video)?;

    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let mut frame = Raster::new(width, height)?;
    for frame_idx in 0..total_frames {
        let now = Duration::from_secs_f64(frame_idx as f64 / f64::from(cli.fps));
        let pct = clock.progress_pct(now);
        frame.reset();
        visualizer.render(&mut frame, pct)?;
        encoder.write_frame(frame.as_rgba())?;
        pb.set_position(frame_idx + 1);
        if clock.is_finished(now) {
            log::debug!("Playback reached the end at frame {}", frame_idx);
            break;
        }
    }

    pb.finish_with_message("Rendering complete");
    encoder.finish()?;

    log::info!("Done! Output: {}", cli.output.display());
    Ok(())
}

/// Font from a file, else from a URL. Text is skipped when neither loads.
fn load_text_overlay(font: Option<&Path>, font_url: Option<&str>) -> Option<TextOverlay> {
    let bytes = match (font, font_url) {
        (Some(path), _) => load_font_file(path),
        (None, Some(url)) => load_font_from_url(url),
        (None, None) => {
            log::warn!("No font configured, title text will be skipped");
            return None;
        }
    };
    match bytes.and_then(|b| TextOverlay::from_bytes(&b).map_err(anyhow::Error::from)) {
        Ok(overlay) => Some(overlay),
        Err(e) => {
            log::warn!("Font unavailable, title text will be skipped: {:#}", e);
            None
        }
    }
}

fn print_palette(features: &AudioFeatures) {
    let mut palette = ColorPalette::new(features);
    println!("Palette for {}", features.uri);
    for (i, color) in palette.key_colors().iter().enumerate() {
        println!("  key {}  {}", i + 1, color.hex());
    }
    for i in 0..16 {
        println!("  {:>5}  {}", i, palette.sample_color().hex());
    }
}
