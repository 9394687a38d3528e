use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Video stream settings handed to ffmpeg.
#[derive(Clone, Debug)]
pub struct VideoSettings<'a> {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: &'a str,
    pub pix_fmt: &'a str,
    pub crf: u32,
}

/// Soundtrack muxed under the frames, trimmed to where the frames start.
#[derive(Clone, Copy, Debug)]
pub struct AudioInput<'a> {
    pub path: &'a Path,
    pub start_ms: f64,
}

/// Pipes raw RGBA frames into an `ffmpeg` child process.
pub struct FfmpegEncoder {
    child: Child,
    frame_len: usize,
    frames: u64,
}

fn raw_input_args(width: u32, height: u32, fps: u32) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", width, height),
        "-framerate".into(), fps.to_string(),
        "-i".into(), "pipe:0".into(),
    ]
}

/// Arguments for a video with an optional soundtrack.
pub fn video_args(output: &Path, audio: Option<AudioInput<'_>>, video: &VideoSettings<'_>) -> Vec<String> {
    let mut args = raw_input_args(video.width, video.height, video.fps);

    if let Some(audio) = audio {
        if audio.start_ms > 0.0 {
            args.extend(["-ss".to_string(), format!("{:.3}", audio.start_ms / 1000.0)]);
        }
        args.extend(["-i".to_string(), audio.path.to_string_lossy().into_owned()]);
    }

    args.extend([
        "-c:v".into(), video.codec.to_string(),
        "-pix_fmt".into(), video.pix_fmt.to_string(),
        "-crf".into(), video.crf.to_string(),
        "-preset".into(), "medium".into(),
    ]);

    if audio.is_some() {
        args.extend([
            "-c:a".into(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
        ]);
    }

    args.push(output.to_string_lossy().into_owned());
    args
}

/// Arguments for writing a single frame as an image.
pub fn snapshot_args(output: &Path, width: u32, height: u32) -> Vec<String> {
    let mut args = raw_input_args(width, height, 1);
    args.extend(["-frames:v".to_string(), "1".to_string()]);
    args.push(output.to_string_lossy().into_owned());
    args
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, audio: Option<AudioInput<'_>>, video: &VideoSettings<'_>) -> Result<Self> {
        let args = video_args(output_path, audio, video);
        let encoder = Self::spawn(&args, video.width, video.height)?;
        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            video.width,
            video.height,
            video.fps,
            video.codec
        );
        Ok(encoder)
    }

    pub fn snapshot(output_path: &Path, width: u32, height: u32) -> Result<Self> {
        let args = snapshot_args(output_path, width, height);
        Self::spawn(&args, width, height)
    }

    fn spawn(args: &[String], width: u32, height: u32) -> Result<Self> {
        log::debug!("ffmpeg {}", args.join(" "));
        let child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        Ok(Self {
            child,
            frame_len: width as usize * height as usize * 4,
            frames: 0,
        })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        if rgba_pixels.len() != self.frame_len {
            anyhow::bail!(
                "Frame is {} bytes, encoder expects {}",
                rgba_pixels.len(),
                self.frame_len
            );
        }
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        self.frames += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // EOF on stdin ends the stream
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete ({} frames)", self.frames);
        Ok(())
    }
}
