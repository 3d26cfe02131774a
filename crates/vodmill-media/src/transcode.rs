//! The fixed downscale transformation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use crate::command::{check_engine, FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Target frame height for processed outputs, in pixels.
pub const DEFAULT_TARGET_HEIGHT: u32 = 360;

const DEFAULT_VIDEO_CODEC: &str = "libx264";
const DEFAULT_PRESET: &str = "fast";
const DEFAULT_CRF: u8 = 23;
const DEFAULT_AUDIO_CODEC: &str = "aac";
const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Settings for the downscale operation.
///
/// The pipeline performs exactly one transformation: scale to
/// `target_height`, width floating with the aspect ratio.
#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    /// Output frame height in pixels
    pub target_height: u32,
    /// Video codec
    pub video_codec: String,
    /// Encoder preset
    pub preset: String,
    /// Constant rate factor (quality)
    pub crf: u8,
    /// Audio codec
    pub audio_codec: String,
    /// Audio bitrate
    pub audio_bitrate: String,
    /// Engine binary, a name on PATH or an absolute path
    pub engine_bin: PathBuf,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            target_height: DEFAULT_TARGET_HEIGHT,
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            engine_bin: PathBuf::from("ffmpeg"),
        }
    }
}

/// Downscale transcoder.
///
/// Knows nothing of remote storage or cleanup; it maps one local path to
/// another through the engine.
#[derive(Debug, Clone)]
pub struct Transcoder {
    settings: TranscodeSettings,
}

impl Transcoder {
    /// Create a transcoder with the given settings.
    pub fn new(settings: TranscodeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TranscodeSettings {
        &self.settings
    }

    /// Resolve the engine binary, failing fast when it is absent.
    pub fn check_engine(&self) -> MediaResult<PathBuf> {
        check_engine(&self.settings.engine_bin)
    }

    /// Scale filter: fixed height, width floating with the aspect ratio.
    fn scale_filter(&self) -> String {
        // -2 rounds the floating width to even, as libx264 requires.
        format!("scale=-2:{}", self.settings.target_height)
    }

    /// Transcode a staged raw file into a staged processed file.
    ///
    /// Resolves only on the engine's terminal outcome: `Ok` on success, or a
    /// typed error that keeps the engine's own stderr detail. `budget` caps
    /// the invocation (the engine is killed on expiry); a flipped `cancel`
    /// token aborts it mid-flight.
    pub async fn downscale(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        budget: Duration,
        cancel: Option<watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        let input = input.as_ref();
        let output = output.as_ref();

        let cmd = FfmpegCommand::new(input, output)
            .video_filter(self.scale_filter())
            .video_codec(&self.settings.video_codec)
            .preset(&self.settings.preset)
            .crf(self.settings.crf)
            .audio_codec(&self.settings.audio_codec)
            .audio_bitrate(&self.settings.audio_bitrate)
            .log_level("error");

        let mut runner = FfmpegRunner::new()
            .with_engine(&self.settings.engine_bin)
            .with_timeout(budget.as_secs().max(1));
        if let Some(cancel) = cancel {
            runner = runner.with_cancel(cancel);
        }

        info!(
            input = %input.display(),
            output = %output.display(),
            height = self.settings.target_height,
            "Transcoding video"
        );
        runner.run(&cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_filter_pins_height() {
        let transcoder = Transcoder::new(TranscodeSettings::default());
        assert_eq!(transcoder.scale_filter(), "scale=-2:360");
    }

    #[test]
    fn test_downscale_argv_shape() {
        let settings = TranscodeSettings::default();
        let cmd = FfmpegCommand::new("raw-videos/clip.mp4", "processed-videos/processed-clip.mp4")
            .video_filter(format!("scale=-2:{}", settings.target_height))
            .video_codec(&settings.video_codec)
            .preset(&settings.preset)
            .crf(settings.crf)
            .audio_codec(&settings.audio_codec)
            .audio_bitrate(&settings.audio_bitrate);

        let args = cmd.build_args();
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "scale=-2:360");
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"fast".to_string()));
    }
}
