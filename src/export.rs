//! Video export through an external encoder.
//!
//! At termination the captured frame sequence is handed to `ffmpeg` (or
//! whatever executable the user configured) in a single blocking call. The
//! encoder's exit status is reported back to the caller; nothing in the
//! lifecycle depends on it.

use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use crate::error::ExportError;
use crate::recorder::FrameSequence;

/// Default encoder executable for this platform.
pub fn default_encoder() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("ffmpeg.exe")
    } else {
        PathBuf::from("ffmpeg")
    }
}

/// Encoder invocation settings.
#[derive(Clone, Debug)]
pub struct VideoExporter {
    encoder: PathBuf,
    fps: u32,
    output: PathBuf,
}

impl VideoExporter {
    pub fn new(encoder: impl Into<PathBuf>, fps: u32, output: impl Into<PathBuf>) -> Self {
        Self {
            encoder: encoder.into(),
            fps,
            output: output.into(),
        }
    }

    /// The encoder command for `sequence`, not yet spawned.
    ///
    /// `<encoder> -y -r <fps> -i <dir>/%d.jpg -pix_fmt yuv420p <output>`
    pub fn command(&self, sequence: &FrameSequence) -> Command {
        let mut cmd = Command::new(&self.encoder);
        cmd.arg("-y")
            .arg("-r")
            .arg(self.fps.to_string())
            .arg("-i")
            .arg(sequence.pattern())
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg(&self.output);
        cmd
    }

    /// Run the encoder over `sequence` and wait for it.
    ///
    /// # Errors
    ///
    /// [`ExportError::Spawn`] if the encoder cannot be started,
    /// [`ExportError::Failed`] if it exits unsuccessfully.
    pub fn export(&self, sequence: &FrameSequence) -> Result<ExitStatus, ExportError> {
        tracing::info!(
            target: "export",
            encoder = %self.encoder.display(),
            frames = sequence.len(),
            fps = self.fps,
            output = %self.output.display(),
            "encoding video"
        );
        let status = self
            .command(sequence)
            .status()
            .map_err(|source| ExportError::Spawn {
                program: self.encoder.display().to_string(),
                source,
            })?;
        if status.success() {
            tracing::info!(target: "export", output = %self.output.display(), "video written");
            Ok(status)
        } else {
            tracing::error!(target: "export", %status, "encoder failed");
            Err(ExportError::Failed(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::path::Path;

    #[test]
    fn test_command_arguments() {
        let exporter = VideoExporter::new("ffmpeg", 24, "out.mp4");
        let sequence = FrameSequence::new("images");
        let cmd = exporter.command(&sequence);
        assert_eq!(cmd.get_program(), OsStr::new("ffmpeg"));
        let args: Vec<&OsStr> = cmd.get_args().collect();
        let pattern = Path::new("images").join("%d.jpg");
        assert_eq!(
            args,
            vec![
                OsStr::new("-y"),
                OsStr::new("-r"),
                OsStr::new("24"),
                OsStr::new("-i"),
                pattern.as_os_str(),
                OsStr::new("-pix_fmt"),
                OsStr::new("yuv420p"),
                OsStr::new("out.mp4"),
            ]
        );
    }

    #[test]
    fn test_missing_encoder_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = VideoExporter::new(
            dir.path().join("no-such-encoder"),
            30,
            dir.path().join("res.mp4"),
        );
        let sequence = FrameSequence::new(dir.path());
        assert!(matches!(
            exporter.export(&sequence),
            Err(ExportError::Spawn { .. })
        ));
    }

    #[test]
    fn test_default_encoder_name() {
        let name = default_encoder();
        assert!(name.to_string_lossy().starts_with("ffmpeg"));
    }
}
