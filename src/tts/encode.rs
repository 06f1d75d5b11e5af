use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use log::{error, info};

use super::SynthesisError;

/// WAV to MP3 transcoding through ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    ffmpeg: Option<PathBuf>,
}

impl Encoder {
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self { ffmpeg: configured }
    }

    /// Configured ffmpeg when it exists, otherwise the one on `PATH`.
    pub fn locate_ffmpeg(&self) -> Option<PathBuf> {
        if let Some(candidate) = &self.ffmpeg {
            if candidate.exists() {
                return Some(candidate.clone());
            }
        }
        which::which("ffmpeg").ok()
    }

    pub fn transcode_to_mp3(&self, source: &Path, target: &Path) -> Result<(), SynthesisError> {
        let ffmpeg = self.locate_ffmpeg().ok_or_else(|| {
            error!("ffmpeg not available, cannot produce MP3 output");
            SynthesisError::FfmpegMissing
        })?;

        info!(
            "Encoding {} to MP3 with {}",
            source.display(),
            ffmpeg.display()
        );
        let output = Command::new(&ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(source)
            .args(["-vn", "-ar", "22050", "-ac", "1"])
            .arg(target)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SynthesisError::Spawn {
                program: ffmpeg.display().to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("ffmpeg failed with {}: {stderr}", output.status);
            Err(SynthesisError::Encode(output.status.to_string()))
        }
    }
}

/// Stand-in ffmpeg that copies its input to its output and exits with a
/// fixed status.
#[cfg(all(test, unix))]
pub(crate) mod stub {
    use std::fs::{self, File};
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    pub fn ffmpeg(dir: &Path, exit_code: i32) -> PathBuf {
        let path = dir.join("ffmpeg");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "IN=\"\"; OUT=\"\"").unwrap();
        writeln!(file, "while [ \"$1\" != \"\" ]; do").unwrap();
        writeln!(file, "  if [ \"$1\" = \"-i\" ]; then").unwrap();
        writeln!(file, "    shift").unwrap();
        writeln!(file, "    IN=\"$1\"").unwrap();
        writeln!(file, "  fi").unwrap();
        writeln!(file, "  OUT=\"$1\"").unwrap();
        writeln!(file, "  shift").unwrap();
        writeln!(file, "done").unwrap();
        writeln!(file, "cat \"$IN\" > \"$OUT\"").unwrap();
        writeln!(file, "exit {exit_code}").unwrap();
        drop(file);
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }
}
