//! Speech synthesis.
//!
//! A [`SpeechEngine`] enumerates voices and renders text into a WAV file.
//! [`Synthesizer`] owns the engine, resolves the [`Voice`] choice against
//! the engine's list and commits the finished file to its final path in one
//! step, so a failed or cancelled run never leaves a partial file behind.

pub mod encode;
pub mod piper;
pub mod voices;

use std::{
    io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use tempfile::TempPath;
use thiserror::Error;

pub use encode::Encoder;
pub use piper::PiperEngine;
pub use voices::{VoiceInfo, VoiceLibrary};

use crate::{
    convert::CancelToken,
    form::{AudioFormat, Voice},
};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("no voice installed at position {index} (found {available} voice(s))")]
    VoiceUnavailable { index: usize, available: usize },
    #[error("voice model not found at {}", .0.display())]
    ModelMissing(PathBuf),
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Piper exited with status {status}: {stderr}")]
    Piper { status: i32, stderr: String },
    #[error("Piper did not write {}", .0.display())]
    NoOutput(PathBuf),
    #[error("ffmpeg is not available on PATH; install it or choose WAV output")]
    FfmpegMissing,
    #[error("ffmpeg exited with {0}")]
    Encode(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("the speech engine has been shut down")]
    EngineClosed,
    #[error("synthesis cancelled")]
    Cancelled,
}

pub trait SpeechEngine {
    /// Voices in the order positional selection indexes into.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Renders `text` as WAV into `output`, returning once the file is complete.
    fn render_to_file(
        &mut self,
        text: &str,
        voice: &VoiceInfo,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<(), SynthesisError>;

    fn shutdown(&mut self);
}

pub fn select_voice<E: SpeechEngine + ?Sized>(
    engine: &E,
    voice: Voice,
) -> Result<VoiceInfo, SynthesisError> {
    let mut voices = engine.voices();
    let available = voices.len();
    let index = voice.index();
    if index >= available {
        return Err(SynthesisError::VoiceUnavailable { index, available });
    }
    Ok(voices.swap_remove(index))
}

pub struct Synthesizer<E: SpeechEngine> {
    engine: E,
    format: AudioFormat,
    encoder: Encoder,
    closed: bool,
}

impl<E: SpeechEngine> Synthesizer<E> {
    pub fn new(engine: E, format: AudioFormat, encoder: Encoder) -> Self {
        Self {
            engine,
            format,
            encoder,
            closed: false,
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.engine.voices()
    }

    /// Speaks `text` with `voice` into `output`, replacing any existing file.
    pub fn synthesize(
        &mut self,
        text: &str,
        voice: Voice,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<(), SynthesisError> {
        let selected = select_voice(&self.engine, voice)?;
        info!("Using {} ({}) for synthesis", voice.label(), selected.id);

        let rendered = scratch_file(output, "wav")?;
        self.engine
            .render_to_file(text, &selected, &rendered, cancel)?;
        ensure_active(cancel)?;

        let finished = match self.format {
            AudioFormat::Wav => rendered,
            AudioFormat::Mp3 => {
                let encoded = scratch_file(output, "mp3")?;
                self.encoder.transcode_to_mp3(&rendered, &encoded)?;
                encoded
            }
        };
        ensure_active(cancel)?;

        finished
            .persist(output)
            .map_err(|err| SynthesisError::Io(err.error))?;
        debug!("Committed {}", output.display());
        Ok(())
    }

    pub fn shutdown(&mut self) {
        if !self.closed {
            self.engine.shutdown();
            self.closed = true;
        }
    }
}

fn ensure_active(cancel: &CancelToken) -> Result<(), SynthesisError> {
    if cancel.is_cancelled() {
        Err(SynthesisError::Cancelled)
    } else {
        Ok(())
    }
}

/// Temporary file next to `output` so the final rename stays on one filesystem.
/// It is deleted on drop unless persisted.
fn scratch_file(output: &Path, extension: &str) -> Result<TempPath, SynthesisError> {
    let dir = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file = tempfile::Builder::new()
        .prefix(".pdf2audio-")
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}
