use std::path::PathBuf;

use thiserror::Error;

use crate::{
    form::AudioFormat,
    util::{
        piper_path::{self, PiperCommand, PiperPathError},
        runtime::runtime_dir,
    },
};

pub const VOICES_DIR_VAR: &str = "PDF2AUDIO_VOICES_DIR";
pub const PIPER_COMMAND_VAR: &str = "PDF2AUDIO_PIPER_COMMAND";
pub const FFMPEG_PATH_VAR: &str = "PDF2AUDIO_FFMPEG_PATH";
pub const FORMAT_VAR: &str = "PDF2AUDIO_FORMAT";
pub const LENGTH_SCALE_VAR: &str = "PDF2AUDIO_LENGTH_SCALE";
pub const LOG_DIR_VAR: &str = "PDF2AUDIO_LOG_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PDF2AUDIO_FORMAT must be 'wav' or 'mp3', got '{0}'")]
    Format(String),
    #[error("PDF2AUDIO_LENGTH_SCALE must be a positive number, got '{0}'")]
    LengthScale(String),
    #[error(transparent)]
    Piper(#[from] PiperPathError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub runtime_dir: PathBuf,
    pub voices_dir: PathBuf,
    pub piper: PiperCommand,
    pub ffmpeg: Option<PathBuf>,
    pub format: AudioFormat,
    pub length_scale: Option<f32>,
    pub log_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let runtime_dir = runtime_dir();

        let voices_dir = var(VOICES_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| runtime_dir.join("voices"));

        let piper = piper_path::resolve(&runtime_dir, var(PIPER_COMMAND_VAR).as_deref())?;

        let format = match var(FORMAT_VAR) {
            Some(raw) => AudioFormat::parse(&raw).ok_or(ConfigError::Format(raw))?,
            None => AudioFormat::default(),
        };

        let length_scale = match var(LENGTH_SCALE_VAR) {
            Some(raw) => match raw.trim().parse::<f32>() {
                Ok(scale) if scale > 0.0 => Some(scale),
                _ => return Err(ConfigError::LengthScale(raw)),
            },
            None => None,
        };

        Ok(Self {
            voices_dir,
            piper,
            ffmpeg: var(FFMPEG_PATH_VAR).map(PathBuf::from),
            format,
            length_scale,
            log_dir: var(LOG_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
            runtime_dir,
        })
    }
}

/// Non-empty value of an environment variable.
fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
