//! Raw form state and its validation into a [`ConversionRequest`].
//!
//! The desktop page and the command line both fill a [`FormFields`] with the
//! text the user typed. [`FormFields::validate`] checks the fields in a fixed
//! order and stops at the first problem, without opening the PDF.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Field};

pub const DEFAULT_START_PAGE: &str = "1";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Male,
    Female,
}

impl Voice {
    pub const ALL: [Voice; 2] = [Voice::Male, Voice::Female];

    /// Position of this voice in the engine's voice list.
    pub fn index(self) -> usize {
        match self {
            Voice::Male => 0,
            Voice::Female => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Voice::Male => "Male Voice",
            Voice::Female => "Female Voice",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wav" => Some(AudioFormat::Wav),
            "mp3" => Some(AudioFormat::Mp3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormFields {
    pub pdf_path: String,
    pub voice: Voice,
    pub start_page: String,
    pub end_page: String,
    pub output_folder: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            pdf_path: String::new(),
            voice: Voice::default(),
            start_page: DEFAULT_START_PAGE.to_string(),
            end_page: String::new(),
            output_folder: String::new(),
        }
    }
}

impl FormFields {
    /// Resets the request fields after a successful conversion. The voice
    /// choice is a selector, not a request field, and is kept.
    pub fn clear(&mut self) {
        *self = Self {
            voice: self.voice,
            ..Self::default()
        };
    }

    pub fn validate(&self) -> Result<ConversionRequest, ConvertError> {
        if self.pdf_path.is_empty() {
            return Err(ConvertError::MissingInput(Field::PdfPath));
        }
        let pdf_path = PathBuf::from(&self.pdf_path);
        if !pdf_path.is_file() {
            return Err(ConvertError::FileNotFound(pdf_path));
        }

        if self.output_folder.is_empty() {
            return Err(ConvertError::MissingInput(Field::OutputFolder));
        }
        let output_folder = PathBuf::from(&self.output_folder);
        if !output_folder.is_dir() {
            return Err(ConvertError::DirectoryNotFound(output_folder));
        }

        if self.start_page.is_empty() {
            return Err(ConvertError::MissingInput(Field::StartPage));
        }
        if self.end_page.is_empty() {
            return Err(ConvertError::MissingInput(Field::EndPage));
        }

        let start_page = parse_page(Field::StartPage, &self.start_page)?;
        let end_page = parse_page(Field::EndPage, &self.end_page)?;

        Ok(ConversionRequest {
            pdf_path,
            voice: self.voice,
            start_page,
            end_page,
            output_folder,
        })
    }
}

fn parse_page(field: Field, value: &str) -> Result<i64, ConvertError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|source| ConvertError::Parse {
            field,
            value: value.to_string(),
            source,
        })
}

/// A validated conversion attempt. Page numbers are the user-facing,
/// 1-based values; the page count bound is checked once the PDF is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub pdf_path: PathBuf,
    pub voice: Voice,
    pub start_page: i64,
    pub end_page: i64,
    pub output_folder: PathBuf,
}

impl ConversionRequest {
    pub fn output_file(&self, format: AudioFormat) -> PathBuf {
        self.output_folder.join(format!(
            "{}_audio.{}",
            base_name(&self.pdf_path),
            format.extension()
        ))
    }
}

fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}
