use std::{fmt, num::ParseIntError, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::tts::SynthesisError;

const ERROR_MISSING_INPUT: &str = "MISSING_INPUT";
const ERROR_FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";
const ERROR_DIRECTORY_NOT_FOUND: &str = "DIRECTORY_NOT_FOUND";
const ERROR_PARSE: &str = "PARSE_ERROR";
const ERROR_INVALID_PAGE_RANGE: &str = "INVALID_PAGE_RANGE";
const ERROR_EXTRACTION: &str = "EXTRACTION_FAILED";
const ERROR_SYNTHESIS: &str = "SYNTHESIS_FAILED";
const ERROR_BUSY: &str = "BUSY";
const ERROR_CANCELLED: &str = "CANCELLED";

/// Form field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PdfPath,
    OutputFolder,
    StartPage,
    EndPage,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::PdfPath => "PDF path",
            Field::OutputFolder => "output folder",
            Field::StartPage => "start page",
            Field::EndPage => "end page",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Please provide the {0}.")]
    MissingInput(Field),
    #[error("PDF file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Output folder not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("The {field} must be a whole number, got '{value}'.")]
    Parse {
        field: Field,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("Invalid start or end page number: requested pages {start} to {end} of a {total}-page document.")]
    InvalidPageRange { start: i64, end: i64, total: usize },
    #[error("Failed to read PDF {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },
    #[error("Speech synthesis failed: {0}")]
    Synthesis(#[source] SynthesisError),
    #[error("A conversion is already running.")]
    Busy,
    #[error("Conversion cancelled.")]
    Cancelled,
}

impl ConvertError {
    pub fn code(&self) -> &'static str {
        match self {
            ConvertError::MissingInput(_) => ERROR_MISSING_INPUT,
            ConvertError::FileNotFound(_) => ERROR_FILE_NOT_FOUND,
            ConvertError::DirectoryNotFound(_) => ERROR_DIRECTORY_NOT_FOUND,
            ConvertError::Parse { .. } => ERROR_PARSE,
            ConvertError::InvalidPageRange { .. } => ERROR_INVALID_PAGE_RANGE,
            ConvertError::Extraction { .. } => ERROR_EXTRACTION,
            ConvertError::Synthesis(_) => ERROR_SYNTHESIS,
            ConvertError::Busy => ERROR_BUSY,
            ConvertError::Cancelled => ERROR_CANCELLED,
        }
    }
}

impl From<SynthesisError> for ConvertError {
    fn from(value: SynthesisError) -> Self {
        match value {
            SynthesisError::Cancelled => ConvertError::Cancelled,
            other => ConvertError::Synthesis(other),
        }
    }
}

/// Error payload handed to the front end.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl CommandError {
    pub fn new(code: &str, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details,
        }
    }
}

impl From<&ConvertError> for CommandError {
    fn from(value: &ConvertError) -> Self {
        let details = match value {
            ConvertError::Synthesis(SynthesisError::Piper { stderr, .. }) if !stderr.is_empty() => {
                Some(stderr.clone())
            }
            _ => None,
        };
        CommandError::new(value.code(), value.to_string(), details)
    }
}

impl From<ConvertError> for CommandError {
    fn from(value: ConvertError) -> Self {
        CommandError::from(&value)
    }
}
