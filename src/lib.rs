//! Converts a page range of a PDF into a spoken audio file.
//!
//! The pipeline is [`form`] validation, [`extract`] (lopdf) and [`tts`]
//! (Piper, optionally ffmpeg), coordinated by the [`convert`] state machine.
//! The desktop front end lives behind the `gui` feature in [`cmds`].

#[cfg(feature = "gui")]
pub mod cmds;
pub mod config;
pub mod convert;
pub mod error;
pub mod extract;
pub mod form;
pub mod state;
pub mod tts;
pub mod util;

pub use convert::{CancelToken, ConversionReport, ConversionState, Converter, SharedConverter};
pub use error::{CommandError, ConvertError, Field};
pub use form::{AudioFormat, ConversionRequest, FormFields, Voice};
