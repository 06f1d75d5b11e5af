//! Tauri commands backing the desktop form.
//!
//! Each command is a thin adapter over [`crate::state::AppState`]; the
//! conversion itself runs on a blocking worker so the window stays responsive.

pub mod convert;
pub mod voices;

pub use convert::{cancel_conversion, convert_pdf, default_form, ConvertResponse};
pub use voices::list_voices;
