use std::path::PathBuf;

pub const RUNTIME_DIR_VAR: &str = "PDF2AUDIO_RUNTIME_DIR";

/// Directory holding bundled tools and voices, `runtime` unless overridden.
pub fn runtime_dir() -> PathBuf {
    match std::env::var_os(RUNTIME_DIR_VAR) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from("runtime"),
    }
}
