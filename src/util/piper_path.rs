use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum PiperCommand {
    Executable(PathBuf),
    PythonModule(PathBuf),
    Custom(Vec<String>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PiperPathError {
    #[error("could not parse Piper command line '{0}'")]
    InvalidCommand(String),
    #[error("no Piper executable in {0} and no python on PATH to run 'python -m piper'")]
    Unavailable(PathBuf),
}

/// Picks the Piper invocation: an explicit command line wins, then a bundled
/// executable under `<runtime>/piper`, then the `piper` python module.
pub fn resolve(runtime_dir: &Path, custom: Option<&str>) -> Result<PiperCommand, PiperPathError> {
    if let Some(raw) = custom {
        return parse_custom(raw);
    }

    let piper_dir = runtime_dir.join("piper");
    let candidate = piper_dir.join(if cfg!(windows) { "piper.exe" } else { "piper" });
    if candidate.exists() {
        return Ok(PiperCommand::Executable(candidate));
    }

    which::which("python3")
        .or_else(|_| which::which("python"))
        .map(PiperCommand::PythonModule)
        .map_err(|_| PiperPathError::Unavailable(piper_dir))
}

fn parse_custom(raw: &str) -> Result<PiperCommand, PiperPathError> {
    match shlex::split(raw) {
        Some(parts) if !parts.is_empty() => Ok(PiperCommand::Custom(parts)),
        _ => Err(PiperPathError::InvalidCommand(raw.to_string())),
    }
}

pub fn command_to_args(cmd: &PiperCommand) -> (OsString, Vec<OsString>) {
    match cmd {
        PiperCommand::Executable(path) => (path.as_os_str().into(), vec![]),
        PiperCommand::PythonModule(python) => (
            python.as_os_str().into(),
            vec!["-m".into(), "piper".into()],
        ),
        PiperCommand::Custom(parts) => {
            let mut parts = parts.iter().map(OsString::from);
            let program = parts.next().unwrap_or_default();
            (program, parts.collect())
        }
    }
}
