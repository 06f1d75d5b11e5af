use std::{
    io::{ErrorKind, Read, Write},
    path::Path,
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use log::{error, info, warn};

use super::{voices::VoiceLibrary, SpeechEngine, SynthesisError, VoiceInfo};
use crate::{
    convert::CancelToken,
    util::piper_path::{command_to_args, PiperCommand},
};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Speech engine that runs one Piper process per rendering.
pub struct PiperEngine {
    command: PiperCommand,
    library: VoiceLibrary,
    length_scale: Option<f32>,
    closed: bool,
}

impl PiperEngine {
    pub fn new(command: PiperCommand, library: VoiceLibrary) -> Self {
        Self {
            command,
            library,
            length_scale: None,
            closed: false,
        }
    }

    pub fn with_length_scale(mut self, length_scale: Option<f32>) -> Self {
        self.length_scale = length_scale;
        self
    }

    fn build_command(&self, voice: &VoiceInfo, output: &Path) -> Command {
        let (program, args) = command_to_args(&self.command);
        let mut command = Command::new(program);
        command.args(args);
        command.arg("--model");
        command.arg(&voice.model_path);
        if let Some(config) = &voice.config_path {
            command.arg("--config");
            command.arg(config);
        }
        command.arg("--output_file");
        command.arg(output);
        if let Some(scale) = self.length_scale {
            command.arg("--length_scale");
            command.arg(scale.to_string());
        }
        command
    }

    fn wait(child: &mut Child, cancel: &CancelToken) -> Result<std::process::ExitStatus, SynthesisError> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if cancel.is_cancelled() {
                warn!("Cancelling Piper process {}", child.id());
                if let Err(err) = child.kill() {
                    warn!("Failed to kill Piper process: {err}");
                }
                let _ = child.wait();
                return Err(SynthesisError::Cancelled);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl SpeechEngine for PiperEngine {
    fn voices(&self) -> Vec<VoiceInfo> {
        self.library.list()
    }

    fn render_to_file(
        &mut self,
        text: &str,
        voice: &VoiceInfo,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<(), SynthesisError> {
        if self.closed {
            return Err(SynthesisError::EngineClosed);
        }
        if !voice.model_path.exists() {
            return Err(SynthesisError::ModelMissing(voice.model_path.clone()));
        }

        info!(
            "Invoking Piper with voice {} writing to {}",
            voice.id,
            output.display()
        );
        let start = Instant::now();
        let mut command = self.build_command(voice, output);
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SynthesisError::Spawn {
                program: format!("{:?}", command.get_program()),
                source,
            })?;

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buffer = String::new();
                let _ = stderr.read_to_string(&mut buffer);
                buffer
            })
        });

        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Err(std::io::Error::other("Piper stdin is not available")),
        };
        // Piper closes stdin early when it gives up (a model that fails to
        // load); its exit status and stderr say more than the broken pipe.
        let broken_pipe = match written {
            Ok(()) => None,
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                warn!("Piper stopped reading its input early");
                Some(err)
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SynthesisError::Io(err));
            }
        };

        let status = Self::wait(&mut child, cancel)?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
            .trim()
            .to_string();

        if !status.success() {
            let code = status.code().unwrap_or_default();
            error!("Piper exited with status {code}: {stderr}");
            return Err(SynthesisError::Piper {
                status: code,
                stderr,
            });
        }
        if let Some(err) = broken_pipe {
            return Err(SynthesisError::Io(err));
        }
        if !output.exists() {
            return Err(SynthesisError::NoOutput(output.to_path_buf()));
        }

        info!(
            "Piper finished in {} ms",
            start.elapsed().as_millis()
        );
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.closed {
            info!("Shutting down Piper engine");
            self.closed = true;
        }
    }
}
