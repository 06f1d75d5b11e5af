use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::{
    config::Settings,
    convert::{Converter, SharedConverter},
    extract::LopdfExtractor,
    form::{FormFields, Voice},
    tts::{Encoder, PiperEngine, Synthesizer, VoiceLibrary},
};

pub type PdfConverter = Converter<LopdfExtractor, PiperEngine>;

/// Builds the production converter; the Piper engine lives as long as it.
pub fn build_converter(settings: &Settings) -> PdfConverter {
    let library = VoiceLibrary::new(settings.voices_dir.clone());
    if library.len() < Voice::ALL.len() {
        warn!(
            "Found {} voice model(s) in {}; both voice choices need at least {}",
            library.len(),
            settings.voices_dir.display(),
            Voice::ALL.len()
        );
    }
    let engine = PiperEngine::new(settings.piper.clone(), library)
        .with_length_scale(settings.length_scale);
    let synthesizer = Synthesizer::new(
        engine,
        settings.format,
        Encoder::new(settings.ffmpeg.clone()),
    );
    Converter::new(LopdfExtractor, synthesizer)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VoiceOption {
    pub voice: Voice,
    pub label: &'static str,
    /// Model the choice resolves to, if installed.
    pub model: Option<String>,
}

pub struct AppState {
    converter: Arc<SharedConverter<LopdfExtractor, PiperEngine>>,
}

impl AppState {
    pub fn initialise(settings: Settings) -> Self {
        let converter = build_converter(&settings);
        info!(
            "Voices from {}, output format {}",
            settings.voices_dir.display(),
            settings.format.extension()
        );
        Self {
            converter: Arc::new(SharedConverter::new(converter)),
        }
    }

    pub fn converter(&self) -> Arc<SharedConverter<LopdfExtractor, PiperEngine>> {
        Arc::clone(&self.converter)
    }

    pub fn voice_options(&self) -> Vec<VoiceOption> {
        let installed = self.converter.voices();
        Voice::ALL
            .iter()
            .map(|voice| VoiceOption {
                voice: *voice,
                label: voice.label(),
                model: installed.get(voice.index()).map(|info| info.label.clone()),
            })
            .collect()
    }

    /// Returns whether a running conversion was asked to stop.
    pub fn cancel(&self) -> bool {
        self.converter.cancel()
    }

    /// Stops any running conversion and releases the speech engine.
    pub fn shutdown(&self) {
        self.converter.shutdown();
    }

    pub fn default_form(&self) -> FormFields {
        FormFields::default()
    }
}
