use std::{
    fs,
    path::{Path, PathBuf},
};

use log::warn;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceInfo {
    pub id: String,
    pub label: String,
    pub language: Option<String>,
    pub quality: Option<String>,
    pub model_path: PathBuf,
    pub config_path: Option<PathBuf>,
}

/// Piper voice models found under a directory, in a stable order so that
/// positional voice selection always picks the same model.
#[derive(Default)]
pub struct VoiceLibrary {
    base_dir: PathBuf,
    voices: RwLock<Vec<VoiceInfo>>,
}

impl VoiceLibrary {
    pub fn new(base_dir: PathBuf) -> Self {
        let library = Self {
            base_dir,
            voices: RwLock::new(Vec::new()),
        };
        library.refresh();
        library
    }

    pub fn refresh(&self) {
        let mut discovered = Vec::new();
        if self.base_dir.exists() {
            for entry in WalkDir::new(&self.base_dir)
                .into_iter()
                .filter_map(Result::ok)
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("onnx") {
                    continue;
                }
                if let Some(info) = build_voice_info(path) {
                    discovered.push(info);
                }
            }
        } else {
            warn!("Voice directory {} does not exist", self.base_dir.display());
        }
        discovered.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));
        *self.voices.write() = discovered;
    }

    pub fn list(&self) -> Vec<VoiceInfo> {
        self.voices.read().clone()
    }

    pub fn nth(&self, index: usize) -> Option<VoiceInfo> {
        self.voices.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.voices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.read().is_empty()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

fn build_voice_info(path: &Path) -> Option<VoiceInfo> {
    let id = path.file_stem()?.to_string_lossy().to_string();
    let config_path = metadata_path_for(path);
    let metadata = config_path.as_deref().and_then(read_metadata);

    let language = metadata.as_ref().and_then(|value| value.get("language"));
    let label = language
        .and_then(|lang| lang.get("name_native").or_else(|| lang.get("name")))
        .and_then(Value::as_str)
        .map(|lang| format!("{lang} · {id}"))
        .unwrap_or_else(|| id.clone());
    let language_code = language
        .and_then(|lang| lang.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let quality = metadata
        .as_ref()
        .and_then(|value| value.get("audio"))
        .and_then(|audio| audio.get("quality"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(VoiceInfo {
        id,
        label,
        language: language_code,
        quality,
        model_path: path.to_path_buf(),
        config_path,
    })
}

fn read_metadata(path: &Path) -> Option<Value> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str::<Value>(&contents)
            .map_err(|err| warn!("Failed to parse metadata {}: {err}", path.display()))
            .ok(),
        Err(err) => {
            warn!("Failed to read metadata {}: {err}", path.display());
            None
        }
    }
}

fn metadata_path_for(path: &Path) -> Option<PathBuf> {
    let mut metadata_path = path.to_path_buf();
    metadata_path.set_extension("onnx.json");
    metadata_path.exists().then_some(metadata_path)
}
