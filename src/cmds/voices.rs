use tauri::State;

use crate::state::{AppState, VoiceOption};

/// The two voice choices and the installed model each one resolves to.
#[tauri::command]
pub fn list_voices(state: State<'_, AppState>) -> Vec<VoiceOption> {
    state.voice_options()
}
