use log::error;
use serde::Serialize;
use tauri::State;

use crate::{
    convert::ConversionReport,
    error::CommandError,
    form::FormFields,
    state::AppState,
};

const ERROR_WORKER: &str = "INTERNAL_ERROR";

#[derive(Debug, Serialize)]
#[serde(tag = "ok")]
pub enum ConvertResponse {
    #[serde(rename = "true")]
    Success {
        report: ConversionReport,
        form: FormFields,
    },
    #[serde(rename = "false")]
    Error {
        error: CommandError,
        form: FormFields,
    },
}

/// Runs one conversion. The returned form is what the page should display
/// next: cleared after a success, untouched after a failure.
#[tauri::command]
pub async fn convert_pdf(
    state: State<'_, AppState>,
    form: FormFields,
) -> Result<ConvertResponse, CommandError> {
    let converter = state.converter();
    let (outcome, form) = tauri::async_runtime::spawn_blocking(move || converter.try_run(form))
        .await
        .map_err(|err| {
            error!("Conversion worker failed: {err}");
            CommandError::new(ERROR_WORKER, "Conversion worker failed", Some(err.to_string()))
        })?;

    Ok(match outcome {
        Ok(report) => ConvertResponse::Success { report, form },
        Err(err) => ConvertResponse::Error {
            error: CommandError::from(&err),
            form,
        },
    })
}

#[tauri::command]
pub fn cancel_conversion(state: State<'_, AppState>) -> bool {
    state.cancel()
}

#[tauri::command]
pub fn default_form(state: State<'_, AppState>) -> FormFields {
    state.default_form()
}
