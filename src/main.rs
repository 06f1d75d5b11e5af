// Prevents an extra console window on Windows in release builds.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use flexi_logger::Duplicate;
use log::{error, info};
use tauri::{Manager, RunEvent};

use pdf2audio::{cmds, config::Settings, state::AppState, util::logging};

fn main() {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = logging::init(&settings.log_dir, Duplicate::Info) {
        eprintln!("Failed to initialise logger: {err}");
    }
    info!("Starting PDF to Audio desktop app");

    let app = tauri::Builder::default()
        .manage(AppState::initialise(settings))
        .invoke_handler(tauri::generate_handler![
            cmds::convert_pdf,
            cmds::cancel_conversion,
            cmds::default_form,
            cmds::list_voices
        ])
        .build(tauri::generate_context!());

    match app {
        Ok(app) => app.run(|handle, event| {
            if let RunEvent::Exit = event {
                handle.state::<AppState>().shutdown();
            }
        }),
        Err(err) => error!("Tauri runtime error: {err:?}"),
    }
}
