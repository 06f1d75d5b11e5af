//! pdf2audio command line.
//!
//! Usage: pdf2audio convert --pdf book.pdf --end 12 --output-dir out/
//!        pdf2audio convert --interactive
//!        pdf2audio voices

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flexi_logger::Duplicate;
use log::info;

use pdf2audio::{
    config::Settings,
    form::DEFAULT_START_PAGE,
    state::build_converter,
    tts::VoiceLibrary,
    util::logging,
    AudioFormat, CancelToken, FormFields, Voice,
};

#[derive(Parser)]
#[command(name = "pdf2audio", version, about = "Convert a page range of a PDF into spoken audio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert pages of a PDF into an audio file
    Convert(ConvertArgs),
    /// List installed voices and which voice choice uses each
    Voices {
        /// Directory to search for Piper voice models
        #[arg(long)]
        voices_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// PDF file to read
    #[arg(long, default_value = "")]
    pdf: String,
    #[arg(long, value_enum, default_value_t = Voice::Male)]
    voice: Voice,
    /// First page to read (1-based)
    #[arg(long, default_value = DEFAULT_START_PAGE)]
    start: String,
    /// Last page to read
    #[arg(long, default_value = "")]
    end: String,
    /// Existing folder that receives <pdf name>_audio.<ext>
    #[arg(long, default_value = "")]
    output_dir: String,
    /// Audio format, overrides PDF2AUDIO_FORMAT
    #[arg(long, value_enum)]
    format: Option<AudioFormat>,
    /// Directory to search for Piper voice models
    #[arg(long)]
    voices_dir: Option<PathBuf>,
    /// Prompt for every field, showing the current value as default
    #[arg(short, long)]
    interactive: bool,
}

impl ConvertArgs {
    fn form(&self) -> FormFields {
        FormFields {
            pdf_path: self.pdf.clone(),
            voice: self.voice,
            start_page: self.start.clone(),
            end_page: self.end.clone(),
            output_folder: self.output_dir.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = Settings::from_env().context("invalid configuration")?;
    logging::init(&settings.log_dir, Duplicate::Warn).context("failed to initialise logger")?;

    match cli.command {
        Command::Convert(args) => {
            if let Some(format) = args.format {
                settings.format = format;
            }
            if let Some(dir) = &args.voices_dir {
                settings.voices_dir = dir.clone();
            }
            convert(&settings, &args)
        }
        Command::Voices { voices_dir } => {
            list_voices(voices_dir.unwrap_or(settings.voices_dir));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn convert(settings: &Settings, args: &ConvertArgs) -> Result<ExitCode> {
    let mut form = args.form();
    if args.interactive {
        prompt_form(&mut form).context("failed to read form input")?;
    }

    info!("Command line conversion of '{}'", form.pdf_path);
    let mut converter = build_converter(settings);
    let outcome = converter.run(&mut form, &CancelToken::new());
    converter.shutdown();

    match outcome {
        Ok(report) => {
            println!(
                "PDF converted to {} successfully: {}",
                settings.format.extension().to_uppercase(),
                report.output_file.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("Error: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn prompt_form(form: &mut FormFields) -> io::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    prompt(&mut input, "PDF path", &mut form.pdf_path)?;

    let mut voice = form.voice.label().to_string();
    loop {
        prompt(&mut input, "Voice (male/female)", &mut voice)?;
        match parse_voice(&voice) {
            Some(parsed) => {
                form.voice = parsed;
                break;
            }
            None => {
                eprintln!("Please answer 'male' or 'female'.");
                voice = form.voice.label().to_string();
            }
        }
    }

    prompt(&mut input, "Start page", &mut form.start_page)?;
    prompt(&mut input, "End page", &mut form.end_page)?;
    prompt(&mut input, "Output folder", &mut form.output_folder)
}

/// Asks for `label`, keeping `value` when the answer is blank.
fn prompt(input: &mut impl BufRead, label: &str, value: &mut String) -> io::Result<()> {
    if value.is_empty() {
        print!("{label}: ");
    } else {
        print!("{label} [{value}]: ");
    }
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    if !answer.is_empty() {
        *value = answer.to_string();
    }
    Ok(())
}

fn parse_voice(answer: &str) -> Option<Voice> {
    let answer = answer.trim().to_ascii_lowercase();
    Voice::ALL.into_iter().find(|voice| {
        let label = voice.label().to_ascii_lowercase();
        answer == label || label.starts_with(&format!("{answer} "))
    })
}

fn list_voices(voices_dir: PathBuf) {
    let library = VoiceLibrary::new(voices_dir);
    println!("Voices in {}:", library.base_dir().display());
    if library.is_empty() {
        println!("  (none found; install Piper .onnx models here)");
    }
    for (index, info) in library.list().iter().enumerate() {
        let choice = Voice::ALL
            .iter()
            .find(|voice| voice.index() == index)
            .map(|voice| format!("  <- {}", voice.label()))
            .unwrap_or_default();
        println!("  {index}: {} ({}){choice}", info.label, info.model_path.display());
    }
}
