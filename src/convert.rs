//! The conversion state machine.
//!
//! `Idle -> Validating -> Extracting -> Synthesizing -> Succeeded | Failed -> Idle`
//!
//! [`Converter::run`] drives one attempt from raw form fields to an audio
//! file. Every expected failure ends the attempt in `Failed` with the error
//! message; the form is cleared only on success.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use log::{error, info};
use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    error::ConvertError,
    extract::TextExtractor,
    form::FormFields,
    tts::{SpeechEngine, Synthesizer, VoiceInfo},
};

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), ConvertError> {
        if self.is_cancelled() {
            Err(ConvertError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ConversionState {
    Idle,
    Validating,
    Extracting,
    Synthesizing,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub output_file: PathBuf,
    pub pages: usize,
    pub characters: usize,
    pub elapsed_ms: u128,
}

type Observer = Box<dyn FnMut(&ConversionState) + Send>;

pub struct Converter<X: TextExtractor, E: SpeechEngine> {
    extractor: X,
    synthesizer: Synthesizer<E>,
    state: ConversionState,
    observer: Option<Observer>,
}

impl<X: TextExtractor, E: SpeechEngine> Converter<X, E> {
    pub fn new(extractor: X, synthesizer: Synthesizer<E>) -> Self {
        Self {
            extractor,
            synthesizer,
            state: ConversionState::Idle,
            observer: None,
        }
    }

    /// Registers a callback that sees every state transition.
    pub fn on_transition(mut self, observer: impl FnMut(&ConversionState) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.synthesizer.voices()
    }

    /// Runs one conversion attempt. On success `form` is cleared; on failure
    /// it is left as the user typed it.
    pub fn run(
        &mut self,
        form: &mut FormFields,
        cancel: &CancelToken,
    ) -> Result<ConversionReport, ConvertError> {
        let outcome = self.attempt(form, cancel);
        match &outcome {
            Ok(report) => {
                info!(
                    "Converted {} page(s) into {} in {} ms",
                    report.pages,
                    report.output_file.display(),
                    report.elapsed_ms
                );
                self.transition(ConversionState::Succeeded);
                form.clear();
            }
            Err(err) => {
                error!("Conversion failed: {err}");
                self.transition(ConversionState::Failed(err.to_string()));
            }
        }
        self.transition(ConversionState::Idle);
        outcome
    }

    fn attempt(
        &mut self,
        form: &FormFields,
        cancel: &CancelToken,
    ) -> Result<ConversionReport, ConvertError> {
        let started = Instant::now();

        self.transition(ConversionState::Validating);
        let request = form.validate()?;
        let output_file = request.output_file(self.synthesizer.format());

        self.transition(ConversionState::Extracting);
        let extracted = self.extractor.extract(&request, cancel)?;
        cancel.check()?;

        self.transition(ConversionState::Synthesizing);
        self.synthesizer
            .synthesize(&extracted.text, request.voice, &output_file, cancel)?;

        Ok(ConversionReport {
            output_file,
            pages: extracted.pages,
            characters: extracted.text.chars().count(),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    fn transition(&mut self, next: ConversionState) {
        log::debug!("conversion state {:?} -> {:?}", self.state, next);
        self.state = next;
        if let Some(observer) = self.observer.as_mut() {
            observer(&self.state);
        }
    }

    /// Releases the speech engine. Runs at most once; also called on drop.
    pub fn shutdown(&mut self) {
        self.synthesizer.shutdown();
    }
}

impl<X: TextExtractor, E: SpeechEngine> Drop for Converter<X, E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A converter shared with a front end that may dispatch requests from
/// several threads. At most one conversion runs at a time; a second request
/// is rejected with [`ConvertError::Busy`] instead of queueing.
pub struct SharedConverter<X: TextExtractor, E: SpeechEngine> {
    converter: Mutex<Converter<X, E>>,
    active: Mutex<Option<CancelToken>>,
}

impl<X: TextExtractor, E: SpeechEngine> SharedConverter<X, E> {
    pub fn new(converter: Converter<X, E>) -> Self {
        Self {
            converter: Mutex::new(converter),
            active: Mutex::new(None),
        }
    }

    /// Runs `form` and returns the report with the form as it should be shown
    /// afterwards.
    pub fn try_run(
        &self,
        mut form: FormFields,
    ) -> (Result<ConversionReport, ConvertError>, FormFields) {
        let Some(mut converter) = self.converter.try_lock() else {
            return (Err(ConvertError::Busy), form);
        };
        let cancel = CancelToken::new();
        *self.active.lock() = Some(cancel.clone());
        let outcome = converter.run(&mut form, &cancel);
        *self.active.lock() = None;
        (outcome, form)
    }

    /// Cancels the running conversion, returning whether one was active.
    pub fn cancel(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(token) => {
                info!("Cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels any active run, waits for it to finish and shuts the engine down.
    pub fn shutdown(&self) {
        self.cancel();
        self.converter.lock().shutdown();
    }

    pub fn is_busy(&self) -> bool {
        self.converter.is_locked()
    }

    /// Voices of the engine, or an empty list while a conversion holds it.
    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.converter
            .try_lock()
            .map(|converter| converter.voices())
            .unwrap_or_default()
    }

    pub fn state(&self) -> Option<ConversionState> {
        self.converter
            .try_lock()
            .map(|converter| converter.state().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc, Arc,
        },
        thread,
        time::Duration,
    };

    use super::*;
    use crate::{
        error::Field,
        extract::{fixtures::write_pdf, ExtractedText, LopdfExtractor},
        form::{AudioFormat, ConversionRequest, Voice},
        tts::{fake::FakeEngine, Encoder},
    };

    #[derive(Clone, Default)]
    struct CountingExtractor {
        calls: Arc<AtomicUsize>,
    }

    impl TextExtractor for CountingExtractor {
        fn extract(
            &self,
            request: &ConversionRequest,
            cancel: &CancelToken,
        ) -> Result<ExtractedText, ConvertError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            LopdfExtractor.extract(request, cancel)
        }
    }

    /// Blocks inside extraction until the test releases it.
    struct GatedExtractor {
        entered: mpsc::Sender<()>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl TextExtractor for GatedExtractor {
        fn extract(
            &self,
            _request: &ConversionRequest,
            cancel: &CancelToken,
        ) -> Result<ExtractedText, ConvertError> {
            self.entered.send(()).unwrap();
            self.release.lock().recv().unwrap();
            cancel.check()?;
            Ok(ExtractedText {
                text: "gated".into(),
                pages: 1,
            })
        }
    }

    fn converter(
        extractor: CountingExtractor,
        engine: FakeEngine,
    ) -> Converter<CountingExtractor, FakeEngine> {
        Converter::new(
            extractor,
            Synthesizer::new(engine, AudioFormat::Wav, Encoder::default()),
        )
    }

    fn form_for(pdf: &std::path::Path, start: &str, end: &str) -> FormFields {
        FormFields {
            pdf_path: pdf.to_string_lossy().into_owned(),
            voice: Voice::Female,
            start_page: start.into(),
            end_page: end.into(),
            output_folder: pdf.parent().unwrap().to_string_lossy().into_owned(),
        }
    }

    fn recorded(
        converter: Converter<CountingExtractor, FakeEngine>,
    ) -> (
        Converter<CountingExtractor, FakeEngine>,
        Arc<parking_lot::Mutex<Vec<ConversionState>>>,
    ) {
        let states = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        let converter = converter.on_transition(move |state| sink.lock().push(state.clone()));
        (converter, states)
    }

    #[test]
    fn hello_world_end_to_end() {
        let temp = tempfile::tempdir().unwrap();
        let pdf = temp.path().join("greeting.pdf");
        write_pdf(&pdf, &["Hello", "World", "!"]);
        let engine = FakeEngine::with_voices(&["ryan", "amy"]);
        let (mut converter, states) = recorded(converter(CountingExtractor::default(), engine.clone()));
        let mut form = form_for(&pdf, "1", "3");

        let report = converter.run(&mut form, &CancelToken::new()).unwrap();

        assert_eq!(report.output_file, temp.path().join("greeting_audio.wav"));
        assert_eq!(report.pages, 3);
        assert_eq!(fs::read_to_string(&report.output_file).unwrap(), "HelloWorld!");
        assert_eq!(engine.calls()[0].text, "HelloWorld!");
        assert_eq!(engine.calls()[0].voice, "amy");
        assert_eq!(
            *states.lock(),
            vec![
                ConversionState::Validating,
                ConversionState::Extracting,
                ConversionState::Synthesizing,
                ConversionState::Succeeded,
                ConversionState::Idle,
            ]
        );
        assert_eq!(
            form,
            FormFields {
                voice: Voice::Female,
                ..FormFields::default()
            }
        );
        assert_eq!(converter.state(), &ConversionState::Idle);
    }

    #[test]
    fn empty_pdf_path_fails_without_work() {
        let extractor = CountingExtractor::default();
        let engine = FakeEngine::with_voices(&["ryan", "amy"]);
        let (mut converter, states) = recorded(converter(extractor.clone(), engine.clone()));
        let mut form = FormFields::default();

        let err = converter.run(&mut form, &CancelToken::new()).unwrap_err();

        assert!(matches!(err, ConvertError::MissingInput(Field::PdfPath)));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
        assert!(engine.calls().is_empty());
        assert_eq!(
            *states.lock(),
            vec![
                ConversionState::Validating,
                ConversionState::Failed("Please provide the PDF path.".into()),
                ConversionState::Idle,
            ]
        );
        assert_eq!(form, FormFields::default());
    }

    #[test]
    fn page_beyond_document_fails_and_keeps_fields() {
        let temp = tempfile::tempdir().unwrap();
        let pdf = temp.path().join("short.pdf");
        write_pdf(&pdf, &["a", "b"]);
        let engine = FakeEngine::with_voices(&["ryan", "amy"]);
        let mut converter = converter(CountingExtractor::default(), engine.clone());
        let mut form = form_for(&pdf, "3", "3");
        let before = form.clone();

        let err = converter.run(&mut form, &CancelToken::new()).unwrap_err();

        assert!(matches!(err, ConvertError::InvalidPageRange { total: 2, .. }));
        assert_eq!(form, before);
        assert!(engine.calls().is_empty());
        assert!(!temp.path().join("short_audio.wav").exists());
    }

    #[test]
    fn missing_file_creates_no_output() {
        let temp = tempfile::tempdir().unwrap();
        let pdf = temp.path().join("ghost.pdf");
        let mut converter = converter(
            CountingExtractor::default(),
            FakeEngine::with_voices(&["ryan", "amy"]),
        );
        let mut form = form_for(&pdf, "1", "1");

        let err = converter.run(&mut form, &CancelToken::new()).unwrap_err();

        assert!(matches!(err, ConvertError::FileNotFound(_)));
        assert!(!temp.path().join("ghost_audio.wav").exists());
    }

    #[test]
    fn rerun_overwrites_same_output() {
        let temp = tempfile::tempdir().unwrap();
        let pdf = temp.path().join("book.pdf");
        write_pdf(&pdf, &["first", "second"]);
        let mut converter = converter(
            CountingExtractor::default(),
            FakeEngine::with_voices(&["ryan", "amy"]),
        );

        let first = converter
            .run(&mut form_for(&pdf, "1", "2"), &CancelToken::new())
            .unwrap();
        let second = converter
            .run(&mut form_for(&pdf, "2", "2"), &CancelToken::new())
            .unwrap();

        assert_eq!(first.output_file, second.output_file);
        assert_eq!(fs::read_to_string(&second.output_file).unwrap(), "second");
    }

    #[test]
    fn synthesis_failure_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let pdf = temp.path().join("book.pdf");
        write_pdf(&pdf, &["text"]);
        let mut engine = FakeEngine::with_voices(&["ryan", "amy"]);
        engine.fail_with = Some("boom".into());
        let mut converter = converter(CountingExtractor::default(), engine);

        let err = converter
            .run(&mut form_for(&pdf, "1", "1"), &CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, ConvertError::Synthesis(_)));
        assert!(!temp.path().join("book_audio.wav").exists());
    }

    #[test]
    fn dropping_converter_shuts_engine_down() {
        let engine = FakeEngine::with_voices(&["ryan"]);
        let mut converter = converter(CountingExtractor::default(), engine.clone());
        converter.shutdown();
        drop(converter);
        assert_eq!(*engine.shutdowns.lock().unwrap(), 1);
    }

    #[test]
    fn second_request_is_rejected_while_busy() {
        let temp = tempfile::tempdir().unwrap();
        let pdf = temp.path().join("book.pdf");
        fs::write(&pdf, b"%PDF").unwrap();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let shared = Arc::new(SharedConverter::new(Converter::new(
            GatedExtractor {
                entered: entered_tx,
                release: Mutex::new(release_rx),
            },
            Synthesizer::new(
                FakeEngine::with_voices(&["ryan", "amy"]),
                AudioFormat::Wav,
                Encoder::default(),
            ),
        )));

        let worker = {
            let shared = Arc::clone(&shared);
            let form = form_for(&pdf, "1", "1");
            thread::spawn(move || shared.try_run(form))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(shared.is_busy());
        let (second, untouched) = shared.try_run(form_for(&pdf, "1", "1"));
        assert!(matches!(second, Err(ConvertError::Busy)));
        assert_eq!(untouched.start_page, "1");

        release_tx.send(()).unwrap();
        let (first, cleared) = worker.join().unwrap();
        assert!(first.is_ok());
        assert!(cleared.pdf_path.is_empty());
        assert!(!shared.is_busy());
    }

    #[test]
    fn cancel_stops_active_conversion_without_output() {
        let temp = tempfile::tempdir().unwrap();
        let pdf = temp.path().join("book.pdf");
        fs::write(&pdf, b"%PDF").unwrap();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let engine = FakeEngine::with_voices(&["ryan", "amy"]);
        let shared = Arc::new(SharedConverter::new(Converter::new(
            GatedExtractor {
                entered: entered_tx,
                release: Mutex::new(release_rx),
            },
            Synthesizer::new(engine.clone(), AudioFormat::Wav, Encoder::default()),
        )));

        assert!(!shared.cancel());
        let worker = {
            let shared = Arc::clone(&shared);
            let form = form_for(&pdf, "1", "1");
            thread::spawn(move || shared.try_run(form))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(shared.cancel());
        release_tx.send(()).unwrap();

        let (outcome, form) = worker.join().unwrap();
        assert!(matches!(outcome, Err(ConvertError::Cancelled)));
        assert!(!form.pdf_path.is_empty());
        assert!(engine.calls().is_empty());
        assert!(!temp.path().join("book_audio.wav").exists());
        assert_eq!(shared.state(), Some(ConversionState::Idle));
    }
}
