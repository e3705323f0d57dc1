//! Single-image OCR.
//!
//! [`Recognizer`] is the stateless core: decode, preprocess, recognize, and
//! return an [`Extraction`]. It is cheap to clone and safe to share between
//! concurrent tasks.
//!
//! [`OcrSession`] wraps a recognizer for interactive use, remembering the last
//! result so it can be saved or inspected later. Its recognition methods take
//! `&mut self`, so a session can only have one recognition in flight.

use std::sync::Arc;

use image::DynamicImage;

use crate::{
    async_utils::spawn_blocking_propagating_panics,
    engines::OcrEngine,
    prelude::*,
    preprocess::{PreprocessMode, decode_image, prepare},
    writer::{DEFAULT_RESULTS_DIR, WriteMode, save_text},
};

/// Language used when none is specified.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Source name used for in-memory images without a name.
pub const BUFFER_SOURCE_NAME: &str = "buffer_image";

/// Text extracted from one image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extraction {
    /// The raw text returned by the engine.
    pub text: String,

    /// Name of the source, used to generate output file names. For files,
    /// this is the file name without its extension.
    pub source_name: String,
}

/// Get the source name for an image path.
pub fn source_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| BUFFER_SOURCE_NAME.to_owned())
}

/// Runs images through preprocessing and an OCR engine.
#[derive(Clone)]
pub struct Recognizer {
    engine: Arc<dyn OcrEngine>,
    language: String,
}

impl Recognizer {
    /// Create a recognizer using `engine` with the language model `language`.
    pub fn new(engine: Arc<dyn OcrEngine>, language: impl Into<String>) -> Self {
        Self {
            engine,
            language: language.into(),
        }
    }

    /// The language code passed to the engine.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Preprocess and recognize an already-decoded image.
    #[instrument(level = "debug", skip(self, image), fields(source = %source_name))]
    pub async fn recognize_image(
        &self,
        image: DynamicImage,
        mode: PreprocessMode,
        source_name: String,
    ) -> OcrResult<Extraction> {
        let prepared = spawn_blocking_propagating_panics(move || prepare(image, mode)).await;
        let text = self.engine.recognize(prepared, &self.language).await?;
        Ok(Extraction { text, source_name })
    }

    /// Decode, preprocess and recognize an image file.
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub async fn recognize_file(
        &self,
        path: &Path,
        mode: PreprocessMode,
    ) -> OcrResult<Extraction> {
        let owned_path = path.to_owned();
        let image =
            spawn_blocking_propagating_panics(move || decode_image(&owned_path)).await?;
        self.recognize_image(image, mode, source_name_for(path)).await
    }
}

/// A reusable OCR session which remembers its most recent result.
pub struct OcrSession {
    recognizer: Recognizer,
    results_dir: PathBuf,
    last: Option<Extraction>,
}

impl OcrSession {
    /// Create a session which saves unnamed results under
    /// [`DEFAULT_RESULTS_DIR`].
    pub fn new(recognizer: Recognizer) -> Self {
        Self {
            recognizer,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            last: None,
        }
    }

    /// Use a different directory for auto-named results.
    pub fn with_results_dir(mut self, results_dir: impl Into<PathBuf>) -> Self {
        self.results_dir = results_dir.into();
        self
    }

    /// Extract text from an image file. On failure, any previous result is
    /// kept.
    pub async fn extract_text(
        &mut self,
        path: &Path,
        mode: PreprocessMode,
    ) -> OcrResult<&Extraction> {
        let extraction = self.recognizer.recognize_file(path, mode).await?;
        Ok(&*self.last.insert(extraction))
    }

    /// Extract text from an in-memory image. Results are named after
    /// `source_name`, or [`BUFFER_SOURCE_NAME`].
    pub async fn extract_text_from_image(
        &mut self,
        image: DynamicImage,
        mode: PreprocessMode,
        source_name: Option<&str>,
    ) -> OcrResult<&Extraction> {
        let source_name = source_name.unwrap_or(BUFFER_SOURCE_NAME).to_owned();
        let extraction = self
            .recognizer
            .recognize_image(image, mode, source_name)
            .await?;
        Ok(&*self.last.insert(extraction))
    }

    /// The text from the most recent extraction.
    pub fn text(&self) -> OcrResult<&str> {
        self.last
            .as_ref()
            .map(|extraction| extraction.text.as_str())
            .ok_or(OcrError::NothingToSave)
    }

    /// Save the most recent extraction. Without a `path`, the file is named
    /// `<source-name>_<timestamp>.txt` inside the results directory.
    pub async fn save(&self, path: Option<&Path>, mode: WriteMode) -> OcrResult<PathBuf> {
        let extraction = self.last.as_ref().ok_or(OcrError::NothingToSave)?;
        save_text(
            &extraction.text,
            path,
            mode,
            &self.results_dir,
            &extraction.source_name,
        )
        .await
    }
}
