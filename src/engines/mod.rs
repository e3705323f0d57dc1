//! OCR engine interface.
//!
//! Recognition is a black box: an engine takes a prepared image and a language
//! code, and hands back raw text. Everything else in this crate is written
//! against [`OcrEngine`], so engines can be swapped or stubbed out.

use std::sync::Arc;

use clap::ValueEnum;
use image::DynamicImage;

use crate::prelude::*;

use self::{echo::EchoOcrEngine, tesseract::TesseractOcrEngine};

pub mod echo;
pub mod tesseract;

/// Interface to an OCR engine.
#[async_trait]
pub trait OcrEngine: Send + Sync + 'static {
    /// Recognize the text in `image`, using the engine's model for `language`.
    ///
    /// The returned text is exactly what the engine produced.
    async fn recognize(&self, image: DynamicImage, language: &str) -> OcrResult<String>;
}

/// The engines we know how to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// The `tesseract` command-line tool.
    #[default]
    Tesseract,
    /// Describe the image instead of reading it. Useful for dry runs.
    Echo,
}

/// Build the engine of the requested kind.
///
/// `tesseract_cmd` overrides the Tesseract binary and is ignored by other
/// engines.
pub fn ocr_engine_for_kind(
    kind: EngineKind,
    tesseract_cmd: Option<&Path>,
) -> Arc<dyn OcrEngine> {
    match kind {
        EngineKind::Tesseract => Arc::new(TesseractOcrEngine::new(tesseract_cmd)),
        EngineKind::Echo => Arc::new(EchoOcrEngine::new()),
    }
}
