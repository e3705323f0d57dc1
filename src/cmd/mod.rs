//! Command-line entry points.

use clap::Args;

use crate::{
    engines::{EngineKind, ocr_engine_for_kind},
    prelude::*,
    session::{DEFAULT_LANGUAGE, Recognizer},
};

pub mod folder;
pub mod image;

/// Options shared by every subcommand that runs OCR.
#[derive(Debug, Clone, Args)]
pub struct EngineOpts {
    /// Language code for the OCR model, as understood by the engine.
    #[clap(short = 'l', long = "lang", env = "OCR_LANG", default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Path to the `tesseract` binary, if it isn't on `PATH`.
    #[clap(long, env = "TESSERACT_CMD")]
    pub tesseract_cmd: Option<PathBuf>,

    /// Which OCR engine to use.
    #[clap(long, value_enum, default_value = "tesseract")]
    pub engine: EngineKind,
}

impl EngineOpts {
    /// Build a [`Recognizer`] from these options.
    pub fn recognizer(&self) -> Recognizer {
        debug!(engine = ?self.engine, language = %self.language, "Creating OCR engine");
        let engine = ocr_engine_for_kind(self.engine, self.tesseract_cmd.as_deref());
        Recognizer::new(engine, self.language.clone())
    }
}
