//! Tesseract OCR engine.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use tokio::{process::Command, sync::Semaphore};

use crate::{
    async_utils::{check_for_command_failure, spawn_blocking_propagating_panics},
    prelude::*,
};

use super::OcrEngine;

/// The binary we run if nobody tells us otherwise.
pub const DEFAULT_TESSERACT_CMD: &str = "tesseract";

/// OCR engine wrapping the `tesseract` CLI tool.
pub struct TesseractOcrEngine {
    /// The `tesseract` binary to run.
    command: PathBuf,

    /// Limits the number of `tesseract` processes we run at once. Each one
    /// will happily use a full CPU core.
    process_permits: Semaphore,
}

impl TesseractOcrEngine {
    /// Create a new `tesseract` engine, optionally overriding the binary.
    pub fn new(command: Option<&Path>) -> Self {
        let command = command
            .map(Path::to_owned)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TESSERACT_CMD));
        Self {
            command,
            process_permits: Semaphore::new(num_cpus::get()),
        }
    }

    fn command_name(&self) -> String {
        self.command.display().to_string()
    }
}

#[async_trait]
impl OcrEngine for TesseractOcrEngine {
    #[instrument(level = "debug", skip_all, fields(language = %language))]
    async fn recognize(&self, image: DynamicImage, language: &str) -> OcrResult<String> {
        let png = spawn_blocking_propagating_panics(move || encode_png(image)).await?;

        // Write our input to a temporary file.
        let tmpdir = tempfile::TempDir::with_prefix("tesseract")
            .map_err(OcrError::io(std::env::temp_dir()))?;
        let input_path = tmpdir.path().join("input.png");
        let output_base = tmpdir.path().join("output");
        tokio::fs::write(&input_path, &png)
            .await
            .map_err(OcrError::io(&input_path))?;

        // Run tesseract on the input file. It appends `.txt` to the output base.
        let permit = self
            .process_permits
            .acquire()
            .await
            .map_err(|_| OcrError::EngineFailed("process limiter was closed".to_owned()))?;
        let output = Command::new(&self.command)
            .arg(&input_path)
            .arg(&output_base)
            .arg("-l")
            .arg(language)
            .output()
            .await
            .map_err(|source| OcrError::EngineUnavailable {
                command: self.command_name(),
                source,
            })?;
        drop(permit);
        check_for_command_failure(&self.command_name(), &output)?;

        // Read the output file.
        let output_path = output_base.with_extension("txt");
        tokio::fs::read_to_string(&output_path)
            .await
            .map_err(OcrError::io(&output_path))
    }
}

/// Encode an image as 8-bit grayscale or RGB PNG, which is what Tesseract
/// handles best. Alpha channels and deep color are dropped.
fn encode_png(image: DynamicImage) -> OcrResult<Vec<u8>> {
    let image = match image {
        DynamicImage::ImageLuma8(_) => image,
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) => {
            DynamicImage::ImageLuma8(image.to_luma8())
        }
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    };
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(OcrError::Encode)?;
    Ok(buffer.into_inner())
}
