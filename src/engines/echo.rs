//! Echo engine for testing.
//!
//! This engine never looks at pixels. It returns either a fixed text or a
//! short description of the image size, which makes batch output predictable.

use image::DynamicImage;

use crate::prelude::*;

use super::OcrEngine;

/// Echo engine for testing.
#[derive(Debug, Default)]
pub struct EchoOcrEngine {
    /// Text to return for every image, if any.
    text: Option<String>,
}

impl EchoOcrEngine {
    /// Create an engine which reports image dimensions, as `"WxH image\n"`.
    pub fn new() -> Self {
        Self { text: None }
    }

    /// Create an engine which returns `text` for every image.
    #[cfg(test)]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[async_trait]
impl OcrEngine for EchoOcrEngine {
    async fn recognize(&self, image: DynamicImage, _language: &str) -> OcrResult<String> {
        Ok(match &self.text {
            Some(text) => text.clone(),
            None => format!("{}x{} image\n", image.width(), image.height()),
        })
    }
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    #[tokio::test]
    async fn describes_image_by_default() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(7, 3));
        let text = EchoOcrEngine::new().recognize(image, "eng").await.unwrap();
        assert_eq!(text, "7x3 image\n");
    }

    #[tokio::test]
    async fn returns_fixed_text() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        let engine = EchoOcrEngine::with_text("HELLO");
        assert_eq!(engine.recognize(image, "deu").await.unwrap(), "HELLO");
    }
}
