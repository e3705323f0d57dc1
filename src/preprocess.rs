//! Image decoding and the canned preprocessing filters applied before OCR.

use std::fmt;

use clap::ValueEnum;
use image::{DynamicImage, GrayImage, ImageReader, Luma};
use imageproc::{contrast::otsu_level, filter::median_filter};
use serde::Serialize;

use crate::prelude::*;

/// Preprocessing applied to an image before it is handed to the OCR engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessMode {
    /// Pass the image through unchanged.
    #[default]
    None,
    /// Grayscale, then binarize with an Otsu threshold.
    #[value(alias = "thresh")]
    Threshold,
    /// Grayscale, then a 3x3 median filter to remove speckles.
    Blur,
}

impl fmt::Display for PreprocessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreprocessMode::None => "none",
            PreprocessMode::Threshold => "threshold",
            PreprocessMode::Blur => "blur",
        };
        f.write_str(name)
    }
}

/// Decode an image file, sniffing the format from its contents.
pub fn decode_image(path: &Path) -> OcrResult<DynamicImage> {
    if !path.is_file() {
        return Err(OcrError::InputNotFound(path.to_owned()));
    }
    let reader = ImageReader::open(path)
        .map_err(OcrError::io(path))?
        .with_guessed_format()
        .map_err(OcrError::io(path))?;
    reader.decode().map_err(|source| OcrError::Decode {
        source_name: path.display().to_string(),
        source,
    })
}

/// Decode an in-memory encoded image (PNG, JPEG, ...).
pub fn decode_bytes(data: &[u8], source_name: &str) -> OcrResult<DynamicImage> {
    image::load_from_memory(data).map_err(|source| OcrError::Decode {
        source_name: source_name.to_owned(),
        source,
    })
}

/// Apply `mode` to `image`. This is a pure function of its inputs.
pub fn prepare(image: DynamicImage, mode: PreprocessMode) -> DynamicImage {
    match mode {
        PreprocessMode::None => image,
        PreprocessMode::Threshold => DynamicImage::ImageLuma8(binarize_otsu(&image.to_luma8())),
        PreprocessMode::Blur => DynamicImage::ImageLuma8(median_filter(&image.to_luma8(), 1, 1)),
    }
}

/// Global Otsu binarization. Pixels above the computed level become white,
/// everything else black.
fn binarize_otsu(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    trace!(level, "Otsu threshold computed");
    let mut output = gray.clone();
    for pixel in output.pixels_mut() {
        *pixel = if pixel.0[0] > level { Luma([255]) } else { Luma([0]) };
    }
    output
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use image::{Rgb, RgbImage};

    use super::*;

    /// A horizontal gradient with some colored "ink" in the middle.
    fn sample_image() -> DynamicImage {
        let image = RgbImage::from_fn(64, 16, |x, y| {
            if (6..10).contains(&y) && x % 5 != 0 {
                Rgb([20, 30, 200])
            } else {
                let v = (x * 4) as u8;
                Rgb([v, v, v])
            }
        });
        DynamicImage::ImageRgb8(image)
    }

    fn distinct_values(image: &DynamicImage) -> BTreeSet<u8> {
        image.to_luma8().pixels().map(|p| p.0[0]).collect()
    }

    #[test]
    fn none_passes_through() {
        let image = sample_image();
        assert_eq!(prepare(image.clone(), PreprocessMode::None), image);
    }

    #[test]
    fn prepare_is_deterministic() {
        for mode in [
            PreprocessMode::None,
            PreprocessMode::Threshold,
            PreprocessMode::Blur,
        ] {
            let first = prepare(sample_image(), mode);
            let second = prepare(sample_image(), mode);
            assert_eq!(first, second, "mode {mode} was not deterministic");
        }
    }

    #[test]
    fn threshold_yields_two_values() {
        let output = prepare(sample_image(), PreprocessMode::Threshold);
        assert!(matches!(output, DynamicImage::ImageLuma8(_)));
        let values = distinct_values(&output);
        assert_eq!(values, BTreeSet::from([0, 255]));
    }

    #[test]
    fn blur_removes_isolated_speckles() {
        let mut gray = GrayImage::from_pixel(5, 5, Luma([100]));
        gray.put_pixel(2, 2, Luma([255]));
        let output = prepare(DynamicImage::ImageLuma8(gray), PreprocessMode::Blur);
        assert_eq!(distinct_values(&output), BTreeSet::from([100]));
    }

    #[test]
    fn blur_converts_to_grayscale() {
        let output = prepare(sample_image(), PreprocessMode::Blur);
        assert!(matches!(output, DynamicImage::ImageLuma8(_)));
        assert_eq!((output.width(), output.height()), (64, 16));
    }

    #[test]
    fn decoding_missing_file_is_input_not_found() {
        let err = decode_image(Path::new("does/not/exist.png")).unwrap_err();
        assert!(matches!(err, OcrError::InputNotFound(_)));
    }

    #[test]
    fn decoding_garbage_is_a_decode_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        let err = decode_image(&path).unwrap_err();
        assert!(matches!(err, OcrError::Decode { .. }));
        assert_eq!(err.kind(), ErrorKind::Input);

        let err = decode_bytes(b"nope", "buffer").unwrap_err();
        assert!(matches!(err, OcrError::Decode { .. }));
    }

    #[test]
    fn modes_parse_from_cli_names() {
        assert_eq!(
            PreprocessMode::from_str("thresh", false).unwrap(),
            PreprocessMode::Threshold
        );
        assert_eq!(
            PreprocessMode::from_str("blur", false).unwrap(),
            PreprocessMode::Blur
        );
        assert!(PreprocessMode::from_str("sharpen", false).is_err());
    }
}
