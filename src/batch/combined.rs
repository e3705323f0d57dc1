//! The combined output file, which collects every result from a batch.

use chrono::NaiveDateTime;
use tokio::{fs::File, io::AsyncWriteExt as _, sync::Mutex};

use crate::{prelude::*, writer::file_timestamp};

/// Header written at the top of a combined file.
pub fn format_header(image_count: usize, now: &NaiveDateTime) -> String {
    format!(
        "OCR Results - Processed {} images\nDate: {}\n\n",
        image_count,
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// One labeled section of a combined file.
pub fn format_section(file_name: &str, text: &str) -> String {
    format!("--- {file_name} ---\n{text}\n\n")
}

/// A combined output file shared by all the tasks in a batch.
///
/// Sections are appended while holding a lock on the file, so concurrent
/// tasks never interleave their output.
pub struct CombinedOutput {
    path: PathBuf,
    file: Mutex<File>,
}

impl CombinedOutput {
    /// Create (or truncate) `combined_results_<timestamp>.txt` in
    /// `output_folder` and write the header.
    #[instrument(level = "debug", skip(now), fields(folder = %output_folder.display()))]
    pub async fn create(
        output_folder: &Path,
        image_count: usize,
        now: &NaiveDateTime,
    ) -> OcrResult<Self> {
        let path =
            output_folder.join(format!("combined_results_{}.txt", file_timestamp(now)));
        let mut file = File::create(&path).await.map_err(OcrError::io(&path))?;
        file.write_all(format_header(image_count, now).as_bytes())
            .await
            .map_err(OcrError::io(&path))?;
        file.flush().await.map_err(OcrError::io(&path))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Wrap an already-open file, without writing a header.
    #[cfg(test)]
    pub fn from_open_file(path: PathBuf, file: File) -> Self {
        Self {
            path,
            file: Mutex::new(file),
        }
    }

    /// Where the combined output lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a section for `file_name`.
    pub async fn append_section(&self, file_name: &str, text: &str) -> OcrResult<()> {
        let section = format_section(file_name, text);
        let mut file = self.file.lock().await;
        file.write_all(section.as_bytes())
            .await
            .map_err(OcrError::io(&self.path))?;
        file.flush().await.map_err(OcrError::io(&self.path))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use futures::future::join_all;

    use super::*;

    fn sample_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 30)
            .unwrap()
            .and_hms_opt(23, 59, 1)
            .unwrap()
    }

    #[test]
    fn header_and_section_format() {
        assert_eq!(
            format_header(2, &sample_time()),
            "OCR Results - Processed 2 images\nDate: 2025-06-30 23:59:01\n\n"
        );
        assert_eq!(format_section("x.png", "HELLO"), "--- x.png ---\nHELLO\n\n");
    }

    #[tokio::test]
    async fn concurrent_appends_do_not_interleave() {
        let dir = tempfile::TempDir::new().unwrap();
        let combined = Arc::new(
            CombinedOutput::create(dir.path(), 20, &sample_time())
                .await
                .unwrap(),
        );
        assert!(
            combined
                .path()
                .ends_with("combined_results_20250630_235901.txt")
        );

        let text_for = |i: usize| format!("line {i}\n").repeat(200);
        let tasks = (0..20).map(|i| {
            let combined = combined.clone();
            let text = text_for(i);
            tokio::spawn(async move {
                combined
                    .append_section(&format!("{i}.png"), &text)
                    .await
                    .unwrap();
            })
        });
        for result in join_all(tasks).await {
            result.unwrap();
        }

        let contents = std::fs::read_to_string(combined.path()).unwrap();
        let body = contents
            .strip_prefix(&format_header(20, &sample_time()))
            .unwrap();
        let mut expected_len = 0;
        for i in 0..20 {
            let section = format_section(&format!("{i}.png"), &text_for(i));
            assert!(body.contains(&section), "section {i} is damaged");
            expected_len += section.len();
        }
        assert_eq!(body.len(), expected_len);
    }
}
