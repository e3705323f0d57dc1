//! Writing extracted text to disk.

use chrono::NaiveDateTime;
use tokio::{fs, io::AsyncWriteExt as _};

use crate::prelude::*;

/// Where single-image results go when no output path is given.
pub const DEFAULT_RESULTS_DIR: &str = "ocr_results";

/// How to treat an existing output file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate the file, then write.
    #[default]
    Overwrite,
    /// Add to the end of the file, creating it if needed.
    Append,
}

impl WriteMode {
    /// Convert from an `append` flag.
    pub fn from_append(append: bool) -> Self {
        if append {
            WriteMode::Append
        } else {
            WriteMode::Overwrite
        }
    }
}

/// Format a timestamp for use in file names. Sorts correctly and contains
/// nothing a filesystem will object to.
pub fn file_timestamp(now: &NaiveDateTime) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// The current local time, for timestamps.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Build `<results_dir>/<source_name>_<timestamp>.txt`.
pub fn default_output_path(
    results_dir: &Path,
    source_name: &str,
    now: &NaiveDateTime,
) -> PathBuf {
    results_dir.join(format!("{}_{}.txt", source_name, file_timestamp(now)))
}

/// Write `text` to `path` as UTF-8.
#[instrument(level = "debug", skip(text), fields(path = %path.display()))]
pub async fn write_text(path: &Path, text: &str, mode: WriteMode) -> OcrResult<()> {
    let mut options = fs::OpenOptions::new();
    match mode {
        WriteMode::Overwrite => options.write(true).create(true).truncate(true),
        WriteMode::Append => options.append(true).create(true),
    };
    let mut file = options.open(path).await.map_err(OcrError::io(path))?;
    file.write_all(text.as_bytes())
        .await
        .map_err(OcrError::io(path))?;
    file.flush().await.map_err(OcrError::io(path))?;
    Ok(())
}

/// Save `text`, generating a file name under `results_dir` if `path` is
/// `None`. Returns the path actually written.
pub async fn save_text(
    text: &str,
    path: Option<&Path>,
    mode: WriteMode,
    results_dir: &Path,
    source_name: &str,
) -> OcrResult<PathBuf> {
    let path = match path {
        Some(path) => path.to_owned(),
        None => {
            fs::create_dir_all(results_dir)
                .await
                .map_err(OcrError::io(results_dir))?;
            default_output_path(results_dir, source_name, &local_now())
        }
    };
    write_text(&path, text, mode).await?;
    info!(path = %path.display(), "Text saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn sample_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    #[test]
    fn timestamps_are_sortable() {
        assert_eq!(file_timestamp(&sample_time()), "20240102_030405");
    }

    #[test]
    fn default_path_uses_source_name_and_timestamp() {
        let path = default_output_path(Path::new("results"), "scan", &sample_time());
        assert_eq!(path, Path::new("results/scan_20240102_030405.txt"));
    }

    #[tokio::test]
    async fn overwrite_keeps_only_last_text() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        write_text(&path, "first", WriteMode::Overwrite).await.unwrap();
        write_text(&path, "second", WriteMode::Overwrite).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[tokio::test]
    async fn append_concatenates_in_call_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        write_text(&path, "one\n", WriteMode::Append).await.unwrap();
        write_text(&path, "two\n", WriteMode::Append).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[tokio::test]
    async fn save_without_path_creates_results_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let results_dir = dir.path().join("nested").join("results");
        let path = save_text("héllo", None, WriteMode::Overwrite, &results_dir, "page")
            .await
            .unwrap();
        assert_eq!(path.parent().unwrap(), results_dir);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("page_"), "bad name {name}");
        assert!(name.ends_with(".txt"), "bad name {name}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "héllo");
    }

    #[tokio::test]
    async fn write_into_missing_dir_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        let err = write_text(&path, "x", WriteMode::Overwrite).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
