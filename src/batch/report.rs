//! What happened to each file in a batch.

use std::time::Duration;

use serde::Serialize;
use tokio::{
    fs::File,
    io::{AsyncWriteExt as _, BufWriter},
};

use crate::prelude::*;

/// The outcome of processing one input file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Text was extracted and saved to `output`.
    Saved { input: PathBuf, output: PathBuf },

    /// Processing failed. The file has no output.
    Failed {
        input: PathBuf,
        kind: ErrorKind,
        error: String,
    },

    /// The batch was cancelled before this file was started.
    Skipped { input: PathBuf },
}

impl FileOutcome {
    /// Record a failure, keeping the full error chain as text.
    pub fn failed(input: PathBuf, err: OcrError) -> Self {
        let kind = err.kind();
        let error = format!("{:#}", anyhow::Error::new(err));
        FileOutcome::Failed { input, kind, error }
    }

    /// The input file.
    pub fn input(&self) -> &Path {
        match self {
            FileOutcome::Saved { input, .. }
            | FileOutcome::Failed { input, .. }
            | FileOutcome::Skipped { input } => input,
        }
    }

    /// The output file, if there is one.
    pub fn output(&self) -> Option<&Path> {
        match self {
            FileOutcome::Saved { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Summary of a whole batch.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    /// One outcome per discovered file. In discovery order for sequential
    /// batches, completion order for concurrent ones.
    pub outcomes: Vec<FileOutcome>,

    /// The combined output file, if one was written.
    pub combined: Option<PathBuf>,

    /// Wall-clock time for the whole batch.
    pub elapsed: Duration,
}

impl BatchReport {
    /// Every output file we produced: per-file outputs, then the combined file.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.output().map(Path::to_owned))
            .chain(self.combined.clone())
            .collect()
    }

    /// How many output files we produced, including the combined file.
    pub fn output_count(&self) -> usize {
        self.output_paths().len()
    }

    /// Outcomes for files which failed.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, FileOutcome::Failed { .. }))
    }

    /// How many files were never started because the batch was cancelled.
    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, FileOutcome::Skipped { .. }))
            .count()
    }

    /// Write one JSON object per outcome to `path`.
    pub async fn write_jsonl(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .await
            .with_context(|| format!("Failed to create file at path: {:?}", path))?;
        let mut writer = BufWriter::new(file);
        for outcome in &self.outcomes {
            let json = serde_json::to_string(outcome)
                .with_context(|| format!("Failed to serialize outcome: {:?}", outcome))?;
            writer
                .write_all(json.as_bytes())
                .await
                .context("Failed to write JSON to report")?;
            writer
                .write_all(b"\n")
                .await
                .context("Failed to write newline to report")?;
        }
        writer.flush().await.context("Failed to flush report")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn sample_report() -> BatchReport {
        BatchReport {
            outcomes: vec![
                FileOutcome::Saved {
                    input: "in/a.png".into(),
                    output: "out/a.txt".into(),
                },
                FileOutcome::failed("in/b.png".into(), OcrError::NothingToSave),
                FileOutcome::Skipped {
                    input: "in/c.png".into(),
                },
            ],
            combined: Some("out/combined_results_20250101_000000.txt".into()),
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn output_paths_list_saved_files_then_combined() {
        let report = sample_report();
        assert_eq!(
            report.output_paths(),
            vec![
                PathBuf::from("out/a.txt"),
                PathBuf::from("out/combined_results_20250101_000000.txt"),
            ]
        );
        assert_eq!(report.output_count(), 2);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.skipped_count(), 1);
    }

    #[tokio::test]
    async fn writes_jsonl_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.jsonl");
        sample_report().write_jsonl(&path).await.unwrap();

        let lines = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            json!({"status": "saved", "input": "in/a.png", "output": "out/a.txt"})
        );
        assert_eq!(lines[1]["status"], "failed");
        assert_eq!(lines[1]["kind"], "state");
        assert_eq!(lines[2], json!({"status": "skipped", "input": "in/c.png"}));
    }
}
