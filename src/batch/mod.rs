//! OCR every image in a folder.
//!
//! Each file runs through its own pipeline (decode, preprocess, recognize,
//! save), either one at a time or with up to `max_workers` files in flight.
//! Files never share state, except for the optional combined output file,
//! which serializes its own appends. A failing file is logged, recorded in the
//! [`BatchReport`], and otherwise ignored.

pub mod combined;
pub mod discover;
pub mod report;

use std::{sync::Arc, time::Instant};

use futures::{FutureExt as _, StreamExt as _, stream};
use tokio_util::sync::CancellationToken;

use crate::{
    async_utils::{BoxedFuture, BoxedStream},
    preprocess::PreprocessMode,
    prelude::*,
    session::Recognizer,
    ui::{ProgressConfig, Ui},
    writer::{WriteMode, local_now, write_text},
};

use self::{
    combined::CombinedOutput,
    discover::{DEFAULT_EXTENSIONS, discover_images, output_file_names},
    report::{BatchReport, FileOutcome},
};

/// Where batch results go when the caller doesn't choose.
pub const DEFAULT_OUTPUT_DIR: &str = "ocr_results";

/// Settings for a folder batch.
#[derive(Clone, Debug)]
pub struct BatchOptions {
    /// Folder to search for images. Not searched recursively.
    pub input_folder: PathBuf,

    /// Folder for `.txt` outputs. Created if needed.
    pub output_folder: PathBuf,

    /// Preprocessing applied to every image.
    pub preprocess: PreprocessMode,

    /// File extensions to process, without leading dots. Case-insensitive.
    pub extensions: Vec<String>,

    /// Process several files at once?
    pub parallel: bool,

    /// Maximum number of files in flight when `parallel` is set.
    pub max_workers: usize,

    /// Also write every result into one combined file?
    pub combine: bool,
}

impl BatchOptions {
    /// Default options for processing `input_folder`.
    pub fn new(input_folder: impl Into<PathBuf>) -> Self {
        Self {
            input_folder: input_folder.into(),
            output_folder: PathBuf::from(DEFAULT_OUTPUT_DIR),
            preprocess: PreprocessMode::None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|&ext| ext.to_owned()).collect(),
            parallel: true,
            max_workers: num_cpus::get(),
            combine: false,
        }
    }

    /// How many files may be in flight at once.
    fn concurrency(&self) -> usize {
        if self.parallel {
            self.max_workers.max(1)
        } else {
            1
        }
    }
}

/// Everything a single file's pipeline needs. Shared by all tasks.
struct FileJob {
    recognizer: Recognizer,
    preprocess: PreprocessMode,
    combined: Option<Arc<CombinedOutput>>,
    cancel: CancellationToken,
}

impl FileJob {
    /// Process `input` into `output`, converting any failure into a
    /// [`FileOutcome`].
    async fn run(self: Arc<Self>, input: PathBuf, output: PathBuf) -> FileOutcome {
        // Checked when the task is first polled, which is when it gets a slot.
        if self.cancel.is_cancelled() {
            debug!(path = %input.display(), "Batch cancelled, skipping file");
            return FileOutcome::Skipped { input };
        }
        match self.run_inner(&input, &output).await {
            Ok(()) => FileOutcome::Saved { input, output },
            Err(err) => {
                warn!(
                    path = %input.display(),
                    error = %err,
                    "Error processing file; skipping it"
                );
                FileOutcome::failed(input, err)
            }
        }
    }

    #[instrument(level = "debug", skip_all, fields(path = %input.display()))]
    async fn run_inner(&self, input: &Path, output: &Path) -> OcrResult<()> {
        let file_name = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| OcrError::InputNotFound(input.to_owned()))?;
        info!("Processing: {}", file_name);

        let extraction = self.recognizer.recognize_file(input, self.preprocess).await?;
        write_text(output, &extraction.text, WriteMode::Overwrite).await?;

        // The per-file output exists now, so this file counts as saved even if
        // the combined file can't take it.
        if let Some(combined) = &self.combined {
            if let Err(err) = combined.append_section(&file_name, &extraction.text).await {
                warn!(
                    path = %input.display(),
                    combined = %combined.path().display(),
                    error = %err,
                    "Saved text, but could not add it to the combined file"
                );
            }
        }
        Ok(())
    }
}

/// OCR every matching image in `options.input_folder`.
///
/// Only a missing input folder or an unwritable output folder fails the whole
/// batch. Per-file problems end up in the report. If nothing matches, no
/// combined file is created, even when `options.combine` is set.
///
/// Cancelling `cancel` stops new files from starting. Files already in flight
/// finish normally, so the combined file never contains partial sections.
#[instrument(level = "debug", skip_all, fields(input = %options.input_folder.display()))]
pub async fn process_folder(
    ui: &Ui,
    options: &BatchOptions,
    recognizer: Recognizer,
    cancel: CancellationToken,
) -> OcrResult<BatchReport> {
    let start = Instant::now();

    tokio::fs::create_dir_all(&options.output_folder)
        .await
        .map_err(OcrError::io(&options.output_folder))?;

    let files = discover_images(&options.input_folder, &options.extensions).await?;
    if files.is_empty() {
        info!(
            folder = %options.input_folder.display(),
            "No image files found"
        );
        return Ok(BatchReport {
            elapsed: start.elapsed(),
            ..BatchReport::default()
        });
    }
    info!(
        count = files.len(),
        language = recognizer.language(),
        preprocess = %options.preprocess,
        "Found image files. Processing..."
    );

    let combined = if options.combine {
        let combined =
            CombinedOutput::create(&options.output_folder, files.len(), &local_now()).await?;
        Some(Arc::new(combined))
    } else {
        None
    };

    let outputs = output_file_names(&files)
        .into_iter()
        .map(|name| options.output_folder.join(name));
    let work = files.into_iter().zip(outputs).collect::<Vec<_>>();

    let job = Arc::new(FileJob {
        recognizer,
        preprocess: options.preprocess,
        combined: combined.clone(),
        cancel,
    });

    let pb = ui.new_progress_bar(
        &ProgressConfig {
            emoji: "🔎",
            msg: "OCRing images",
            done_msg: "OCRed images",
        },
        work.len() as u64,
    );

    let tasks: BoxedStream<BoxedFuture<FileOutcome>> = stream::iter(work)
        .map(move |(input, output)| job.clone().run(input, output).boxed())
        .boxed();
    let outcomes: BoxedStream<FileOutcome> = if options.parallel {
        tasks.buffer_unordered(options.concurrency()).boxed()
    } else {
        tasks.buffered(1).boxed()
    };
    let outcomes = pb.wrap_stream(outcomes).collect::<Vec<_>>().await;

    let report = BatchReport {
        outcomes,
        combined: combined.map(|combined| combined.path().to_owned()),
        elapsed: start.elapsed(),
    };
    info!(
        outputs = report.output_count(),
        failures = report.failures().count(),
        skipped = report.skipped_count(),
        "Processing complete! Processed {} files in {:.2} seconds",
        report.output_count(),
        report.elapsed.as_secs_f64(),
    );
    info!("Results saved to: {}", options.output_folder.display());
    Ok(report)
}
