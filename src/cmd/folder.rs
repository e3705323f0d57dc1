//! The `folder` subcommand.

use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::{
    batch::{BatchOptions, DEFAULT_OUTPUT_DIR, discover::DEFAULT_EXTENSIONS, process_folder},
    preprocess::PreprocessMode,
    prelude::*,
    ui::Ui,
};

use super::EngineOpts;

/// Options for the `folder` subcommand.
#[derive(Debug, Args)]
pub struct FolderOpts {
    /// Folder containing the images to OCR. Subfolders are ignored.
    pub input_folder: PathBuf,

    /// Folder to write `.txt` results into.
    #[clap(short = 'o', long = "out", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_folder: PathBuf,

    /// Preprocessing to apply before OCR.
    #[clap(short = 'p', long, value_enum, default_value = "none")]
    pub preprocess: PreprocessMode,

    /// Image extensions to process. May be repeated or comma-separated.
    #[clap(long = "ext", value_delimiter = ',', default_values = DEFAULT_EXTENSIONS.iter().copied())]
    pub extensions: Vec<String>,

    /// Process one file at a time, in name order.
    #[clap(long)]
    pub sequential: bool,

    /// Max number of files to process at a time. Defaults to the number of
    /// CPUs.
    #[clap(short = 'j', long = "jobs")]
    pub job_count: Option<usize>,

    /// Also write all results to one `combined_results_<timestamp>.txt`.
    #[clap(long)]
    pub combine: bool,

    /// Write a JSONL report with one line per input file.
    #[clap(long)]
    pub report: Option<PathBuf>,

    #[clap(flatten)]
    pub engine_opts: EngineOpts,
}

impl FolderOpts {
    /// Convert to [`BatchOptions`].
    fn to_batch_options(&self) -> BatchOptions {
        let mut options = BatchOptions::new(&self.input_folder);
        options.output_folder = self.output_folder.clone();
        options.preprocess = self.preprocess;
        options.extensions = self.extensions.clone();
        options.parallel = !self.sequential;
        if let Some(job_count) = self.job_count {
            options.max_workers = job_count;
        }
        options.combine = self.combine;
        options
    }
}

/// The `folder` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_folder(ui: Ui, opts: &FolderOpts) -> Result<()> {
    let options = opts.to_batch_options();

    // Stop starting new files on Ctrl-C, but let running ones finish.
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing files already in progress");
            ctrl_c_cancel.cancel();
        }
    });

    let report = process_folder(&ui, &options, opts.engine_opts.recognizer(), cancel)
        .await
        .with_context(|| format!("Failed to process folder {:?}", options.input_folder))?;

    if let Some(report_path) = &opts.report {
        report.write_jsonl(report_path).await?;
    }

    let failures = report.failures().collect::<Vec<_>>();
    if !failures.is_empty() {
        ui.display_message(
            "❌",
            &format!("{} files could not be processed:", failures.len()),
        );
        for failure in failures {
            ui.display_message("", &format!("   {}", failure.input().display()));
        }
    }
    let skipped = report.skipped_count();
    if skipped > 0 {
        ui.display_message("⏹️", &format!("{} files skipped after interrupt", skipped));
    }
    ui.display_message(
        "⏱️",
        &format!(
            "Finished {} files in {:.2} seconds",
            report.outcomes.len(),
            report.elapsed.as_secs_f64()
        ),
    );
    println!("Created {} output files", report.output_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[clap(flatten)]
        folder: FolderOpts,
    }

    #[test]
    fn defaults_match_batch_defaults() {
        let cli = TestCli::try_parse_from(["test", "images"]).unwrap();
        let options = cli.folder.to_batch_options();
        let defaults = BatchOptions::new("images");
        assert_eq!(options.input_folder, defaults.input_folder);
        assert_eq!(options.output_folder, defaults.output_folder);
        assert_eq!(options.extensions, defaults.extensions);
        assert_eq!(options.max_workers, defaults.max_workers);
        assert!(options.parallel);
        assert!(!options.combine);
    }

    #[test]
    fn parses_batch_flags() {
        let cli = TestCli::try_parse_from([
            "test",
            "images",
            "-o",
            "out",
            "--preprocess",
            "thresh",
            "--ext",
            "png,tif",
            "--sequential",
            "-j",
            "3",
            "--combine",
            "--lang",
            "deu",
        ])
        .unwrap();
        let options = cli.folder.to_batch_options();
        assert_eq!(options.output_folder, Path::new("out"));
        assert_eq!(options.preprocess, PreprocessMode::Threshold);
        assert_eq!(options.extensions, vec!["png", "tif"]);
        assert!(!options.parallel);
        assert_eq!(options.max_workers, 3);
        assert!(options.combine);
        assert_eq!(cli.folder.engine_opts.language, "deu");
    }
}
