//! The `image` subcommand.

use clap::Args;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

use crate::{
    async_utils::spawn_blocking_propagating_panics,
    preprocess::{PreprocessMode, decode_bytes},
    prelude::*,
    session::OcrSession,
    writer::{DEFAULT_RESULTS_DIR, WriteMode},
};

use super::EngineOpts;

/// Source name for images read from standard input.
const STDIN_SOURCE_NAME: &str = "stdin";

/// Options for the `image` subcommand.
#[derive(Debug, Args)]
pub struct ImageOpts {
    /// The image to OCR. Use `-` to read an encoded image from standard input.
    pub input_path: PathBuf,

    /// Where to write the text. Defaults to
    /// `<results-dir>/<name>_<timestamp>.txt`.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,

    /// Append to the output file instead of replacing it.
    #[clap(long)]
    pub append: bool,

    /// Preprocessing to apply before OCR.
    #[clap(short = 'p', long, value_enum, default_value = "none")]
    pub preprocess: PreprocessMode,

    /// Directory for automatically named output files.
    #[clap(long, default_value = DEFAULT_RESULTS_DIR)]
    pub results_dir: PathBuf,

    /// Also print the extracted text to standard output.
    #[clap(long)]
    pub print: bool,

    #[clap(flatten)]
    pub engine_opts: EngineOpts,
}

/// The `image` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_image(opts: &ImageOpts) -> Result<()> {
    let mut session =
        OcrSession::new(opts.engine_opts.recognizer()).with_results_dir(&opts.results_dir);

    if opts.input_path == Path::new("-") {
        let mut data = vec![];
        tokio::io::stdin()
            .read_to_end(&mut data)
            .await
            .context("Failed to read image from stdin")?;
        let image =
            spawn_blocking_propagating_panics(move || decode_bytes(&data, STDIN_SOURCE_NAME))
                .await?;
        session
            .extract_text_from_image(image, opts.preprocess, Some(STDIN_SOURCE_NAME))
            .await?;
    } else {
        session
            .extract_text(&opts.input_path, opts.preprocess)
            .await
            .with_context(|| format!("Failed to OCR {:?}", opts.input_path))?;
    }

    let saved = session
        .save(opts.output_path.as_deref(), WriteMode::from_append(opts.append))
        .await?;

    let mut stdout = tokio::io::stdout();
    if opts.print {
        stdout
            .write_all(session.text()?.as_bytes())
            .await
            .context("Failed to write text to stdout")?;
    } else {
        stdout
            .write_all(format!("Text saved to: {}\n", saved.display()).as_bytes())
            .await
            .context("Failed to write to stdout")?;
    }
    stdout.flush().await.context("Failed to flush stdout")?;
    Ok(())
}
