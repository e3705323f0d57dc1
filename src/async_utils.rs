//! Asynchronous utilities for use with Tokio.
//!
//! Everything in the pipeline is either a blocking CPU-bound step (decoding,
//! filtering), an external process, or file I/O. This module holds the glue
//! that lets those run on the Tokio runtime without stalling it.

use std::{pin::Pin, process::Output, sync::LazyLock};

use futures::Stream;
use regex::Regex;

use crate::prelude::*;

/// A type alias for a boxed future. This is used to make it easier to work with
/// with complex futures.
pub type BoxedFuture<Output> = Pin<Box<dyn Future<Output = Output> + Send>>;

/// A type alias for a boxed stream. This is used to make it easier to work
/// streams that return complex types.
pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;

/// Wrapper around [`tokio::task::spawn_blocking`] that propagates panics from
/// the background task.
pub async fn spawn_blocking_propagating_panics<F, T>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => value,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => panic!("blocking task did not complete: {err}"),
    }
}

/// Matches Tesseract's complaints about missing or unknown language data.
static LANGUAGE_ERROR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)failed loading language|error opening data file|couldn't load any languages|could not initialize tesseract",
    )
    .expect("failed to compile regex")
});

/// Report any command failures, and include any error output.
///
/// Standard output and standard error are logged at debug level on success.
/// On failure, standard error decides whether we blame our configuration or
/// the engine itself.
pub fn check_for_command_failure(command_name: &str, output: &Output) -> OcrResult<()> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(
        command_name = command_name,
        output = %stdout,
        "Standard output from command"
    );

    if output.status.success() {
        debug!(
            command_name = command_name,
            output = %stderr,
            "Standard error from command",
        );
        Ok(())
    } else {
        warn!(
            command_name = command_name,
            output = %stderr,
            "Standard error from failed command",
        );
        Err(command_failure(command_name, output.status.code(), &stderr))
    }
}

/// Build the error for a failed command from its exit code and error output.
pub fn command_failure(command_name: &str, exit_code: Option<i32>, stderr: &str) -> OcrError {
    let stderr = stderr.trim();
    if LANGUAGE_ERROR_REGEX.is_match(stderr) {
        OcrError::InvalidConfiguration(format!("{command_name}: {stderr}"))
    } else if let Some(exit_code) = exit_code {
        OcrError::EngineFailed(format!(
            "{command_name} failed with exit code {exit_code} and error output:\n{stderr}"
        ))
    } else {
        OcrError::EngineFailed(format!(
            "{command_name} failed with error output:\n{stderr}"
        ))
    }
}
