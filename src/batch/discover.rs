//! Finding the images in a folder, and naming their outputs.

use std::collections::{HashMap, HashSet};

use tokio::fs;

use crate::{prelude::*, session::source_name_for};

/// Extensions we process when the caller doesn't choose.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Normalize user-supplied extensions: strip leading dots, lower-case, and
/// drop empty entries.
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// Does `path` end in one of `extensions`? Case-insensitive.
fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// List the files directly inside `folder` whose extension is in
/// `extensions`. Subdirectories are not searched. Results are sorted by path.
#[instrument(level = "debug", skip(extensions), fields(folder = %folder.display()))]
pub async fn discover_images(folder: &Path, extensions: &[String]) -> OcrResult<Vec<PathBuf>> {
    let is_dir = fs::metadata(folder)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(OcrError::InputNotFound(folder.to_owned()));
    }

    let extensions = normalize_extensions(extensions);
    let mut entries = fs::read_dir(folder).await.map_err(OcrError::io(folder))?;
    let mut images = vec![];
    while let Some(entry) = entries.next_entry().await.map_err(OcrError::io(folder))? {
        let path = entry.path();
        if !has_extension(&path, &extensions) {
            continue;
        }
        // Follow symlinks, so a link to an image counts as an image.
        let is_file = fs::metadata(&path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        if is_file {
            images.push(path);
        } else {
            trace!(path = %path.display(), "Skipping non-file");
        }
    }
    images.sort();
    debug!(count = images.len(), "Discovered images");
    Ok(images)
}

/// Pick a distinct `.txt` file name for each of `files`, in order.
///
/// A file normally gets `<stem>.txt`. Files sharing a stem get
/// `<file-name>.txt` instead, so `a.png` and `a.jpg` become `a.png.txt` and
/// `a.jpg.txt`. Anything still taken gets a numeric suffix. Names are compared
/// case-insensitively, since some filesystems do.
pub fn output_file_names(files: &[PathBuf]) -> Vec<String> {
    let stems = files
        .iter()
        .map(|file| source_name_for(file))
        .collect::<Vec<_>>();
    let mut stem_counts = HashMap::<String, usize>::new();
    for stem in &stems {
        *stem_counts.entry(stem.to_lowercase()).or_default() += 1;
    }

    let mut taken = HashSet::new();
    files
        .iter()
        .zip(&stems)
        .map(|(file, stem)| {
            let shared = stem_counts.get(&stem.to_lowercase()).copied().unwrap_or(0) > 1;
            let base = match file.file_name() {
                Some(file_name) if shared => file_name.to_string_lossy().into_owned(),
                _ => stem.clone(),
            };
            let mut name = format!("{base}.txt");
            let mut suffix = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{base}_{suffix}.txt");
                suffix += 1;
            }
            if shared {
                debug!(
                    path = %file.display(),
                    output = %name,
                    "Renamed output to avoid a collision"
                );
            }
            name
        })
        .collect()
}
