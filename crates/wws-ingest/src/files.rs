//! Saved response pages on disk.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IngestError, Result};

/// Lists all XML files in a directory, sorted by file name.
pub fn list_response_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| IngestError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let is_xml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if is_xml {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Replaces each directory in `inputs` with the XML files it contains.
///
/// Files are kept in the order given.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(list_response_files(input)?);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Reads every file into memory, in order.
pub fn read_documents(paths: &[PathBuf]) -> Result<Vec<Vec<u8>>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).map_err(|e| IngestError::io(path, e))?;
            debug!(path = %path.display(), bytes = bytes.len(), "read response");
            Ok(bytes)
        })
        .collect()
}

/// Writes fetched pages as `page_0001.xml`, `page_0002.xml`, … under `dir`.
pub fn write_pages(dir: &Path, pages: &[Vec<u8>]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| IngestError::io(dir, e))?;
    pages
        .iter()
        .enumerate()
        .map(|(index, body)| {
            let path = dir.join(format!("page_{:04}.xml", index + 1));
            std::fs::write(&path, body).map_err(|e| IngestError::io(&path, e))?;
            Ok(path)
        })
        .collect()
}
