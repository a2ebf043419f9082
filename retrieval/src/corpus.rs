//! Text-folder corpus source.

use crate::error::Result;
use crate::index::DocumentId;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Read every `*.txt` file directly inside `dir`, keyed by file name.
///
/// A missing folder is an empty corpus. Files that cannot be read as UTF-8
/// text are skipped with a warning.
pub fn load_text_dir<P: AsRef<Path>>(dir: P) -> Result<BTreeMap<DocumentId, String>> {
    let dir = dir.as_ref();
    let mut corpus = BTreeMap::new();
    if !dir.is_dir() {
        warn!(path = %dir.display(), "corpus folder not found");
        return Ok(corpus);
    }

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            // the folder itself could not be listed
            Err(e) if e.depth() == 0 => return Err(io::Error::from(e).into()),
            Err(e) => {
                warn!(error = %e, "skipping corpus entry");
                continue;
            }
        };
        let p = entry.path();
        if !p.is_file() || p.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }
        let Some(name) = p.file_name().and_then(|s| s.to_str()) else {
            warn!(path = %p.display(), "skipping file with non UTF-8 name");
            continue;
        };
        let doc_id = match DocumentId::new(name) {
            Ok(id) => id,
            Err(e) => {
                warn!(path = %p.display(), error = %e, "skipping file");
                continue;
            }
        };
        match fs::read_to_string(p) {
            Ok(text) => {
                corpus.insert(doc_id, text);
            }
            Err(e) => warn!(path = %p.display(), error = %e, "skipping unreadable file"),
        }
    }

    info!(path = %dir.display(), num_docs = corpus.len(), "corpus read");
    Ok(corpus)
}
