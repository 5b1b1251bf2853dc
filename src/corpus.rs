//! Corpus loader: walks a directory of `.md` files into an in-memory
//! corpus of notes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::codec::{self, Header};

#[derive(Debug, Clone)]
pub struct Note {
    pub name: String,
    pub path: PathBuf,
    pub header: Header,
    pub body: String,
}

pub type Corpus = HashMap<String, Note>;

/// Recursively load every `.md` file under `docs_dir` into a corpus keyed
/// by file stem. A missing directory is non-fatal: an empty corpus is
/// returned and a warning logged. Header parse failures downgrade that
/// note to an empty header (still loaded) rather than dropping it.
/// Duplicate DocNames across subdirectories are last-loaded-wins by
/// `WalkDir`'s iteration order, with a warning.
pub fn load_corpus(docs_dir: &Path) -> Corpus {
    let mut corpus = Corpus::new();

    if !docs_dir.exists() {
        log::warn!("{}", crate::error::AssocMemError::CorpusMissing(docs_dir.to_path_buf()));
        return corpus;
    }

    for entry in WalkDir::new(docs_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let is_markdown = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("md"))
            .unwrap_or(false);
        if !is_markdown {
            continue;
        }

        let Some(name) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };

        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("failed to read {}: {e}", path.display());
                continue;
            }
        };

        let (header, body, parse_err) = codec::parse(&text);
        if let Some(source) = parse_err {
            let err = crate::error::AssocMemError::NoteParseWarning {
                path: path.to_path_buf(),
                source,
            };
            log::warn!("{err} - loading with empty header");
        }

        if let Some(previous) = corpus.get(&name) {
            log::warn!(
                "duplicate DocName {name:?}: {} overrides {}",
                path.display(),
                previous.path.display()
            );
        }

        corpus.insert(
            name.clone(),
            Note {
                name,
                path: path.to_path_buf(),
                header,
                body,
            },
        );
    }

    corpus
}
