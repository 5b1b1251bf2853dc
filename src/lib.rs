//! Associative memory retriever over a corpus of linked markdown notes.
//!
//! Loads a directory of notes into a directed weighted graph (declared
//! header links plus inline wikilinks), builds a BM25 index over note
//! bodies, and answers queries with a hybrid lexical + spreading
//! activation ranking. A maintenance pipeline evolves the graph overnight:
//! proposing new links for isolated notes, forgetting weak ones, and
//! renormalising per-note weights.

pub mod associator;
pub mod bm25;
pub mod codec;
pub mod config;
pub mod corpus;
pub mod error;
pub mod graph;
pub mod maintenance;
pub mod retriever;
pub mod tokenizer;

use std::path::Path;

pub use associator::{Associator, HttpAssociator, StubAssociator};
pub use bm25::Bm25Index;
pub use config::AssocMemConfig;
pub use corpus::{Corpus, Note};
pub use error::{AssocMemError, Result};
pub use graph::Graph;
pub use maintenance::{run_batch_process, MaintenanceReport};
pub use retriever::{retrieve, RetrieveParams};

const NO_RESULTS_SENTINEL: &str = "No relevant context was found.";
const TRUNCATION_SUFFIX: &str = "\n... (truncated: context limit reached)";
const RETRIEVE_CONTEXT_TOP_K: usize = 5;
const DEFAULT_MAX_LENGTH: usize = 4096;

/// One loaded snapshot: corpus, graph, and BM25 index built together so a
/// query always runs against a single consistent view.
pub struct Index {
    pub corpus: Corpus,
    pub graph: Graph,
    pub bm25: Bm25Index,
}

impl Index {
    pub fn build(docs_dir: &Path) -> Self {
        let corpus = corpus::load_corpus(docs_dir);
        let graph = graph::build_graph(&corpus);
        let bm25 = Bm25Index::build(&corpus);
        Self { corpus, graph, bm25 }
    }
}

/// Retrieve the top-5 notes for `keyword` and concatenate them into a
/// single context string, each prefixed with a `--- Document: ... ---`
/// header, stopping before `max_length` characters. Total: never panics
/// or propagates an error to the caller.
pub fn retrieve_context(index: &Index, keyword: &str, max_length: usize) -> String {
    let params = RetrieveParams {
        top_k: RETRIEVE_CONTEXT_TOP_K,
        ..RetrieveParams::default()
    };
    let results = retriever::retrieve(&index.corpus, &index.graph, &index.bm25, keyword, &params);
    if results.is_empty() {
        return NO_RESULTS_SENTINEL.to_string();
    }

    let mut context = String::new();
    let mut current_length = 0usize;

    for (name, score) in &results {
        let Some(note) = index.corpus.get(name) else {
            continue;
        };
        let header = format!("\n\n--- Document: {name} (Score: {score:.3}) ---\n\n");
        let header_len = header.chars().count();
        let text_len = note.body.chars().count();

        if current_length + header_len >= max_length {
            break;
        }

        if current_length + header_len + text_len > max_length {
            let allowed = max_length.saturating_sub(current_length + header_len);
            if allowed > 0 {
                let truncated: String = note.body.chars().take(allowed).collect();
                context.push_str(&header);
                context.push_str(&truncated);
                context.push_str(TRUNCATION_SUFFIX);
            }
            break;
        }

        context.push_str(&header);
        context.push_str(&note.body);
        current_length += header_len + text_len;
    }

    context.trim().to_string()
}
