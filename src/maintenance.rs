//! Nightly maintenance pipeline: three ordered phases operating on
//! freshly (re)loaded corpus snapshots.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::associator::Associator;
use crate::codec::{self, Header};
use crate::corpus::{self, Corpus};
use crate::graph;

const FORGETTING_THRESHOLD: f64 = 0.05;
const CONSOLIDATION_TOLERANCE: f64 = 0.01;

/// Plain-text/JSON-printable summary of one maintenance run, mirroring
/// the teacher CLI's `LifecycleReport` convention.
#[derive(Debug, Serialize)]
pub struct MaintenanceReport {
    pub links_added: usize,
    pub links_forgotten: usize,
    pub notes_consolidated: usize,
    pub details: Vec<String>,
}

/// Run association, forgetting, then consolidation, in that strict
/// order, each phase against a freshly reloaded snapshot. Per-note
/// writes are atomic; a failing note is logged and skipped, never aborts
/// the phase.
pub fn run_batch_process(docs_dir: &Path, associator: &dyn Associator) -> MaintenanceReport {
    log::info!("maintenance run starting for {}", docs_dir.display());
    let mut details = Vec::new();

    let (links_added, mutated) = run_association_phase(docs_dir, associator, &mut details);

    if mutated {
        log::info!("links added during association; reloading before forgetting phase");
    }

    let links_forgotten = run_forgetting_phase(docs_dir, &mut details);
    let notes_consolidated = run_consolidation_phase(docs_dir, &mut details);

    log::info!("maintenance run complete");
    MaintenanceReport {
        links_added,
        links_forgotten,
        notes_consolidated,
        details,
    }
}

/// Phase 1 — association: for every note with out-degree 0, ask the
/// Associator about every other note; record a header link and an
/// appended body marker when the score clears 0.5.
fn run_association_phase(
    docs_dir: &Path,
    associator: &dyn Associator,
    details: &mut Vec<String>,
) -> (usize, bool) {
    let mut corpus = corpus::load_corpus(docs_dir);
    let graph = graph::build_graph(&corpus);

    let mut doc_names: Vec<String> = corpus.keys().cloned().collect();
    doc_names.sort();

    let mut links_added = 0usize;
    let mut mutated = false;

    for source in &doc_names {
        if graph.out_degree(source) != 0 {
            continue;
        }
        log::info!("isolated note found: {source} - evaluating association");
        let source_body = corpus[source].body.clone();

        for target in &doc_names {
            if target == source {
                // Identity guard: the outer loop skips the identity pair,
                // so a self-loop can never be proposed here even if the
                // associator would return a high score for (d, d).
                continue;
            }
            let target_body = corpus[target].body.clone();
            let score = associator.associate(source, &source_body, target, &target_body);
            if score < 0.5 {
                continue;
            }
            details.push(format!("{source} -> {target} (score {score:.2})"));
            if persist_new_link(&mut corpus, source, target, score) {
                links_added += 1;
                mutated = true;
            }
        }
    }

    (links_added, mutated)
}

fn persist_new_link(corpus: &mut Corpus, source: &str, target: &str, score: f64) -> bool {
    let note = corpus.get_mut(source).expect("source is a corpus member");
    let mut links = note.header.links();
    links.insert(target.to_string(), score);
    note.header.set_links(&links);

    let marker = format!("[[{target}]]");
    if !note.body.contains(&marker) {
        if !note.body.is_empty() && !note.body.ends_with('\n') {
            note.body.push('\n');
        }
        note.body.push_str(&format!("\n* AI associative link: [[{target}]]\n"));
    }

    match codec::serialize(&note.header, &note.body) {
        Ok(text) => match codec::atomic_write(&note.path, &text) {
            Ok(()) => true,
            Err(io_err) => {
                let err = crate::error::AssocMemError::PersistFailure {
                    path: note.path.clone(),
                    source: io_err,
                };
                log::warn!("{err}");
                false
            }
        },
        Err(e) => {
            log::warn!("failed to serialize header for {source}: {e}");
            false
        }
    }
}

/// Phase 2 — forgetting: drop any header `links` entry below 0.05.
/// Body text is never rewritten here.
fn run_forgetting_phase(docs_dir: &Path, details: &mut Vec<String>) -> usize {
    let corpus = corpus::load_corpus(docs_dir);
    let mut doc_names: Vec<String> = corpus.keys().cloned().collect();
    doc_names.sort();

    let mut links_forgotten = 0usize;
    for name in &doc_names {
        let note = &corpus[name];
        let mut links = note.header.links();
        if links.is_empty() {
            continue;
        }
        let before = links.len();
        links.retain(|_, weight| *weight >= FORGETTING_THRESHOLD);
        let removed = before - links.len();
        if removed == 0 {
            continue;
        }
        links_forgotten += removed;
        details.push(format!("forgot {removed} weak link(s) from {name}"));
        persist_header_links(&note.path, &note.header, &note.body, &links, name);
    }
    links_forgotten
}

/// Phase 3 — consolidation: renormalise each note's outgoing weights to
/// sum to 1.0 when they drift more than 0.01 away from it.
fn run_consolidation_phase(docs_dir: &Path, details: &mut Vec<String>) -> usize {
    let corpus = corpus::load_corpus(docs_dir);
    let mut doc_names: Vec<String> = corpus.keys().cloned().collect();
    doc_names.sort();

    let mut notes_consolidated = 0usize;
    for name in &doc_names {
        let note = &corpus[name];
        let links = note.header.links();
        if links.is_empty() {
            continue;
        }
        let total: f64 = links.values().sum();
        if total <= 0.0 || (total - 1.0).abs() <= CONSOLIDATION_TOLERANCE {
            continue;
        }
        let normalized: BTreeMap<String, f64> = links
            .iter()
            .map(|(target, weight)| (target.clone(), round3(weight / total)))
            .collect();
        details.push(format!("consolidated {name} (sum was {total:.3})"));
        if persist_header_links(&note.path, &note.header, &note.body, &normalized, name) {
            notes_consolidated += 1;
        }
    }
    notes_consolidated
}

fn persist_header_links(
    path: &Path,
    header: &Header,
    body: &str,
    links: &BTreeMap<String, f64>,
    name: &str,
) -> bool {
    let mut header = header.clone();
    header.set_links(links);
    match codec::serialize(&header, body) {
        Ok(text) => match codec::atomic_write(path, &text) {
            Ok(()) => true,
            Err(source) => {
                let err = crate::error::AssocMemError::PersistFailure {
                    path: path.to_path_buf(),
                    source,
                };
                log::warn!("{err}");
                false
            }
        },
        Err(e) => {
            log::warn!("failed to serialize header for {name}: {e}");
            false
        }
    }
}

/// Half-away-from-zero rounding to three decimal places.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::associator::StubAssociator;
    use std::fs;

    #[test]
    fn forgetting_removes_links_below_threshold() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("A.md"),
            "---\nlinks:\n  B: 0.04\n  C: 0.5\n---\nbody\n",
        )
        .unwrap();
        fs::write(dir.path().join("B.md"), "body b").unwrap();
        fs::write(dir.path().join("C.md"), "body c").unwrap();

        let mut details = Vec::new();
        let forgotten = run_forgetting_phase(dir.path(), &mut details);
        assert_eq!(forgotten, 1);

        let corpus = corpus::load_corpus(dir.path());
        let links = corpus["A"].header.links();
        assert_eq!(links.len(), 1);
        assert!(links.contains_key("C"));
        assert!(!links.contains_key("B"));
    }

    #[test]
    fn consolidation_renormalises_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("A.md"),
            "---\nlinks:\n  B: 2.0\n  C: 2.0\n---\nbody\n",
        )
        .unwrap();
        fs::write(dir.path().join("B.md"), "body b").unwrap();
        fs::write(dir.path().join("C.md"), "body c").unwrap();

        let mut details = Vec::new();
        let touched = run_consolidation_phase(dir.path(), &mut details);
        assert_eq!(touched, 1);

        let corpus = corpus::load_corpus(dir.path());
        let links = corpus["A"].header.links();
        assert_eq!(links.get("B"), Some(&0.5));
        assert_eq!(links.get("C"), Some(&0.5));

        let mut details2 = Vec::new();
        let touched2 = run_consolidation_phase(dir.path(), &mut details2);
        assert_eq!(touched2, 0);
    }

    #[test]
    fn association_links_isolated_note_above_threshold() {
        let dir = tempfile::tempdir().unwrap();
        // StubAssociator scores by word-overlap Jaccard; craft bodies so
        // X overlaps I well above 0.5 and Y stays below it.
        fs::write(dir.path().join("I.md"), "alpha beta gamma delta").unwrap();
        fs::write(dir.path().join("X.md"), "alpha beta gamma delta").unwrap();
        fs::write(dir.path().join("Y.md"), "zeta eta theta iota").unwrap();

        let associator = StubAssociator;
        let mut details = Vec::new();
        let (added, mutated) = run_association_phase(dir.path(), &associator, &mut details);
        assert!(added >= 1);
        assert!(mutated);

        let corpus = corpus::load_corpus(dir.path());
        let links = corpus["I"].header.links();
        assert!(links.contains_key("X"));
        assert!(!links.contains_key("Y"));
        assert!(corpus["I"].body.contains("[[X]]"));

        let graph = graph::build_graph(&corpus);
        assert!(graph
            .neighbors("I")
            .iter()
            .any(|(target, weight)| target == "X" && *weight > 0.0));
    }

    #[test]
    fn phase_order_association_then_forget_then_consolidate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("I.md"), "alpha beta gamma delta").unwrap();
        fs::write(dir.path().join("X.md"), "alpha beta gamma delta").unwrap();

        let associator = StubAssociator;
        let report = run_batch_process(dir.path(), &associator);
        assert!(report.links_added >= 1);

        let corpus = corpus::load_corpus(dir.path());
        let links = corpus["I"].header.links();
        let total: f64 = links.values().sum();
        assert!((total - 1.0).abs() < 1e-6 || links.is_empty());
    }
}
