//! Hybrid retrieval: BM25 seeding plus bounded, decayed spreading
//! activation over the association graph.

use std::collections::BTreeMap;

use crate::bm25::Bm25Index;
use crate::corpus::Corpus;
use crate::graph::Graph;

#[derive(Debug, Clone, Copy)]
pub struct RetrieveParams {
    pub top_k: usize,
    pub decay: f64,
    pub steps: u32,
    pub threshold: f64,
}

impl Default for RetrieveParams {
    fn default() -> Self {
        Self {
            top_k: 3,
            decay: 0.8,
            steps: 3,
            threshold: 0.1,
        }
    }
}

/// Run one query end to end: BM25 seed, normalise, spread, aggregate,
/// filter dangling, sort, truncate. Deterministic: activation maps are
/// kept as `BTreeMap` throughout so accumulation order is fixed by
/// DocName, and ties in the final score are broken by DocName ascending.
pub fn retrieve(
    corpus: &Corpus,
    graph: &Graph,
    bm25: &Bm25Index,
    query: &str,
    params: &RetrieveParams,
) -> Vec<(String, f64)> {
    let bm25_scores = bm25.score(query);
    if bm25_scores.is_empty() {
        return Vec::new();
    }

    let max_score = bm25_scores
        .values()
        .cloned()
        .fold(f64::MIN, f64::max);

    let mut current: BTreeMap<String, f64> = bm25_scores
        .iter()
        .map(|(name, score)| (name.clone(), score / max_score))
        .collect();
    let mut final_scores = current.clone();

    for _ in 0..params.steps {
        let mut next: BTreeMap<String, f64> = BTreeMap::new();
        for (node, activation) in &current {
            if *activation < params.threshold {
                continue;
            }
            for (neighbor, weight) in graph.neighbors(node) {
                let spread = activation * weight * params.decay;
                *next.entry(neighbor.clone()).or_insert(0.0) += spread;
            }
        }
        if next.is_empty() {
            break;
        }
        for (node, value) in &next {
            *final_scores.entry(node.clone()).or_insert(0.0) += value;
        }
        current = next.into_iter().map(|(k, v)| (k, v.min(1.0))).collect();
    }

    let mut results: Vec<(String, f64)> = final_scores
        .into_iter()
        .filter(|(name, _)| corpus.contains_key(name))
        .collect();
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    results.truncate(params.top_k);
    results
}
