//! BM25 index over corpus note bodies. Okapi BM25 with the conventional
//! k1=1.5, b=0.75 constants, fixed across builds.

use std::collections::BTreeMap;

use crate::corpus::Corpus;
use crate::tokenizer;

const K1: f64 = 1.5;
const B: f64 = 0.75;

pub struct Bm25Index {
    doc_names: Vec<String>,
    doc_term_freqs: BTreeMap<String, BTreeMap<String, usize>>,
    doc_lengths: BTreeMap<String, usize>,
    doc_freq: BTreeMap<String, usize>,
    avg_doc_len: f64,
}

impl Bm25Index {
    /// Build the index over every note body in the corpus. Headers are
    /// excluded from tokenisation, document frequency, and average
    /// length.
    pub fn build(corpus: &Corpus) -> Self {
        let mut doc_names: Vec<String> = corpus.keys().cloned().collect();
        doc_names.sort();

        let mut doc_term_freqs = BTreeMap::new();
        let mut doc_lengths = BTreeMap::new();
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();

        for name in &doc_names {
            let tokens = tokenizer::tokenize(&corpus[name].body);
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for token in &tokens {
                *counts.entry(token.clone()).or_insert(0) += 1;
            }
            for token in counts.keys() {
                *doc_freq.entry(token.clone()).or_insert(0) += 1;
            }
            doc_lengths.insert(name.clone(), tokens.len());
            doc_term_freqs.insert(name.clone(), counts);
        }

        let avg_doc_len = if doc_names.is_empty() {
            0.0
        } else {
            doc_lengths.values().sum::<usize>() as f64 / doc_names.len() as f64
        };

        Self {
            doc_names,
            doc_term_freqs,
            doc_lengths,
            doc_freq,
            avg_doc_len,
        }
    }

    /// Score every corpus note against `query`. Notes that score zero are
    /// omitted from the result.
    pub fn score(&self, query: &str) -> BTreeMap<String, f64> {
        let mut scores = BTreeMap::new();
        if self.doc_names.is_empty() {
            return scores;
        }
        let query_tokens = tokenizer::tokenize(query);
        let n = self.doc_names.len() as f64;

        for name in &self.doc_names {
            let counts = &self.doc_term_freqs[name];
            let doc_len = self.doc_lengths[name] as f64;
            let mut score = 0.0;
            for token in &query_tokens {
                let tf = *counts.get(token).unwrap_or(&0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let df = *self.doc_freq.get(token).unwrap_or(&0) as f64;
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                let denom = tf + K1 * (1.0 - B + B * doc_len / self.avg_doc_len.max(1e-9));
                let tf_norm = (tf * (K1 + 1.0)) / denom;
                score += idf * tf_norm;
            }
            if score > 0.0 {
                scores.insert(name.clone(), score);
            }
        }
        scores
    }
}
