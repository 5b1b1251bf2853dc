//! Directed weighted association graph built from note headers and
//! inline wikilinks.

use std::collections::{BTreeMap, BTreeSet};

use crate::codec;
use crate::corpus::Corpus;

/// Directed weighted graph over DocNames. Node set includes every corpus
/// member plus any dangling link target referenced by a note's header or
/// body, so the graph is closed over every name it mentions.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: BTreeSet<String>,
    edges: BTreeMap<String, Vec<(String, f64)>>,
}

impl Graph {
    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter()
    }

    pub fn out_degree(&self, name: &str) -> usize {
        self.edges.get(name).map(|v| v.len()).unwrap_or(0)
    }

    pub fn neighbors(&self, name: &str) -> &[(String, f64)] {
        self.edges
            .get(name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Build the graph per the weight-assignment rule: header-declared
/// links keep their declared weight; body wikilinks not
/// already covered by the header split the remaining weight budget
/// `max(0, 1 - sum(header weights))` evenly, or get weight 0 if that
/// budget is exhausted (the edge still exists structurally).
pub fn build_graph(corpus: &Corpus) -> Graph {
    let mut nodes: BTreeSet<String> = corpus.keys().cloned().collect();
    let mut edges: BTreeMap<String, Vec<(String, f64)>> = BTreeMap::new();

    for (name, note) in corpus.iter() {
        let header_links = note.header.links();
        let body_links = codec::extract_links(&note.body);
        let unweighted: Vec<&String> = body_links
            .iter()
            .filter(|target| !header_links.contains_key(*target))
            .collect();

        let declared_sum: f64 = header_links.values().sum();
        let remaining = (1.0 - declared_sum).max(0.0);

        let mut out_edges = Vec::with_capacity(header_links.len() + unweighted.len());
        for (target, weight) in &header_links {
            nodes.insert(target.clone());
            out_edges.push((target.clone(), *weight));
        }

        if !unweighted.is_empty() {
            let per_link = if remaining > 0.0 {
                remaining / unweighted.len() as f64
            } else {
                0.0
            };
            for target in unweighted {
                nodes.insert(target.clone());
                out_edges.push((target.clone(), per_link));
            }
        }

        edges.insert(name.clone(), out_edges);
    }

    Graph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Header;
    use crate::corpus::Note;
    use std::path::PathBuf;

    fn note(name: &str, header: Header, body: &str) -> Note {
        Note {
            name: name.to_string(),
            path: PathBuf::from(format!("{name}.md")),
            header,
            body: body.to_string(),
        }
    }

    #[test]
    fn header_weight_used_verbatim() {
        let mut header = Header::empty();
        let mut links = BTreeMap::new();
        links.insert("B".to_string(), 1.0);
        header.set_links(&links);
        let mut corpus = Corpus::new();
        corpus.insert("A".to_string(), note("A", header, "alpha"));
        let graph = build_graph(&corpus);
        assert_eq!(graph.neighbors("A"), &[("B".to_string(), 1.0)]);
    }

    #[test]
    fn body_links_split_remaining_weight() {
        let mut header = Header::empty();
        let mut links = BTreeMap::new();
        links.insert("B".to_string(), 0.6);
        header.set_links(&links);
        let mut corpus = Corpus::new();
        corpus.insert(
            "A".to_string(),
            note("A", header, "see [[B]] and [[C]] and [[D]]"),
        );
        let graph = build_graph(&corpus);
        let mut edges = graph.neighbors("A").to_vec();
        edges.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            edges,
            vec![
                ("B".to_string(), 0.6),
                ("C".to_string(), 0.2),
                ("D".to_string(), 0.2),
            ]
        );
    }

    #[test]
    fn body_links_get_zero_weight_when_budget_exhausted() {
        let mut header = Header::empty();
        let mut links = BTreeMap::new();
        links.insert("B".to_string(), 1.0);
        header.set_links(&links);
        let mut corpus = Corpus::new();
        corpus.insert("A".to_string(), note("A", header, "see [[C]]"));
        let graph = build_graph(&corpus);
        assert!(graph.neighbors("A").contains(&("C".to_string(), 0.0)));
    }

    #[test]
    fn dangling_targets_become_node_only_entries() {
        let mut header = Header::empty();
        let mut links = BTreeMap::new();
        links.insert("Ghost".to_string(), 1.0);
        header.set_links(&links);
        let mut corpus = Corpus::new();
        corpus.insert("A".to_string(), note("A", header, "alpha"));
        let graph = build_graph(&corpus);
        assert!(graph.nodes().any(|n| n == "Ghost"));
        assert_eq!(graph.out_degree("Ghost"), 0);
    }
}
