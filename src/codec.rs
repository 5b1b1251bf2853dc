//! Note file codec: splits a note into (header, body) and back, and
//! extracts inline wikilinks from the body.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Number, Value};

const LINKS_KEY: &str = "links";

static WIKILINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|[^\]]+)?\]\]").unwrap());

/// Structured note header. Preserves unrelated keys and their relative
/// order across a read-mutate-write cycle; only `links` is interpreted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    map: Mapping,
}

impl Header {
    pub fn empty() -> Self {
        Self { map: Mapping::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// `links` mapping, float-coerced; non-numeric values are skipped with
    /// a warning.
    pub fn links(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        if let Some(Value::Mapping(links)) = self.map.get(&Value::String(LINKS_KEY.to_string())) {
            for (key, value) in links {
                let Some(key) = key.as_str() else { continue };
                match coerce_weight(value) {
                    Some(weight) => {
                        out.insert(key.to_string(), weight);
                    }
                    None => log::warn!(
                        "non-numeric link weight for target {:?}: {:?} - skipped",
                        key,
                        value
                    ),
                }
            }
        }
        out
    }

    /// Replace the `links` entry wholesale, leaving every other key and
    /// its order untouched. Removes the key entirely when `links` is empty.
    pub fn set_links(&mut self, links: &BTreeMap<String, f64>) {
        let key = Value::String(LINKS_KEY.to_string());
        if links.is_empty() {
            self.map.remove(&key);
            return;
        }
        let mut mapping = Mapping::new();
        for (target, weight) in links {
            mapping.insert(
                Value::String(target.clone()),
                Value::Number(Number::from(*weight)),
            );
        }
        self.map.insert(key, Value::Mapping(mapping));
    }

    fn to_yaml_block(&self) -> Result<String, serde_yaml::Error> {
        let raw = serde_yaml::to_string(&Value::Mapping(self.map.clone()))?;
        Ok(raw.strip_prefix("---\n").unwrap_or(&raw).to_string())
    }
}

fn coerce_weight(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Split a note file into (header, body). Total: any input parses, either
/// into a real header or into an empty one with the full text as body.
/// Returns the YAML parse error too (if any) so the caller can log and
/// downgrade without this module depending on `log`'s notion of "a note"
/// (paths live one layer up, in `corpus`).
pub fn parse(text: &str) -> (Header, String, Option<serde_yaml::Error>) {
    if let Some(rest) = text.strip_prefix("---\n") {
        if let Some(idx) = rest.find("\n---\n") {
            let yaml_part = &rest[..idx];
            let body_part = &rest[idx + 5..];
            return match serde_yaml::from_str::<Option<Mapping>>(yaml_part) {
                Ok(mapping) => (
                    Header { map: mapping.unwrap_or_default() },
                    body_part.to_string(),
                    None,
                ),
                Err(e) => (Header::empty(), body_part.to_string(), Some(e)),
            };
        }
    }
    (Header::empty(), text.to_string(), None)
}

/// Reassemble a note's on-disk text. Writes the body verbatim when the
/// header is empty; otherwise re-encodes the header as YAML between `---`
/// fences.
pub fn serialize(header: &Header, body: &str) -> Result<String, serde_yaml::Error> {
    if header.is_empty() {
        return Ok(body.to_string());
    }
    let yaml = header.to_yaml_block()?;
    Ok(format!("---\n{yaml}---\n{body}"))
}

/// Extract wikilink targets `[[X]]` / `[[X|Alias]]` from a note body.
/// Each distinct target is returned once, in first-occurrence order;
/// nested brackets are not recognised.
pub fn extract_links(body: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for cap in WIKILINK_REGEX.captures_iter(body) {
        let target = cap.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if target.is_empty() {
            continue;
        }
        if seen.insert(target.to_string()) {
            links.push(target.to_string());
        }
    }
    links
}

/// Write `contents` to `path` via write-to-temp-then-rename, so a crash
/// mid-write never leaves a half-written note on disk.
pub fn atomic_write(path: &Path, contents: &str) -> std::io::Result<()> {
    let suffix = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let tmp_path = path.with_extension(format!("md.{}.{suffix}.tmp", std::process::id()));

    let write_result = fs::write(&tmp_path, contents);
    if write_result.is_err() {
        let _ = fs::remove_file(&tmp_path);
        return write_result;
    }

    if let Err(rename_err) = fs::rename(&tmp_path, path) {
        // Cross-device renames (overlayfs, some CI sandboxes) fail with
        // EXDEV; fall back to copy + remove.
        if let Err(copy_err) = fs::copy(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(std::io::Error::new(
                copy_err.kind(),
                format!(
                    "rename {} -> {} failed ({rename_err}), copy fallback also failed: {copy_err}",
                    tmp_path.display(),
                    path.display()
                ),
            ));
        }
        let _ = fs::remove_file(&tmp_path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fence_is_all_body() {
        let (header, body, err) = parse("just text\nmore text\n");
        assert!(header.is_empty());
        assert!(err.is_none());
        assert_eq!(body, "just text\nmore text\n");
    }

    #[test]
    fn fenced_header_splits() {
        let text = "---\nlinks:\n  B: 0.5\n---\nbody here\n";
        let (header, body, err) = parse(text);
        assert!(err.is_none());
        assert_eq!(body, "body here\n");
        assert_eq!(header.links().get("B"), Some(&0.5));
    }

    #[test]
    fn malformed_header_downgrades_to_empty() {
        let text = "---\n: : not yaml : :\n---\nbody\n";
        let (header, body, err) = parse(text);
        assert!(header.is_empty());
        assert!(err.is_some());
        assert_eq!(body, "body\n");
    }

    #[test]
    fn round_trip_on_canonical_form() {
        let header = Header::empty();
        let body = "hello world";
        let serialized = serialize(&header, body).unwrap();
        let (reparsed_header, reparsed_body, _) = parse(&serialized);
        assert!(reparsed_header.is_empty());
        assert_eq!(reparsed_body, body);
    }

    #[test]
    fn unmutated_non_empty_header_round_trips_byte_identical() {
        let text = "---\nlinks:\n  B: 0.5\n---\nbody here\n";
        let (header, body, err) = parse(text);
        assert!(err.is_none());
        let serialized = serialize(&header, &body).unwrap();
        assert_eq!(serialized, text);
    }

    #[test]
    fn mutated_header_round_trips_value_equal() {
        let mut header = Header::empty();
        let mut links = BTreeMap::new();
        links.insert("X".to_string(), 0.7);
        header.set_links(&links);
        let serialized = serialize(&header, "body\n").unwrap();
        let (reparsed, _, _) = parse(&serialized);
        assert_eq!(reparsed.links(), links);
    }

    #[test]
    fn unrelated_keys_survive_mutation() {
        let text = "---\ntitle: Keep Me\nlinks:\n  A: 1.0\n---\nbody\n";
        let (mut header, body, _) = parse(text);
        let mut links = header.links();
        links.insert("B".to_string(), 0.2);
        header.set_links(&links);
        let serialized = serialize(&header, &body).unwrap();
        assert!(serialized.contains("title: Keep Me"));
    }

    #[test]
    fn wikilink_extraction_dedupes_and_trims() {
        let body = "see [[ Alpha ]] and [[Alpha]] also [[Beta|Label]]";
        let links = extract_links(body);
        assert_eq!(links, vec!["Alpha".to_string(), "Beta".to_string()]);
    }

    #[test]
    fn wikilink_extraction_does_not_recognise_nesting() {
        // The regex has no concept of nested brackets: it captures up to
        // the first `]`, so a nested `[[Inner]]` is swallowed whole into
        // the outer target rather than extracted separately.
        let body = "[[Outer [[Inner]] ]]";
        let links = extract_links(body);
        assert_eq!(links, vec!["Outer [[Inner".to_string()]);
    }
}
