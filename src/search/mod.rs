//! Keyword search over a YAML document index.
//!
//! The index maps file paths to short descriptions:
//!
//! ```yaml
//! notes/thermo.md:
//!   one_sentence: Covers the laws of thermodynamics.
//!   five_sentence: ...
//! ```
//!
//! Matching is a linear case-insensitive substring scan — no ranking. For
//! each keyword (in relevance order) every entry is checked in document
//! order; a path is reported at most once, at its first match.

use serde_yaml::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid or malformed YAML content: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid YAML structure: root must be a mapping of file paths")]
    NotAMapping,
}

/// Scan the YAML index for entries whose `one_sentence` or `five_sentence`
/// field contains any of `keywords` (case-insensitive).
///
/// Returns matching file paths, deduplicated, in first-match order. Entries
/// whose value is not a mapping, and description fields that are missing or
/// not strings, are treated as empty rather than rejected.
pub fn search_index(yaml_content: &str, keywords: &[String]) -> Result<Vec<String>, SearchError> {
    let data: Value = serde_yaml::from_str(yaml_content)?;
    // `Mapping` preserves document order, matching the original index layout.
    let mapping = data.as_mapping().ok_or(SearchError::NotAMapping)?;

    let mut results: Vec<String> = Vec::new();
    for keyword in keywords {
        let needle = keyword.to_lowercase();
        for (key, info) in mapping {
            let Some(path) = key.as_str() else { continue };
            if results.iter().any(|r| r == path) {
                continue;
            }
            if field(info, "one_sentence").to_lowercase().contains(&needle)
                || field(info, "five_sentence").to_lowercase().contains(&needle)
            {
                results.push(path.to_string());
            }
        }
    }
    Ok(results)
}

fn field<'a>(info: &'a Value, name: &str) -> &'a str {
    info.get(name).and_then(Value::as_str).unwrap_or("")
}
