//! Prompt assembly for study operations.
//!
//! Task prompts are plain-text template files stored under `config/prompts/`.
//! A builder loads template layers in order, joins them with blank lines and
//! applies `{{key}}` variable substitution once at build time. Missing files
//! are silently skipped so layers can be optional.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SEPARATOR: &str = "\n\n";

/// Fluent builder that assembles a prompt from template files.
pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append a layer by loading `filename` from the prompts directory.
    /// Silently skips the layer when the file does not exist.
    pub fn layer(mut self, filename: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let trimmed = text.trim().to_string();
                if !trimmed.is_empty() {
                    self.parts.push(trimmed);
                }
            }
            Err(_) => {
                tracing::debug!("prompt: layer '{}' not found — skipped", path.display());
            }
        }
        self
    }

    /// Directly append a text fragment (e.g. an already-loaded template body).
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim().to_string();
        if !trimmed.is_empty() {
            self.parts.push(trimmed);
        }
        self
    }

    /// Register a single `{{key}}` → `value` substitution applied at build time.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Assemble all layers, join with blank lines, and apply variable substitution.
    pub fn build(self) -> String {
        let mut prompt = self.parts.join(SEPARATOR);
        for (k, v) in &self.vars {
            let placeholder = format!("{{{{{}}}}}", k);
            prompt = prompt.replace(&placeholder, v);
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn prompts_dir_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn builder_assembles_layers_in_order() {
        let dir = prompts_dir_with(&[("a.txt", "first layer"), ("b.txt", "second layer")]);
        let result = PromptBuilder::new(dir.path())
            .layer("a.txt")
            .layer("b.txt")
            .build();
        let first = result.find("first layer").unwrap();
        let second = result.find("second layer").unwrap();
        assert!(first < second);
        assert!(result.contains("\n\n"));
    }

    #[test]
    fn builder_skips_missing_file() {
        let dir = prompts_dir_with(&[]);
        let result = PromptBuilder::new(dir.path())
            .layer("nonexistent_file_xyz.txt")
            .append("hello")
            .build();
        assert_eq!(result.trim(), "hello");
    }

    #[test]
    fn builder_substitutes_variable() {
        let dir = prompts_dir_with(&[("q.txt", "Generate {{num}} questions.")]);
        let result = PromptBuilder::new(dir.path())
            .layer("q.txt")
            .var("num", "5")
            .build();
        assert_eq!(result, "Generate 5 questions.");
        assert!(!result.contains("{{num}}"));
    }

    #[test]
    fn builder_substitutes_multiline_value() {
        let dir = prompts_dir_with(&[]);
        let result = PromptBuilder::new(dir.path())
            .append("Items: {{items}}")
            .var("items", "item1\nitem2")
            .build();
        assert!(result.contains("item1\nitem2"));
    }

    #[test]
    fn empty_layers_dropped() {
        let dir = prompts_dir_with(&[("blank.txt", "   \n  ")]);
        let result = PromptBuilder::new(dir.path())
            .layer("blank.txt")
            .append("body")
            .build();
        assert_eq!(result, "body");
    }
}
