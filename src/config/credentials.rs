use std::collections::HashMap;
use std::path::Path;

use crate::{OpsworksSshError, Result};

/// Parsed AWS config / credentials file: section -> key -> value
#[derive(Debug, Clone, Default)]
pub struct CredentialsFile {
    sections: HashMap<String, HashMap<String, String>>,
}

impl CredentialsFile {
    /// Load and parse the file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(OpsworksSshError::ConfigNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Parse INI-style content.
    ///
    /// Lines starting with `#` or `;` are comments. Indented lines are
    /// sub-properties in the AWS format and are skipped, as are keys that
    /// appear before the first section. Later duplicate keys win.
    pub fn parse(content: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current: Option<String> = None;

        for raw in content.lines() {
            if raw.starts_with(' ') || raw.starts_with('\t') {
                continue;
            }

            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim().to_string();
                sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            let Some(section) = current.as_ref() else {
                continue;
            };

            if let Some((key, value)) = line.split_once('=') {
                sections
                    .entry(section.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        Self { sections }
    }

    pub fn section(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.sections.get(name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }
}
