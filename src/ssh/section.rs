use crate::ssh::entry::ConfigEntry;

/// First line of the block this tool owns in an SSH config
pub const SECTION_START: &str = "# --- OpsWorks ---";

/// Last line of the owned block
pub const SECTION_END: &str = "# --- End of OpsWorks ---";

/// Entries generated for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBlock {
    pub account: String,
    pub entries: Vec<ConfigEntry>,
}

/// All account blocks, rendered between the section markers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedSection {
    pub blocks: Vec<AccountBlock>,
}

impl MergedSection {
    /// Combine per-account blocks, keeping their order
    pub fn merge(blocks: Vec<AccountBlock>) -> Self {
        Self { blocks }
    }

    pub fn entry_count(&self) -> usize {
        self.blocks.iter().map(|b| b.entries.len()).sum()
    }

    /// Section text, ending with the end marker and a newline
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(SECTION_START);
        out.push('\n');

        for block in &self.blocks {
            out.push_str(&format!("\n# account: {}\n", block.account));
            for entry in &block.entries {
                out.push('\n');
                out.push_str(&entry.to_string());
            }
        }

        out.push('\n');
        out.push_str(SECTION_END);
        out.push('\n');
        out
    }
}

/// Remove the first owned section and the blank lines padding it.
///
/// Only the text from the first start marker to the first end marker after
/// it is removed. Returns `None` when a start marker has no end marker.
pub fn strip_section(contents: &str) -> Option<String> {
    let Some(start) = contents.find(SECTION_START) else {
        return Some(contents.to_string());
    };
    let end = start + contents[start..].find(SECTION_END)? + SECTION_END.len();

    let mut before = &contents[..start];
    if before.ends_with("\n\n") {
        before = &before[..before.len() - 1];
    }

    let mut after = &contents[end..];
    after = after.strip_prefix('\n').unwrap_or(after);
    after = after.strip_prefix('\n').unwrap_or(after);

    Some(format!("{}{}", before, after))
}

/// Append a rendered section to stripped contents, separated by a blank line
pub fn compose(stripped: &str, section: &str) -> String {
    let mut out = stripped.to_string();
    if !out.is_empty() {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(section);
    out.push('\n');
    out
}
