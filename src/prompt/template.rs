//! Multi-section prompt template parsing
//!
//! A template is split into named sections by marker lines of the form
//! `$$name$$`. Text before the first marker belongs to the implicit
//! `positive` section; a `negative` marker is an alias for
//! `positive:negative`. Comment lines are dropped during parsing.

use crate::io::error::{PipelineError, Result};
use std::fmt;

/// Name of the implicit leading section
pub const IMPLICIT_SECTION: &str = "positive";

/// A validated section name with its negative flag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionName {
    base: String,
    negative: bool,
}

impl SectionName {
    /// Construct from a base name and negative flag without validation
    pub fn new(base: impl Into<String>, negative: bool) -> Self {
        Self {
            base: base.into(),
            negative,
        }
    }

    /// Parse the inner text of a marker (`environment`, `subject:negative`)
    ///
    /// Returns `None` when the name violates the `[a-z0-9_]+` grammar. The
    /// lone `negative` marker resolves to `positive:negative`.
    pub fn parse(inner: &str) -> Option<Self> {
        if inner == "negative" {
            return Some(Self::new(IMPLICIT_SECTION, true));
        }
        let (base, negative) = match inner.strip_suffix(":negative") {
            Some(prefix) => (prefix, true),
            None => (inner, false),
        };
        if base.is_empty()
            || !base
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return None;
        }
        Some(Self::new(base, negative))
    }

    /// Base name without the negative suffix
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Whether this is a `:negative` counterpart
    pub const fn is_negative(&self) -> bool {
        self.negative
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "{}:negative", self.base)
        } else {
            write!(f, "{}", self.base)
        }
    }
}

/// One named region of a template
#[derive(Debug, Clone)]
pub struct Section {
    /// Section identity
    pub name: SectionName,
    lines: Vec<String>,
    explicit_marker: bool,
}

impl Section {
    /// Raw section content with interior blank lines preserved
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// A parsed prompt template
#[derive(Debug, Clone)]
pub struct Template {
    label: String,
    sections: Vec<Section>,
}

impl Template {
    /// Parse template text into ordered sections
    ///
    /// `label` names the template in diagnostics (usually the filename).
    ///
    /// # Errors
    ///
    /// Returns `TemplateSyntax` on illegal section names, duplicate
    /// sections, or a negative section without a base counterpart.
    pub fn parse(label: &str, text: &str) -> Result<Self> {
        let mut sections: Vec<Section> = Vec::new();
        let mut current = Section {
            name: SectionName::new(IMPLICIT_SECTION, false),
            lines: Vec::new(),
            explicit_marker: false,
        };

        for line in text.lines() {
            let trimmed = line.trim();

            if trimmed.starts_with('#') {
                continue;
            }

            if let Some(inner) = marker_inner(trimmed) {
                let name = SectionName::parse(inner).ok_or_else(|| syntax(
                    label,
                    format!("illegal section name '{inner}' (expected [a-z0-9_]+ with optional :negative)"),
                ))?;

                push_section(&mut sections, current);
                current = Section {
                    name,
                    lines: Vec::new(),
                    explicit_marker: true,
                };
                continue;
            }

            current.lines.push(line.to_string());
        }
        push_section(&mut sections, current);

        let template = Self {
            label: label.to_string(),
            sections,
        };
        template.check_duplicates()?;
        template.check_negative_counterparts()?;
        Ok(template)
    }

    fn check_duplicates(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for section in &self.sections {
            if !seen.insert(section.name.clone()) {
                return Err(syntax(
                    &self.label,
                    format!("duplicate section '{}'", section.name),
                ));
            }
        }
        Ok(())
    }

    fn check_negative_counterparts(&self) -> Result<()> {
        for section in &self.sections {
            if !section.name.is_negative() || section.name.base() == IMPLICIT_SECTION {
                continue;
            }
            let has_base = self
                .sections
                .iter()
                .any(|s| !s.name.is_negative() && s.name.base() == section.name.base());
            if !has_base {
                return Err(syntax(
                    &self.label,
                    format!(
                        "negative section '{}' has no matching '{}' section",
                        section.name,
                        section.name.base()
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Diagnostic label for this template
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Parsed sections in reading order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Reconstruct the template text
    ///
    /// Round-trips with [`parse`](Self::parse) for templates without
    /// comments; comment lines are intentionally lost.
    pub fn render(&self) -> String {
        let mut out = Vec::new();
        for section in &self.sections {
            if section.explicit_marker {
                out.push(format!("$${}$$", section.name));
            }
            out.extend(section.lines.iter().cloned());
        }
        out.join("\n")
    }
}

/// Inner name of a marker line, or `None` for content lines
fn marker_inner(trimmed: &str) -> Option<&str> {
    let inner = trimmed.strip_prefix("$$")?.strip_suffix("$$")?;
    // `$$$$` and `$$ spaced $$` are content, not markers
    (!inner.is_empty() && !inner.contains(char::is_whitespace)).then_some(inner)
}

/// Append a section, discarding an empty implicit leader
fn push_section(sections: &mut Vec<Section>, section: Section) {
    if !section.explicit_marker && section.lines.iter().all(|l| l.trim().is_empty()) {
        return;
    }
    sections.push(section);
}

fn syntax(label: &str, reason: String) -> PipelineError {
    PipelineError::TemplateSyntax {
        template: label.to_string(),
        reason,
    }
}
