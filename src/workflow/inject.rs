//! Placeholder substitution into workflow documents
//!
//! A placeholder occupies a whole JSON string leaf: the leaf value must
//! equal `$$name$$` or `$$name:negative$$` exactly. Substring occurrences
//! inside larger strings are never substituted. Injection operates on a deep
//! clone so cached workflow documents stay pristine.

use crate::io::error::{PipelineError, Result};
use crate::prompt::resolve::PromptResult;
use serde_json::Value;
use std::collections::BTreeSet;

/// What happened during one injection pass
#[derive(Debug, Clone, Default)]
pub struct InjectionReport {
    /// Placeholder names that were substituted
    pub injected: Vec<String>,
    /// Sections present in the prompt result with no matching placeholder
    pub unused_sections: Vec<String>,
    /// Negative placeholders filled with the empty string
    pub defaulted_negatives: Vec<String>,
}

/// Substitute resolved prompt sections into a workflow document
///
/// # Errors
///
/// Returns `PromptSectionMissing` when the workflow carries a positive
/// placeholder with no corresponding resolved section. Missing negatives are
/// substituted with the empty string and recorded in the report.
pub fn inject_prompts(document: &Value, prompts: &PromptResult) -> Result<(Value, InjectionReport)> {
    let mut injected_positive = BTreeSet::new();
    let mut injected_negative = BTreeSet::new();
    let mut defaulted = BTreeSet::new();

    let mut copy = document.clone();
    visit_strings(&mut copy, &mut |leaf| {
        let Some((name, negative)) = parse_placeholder(leaf) else {
            return Ok(());
        };
        let name = name.to_string();

        if negative {
            match prompts.negatives.get(&name) {
                Some(text) => {
                    *leaf = text.clone();
                }
                None => {
                    *leaf = String::new();
                    defaulted.insert(name.clone());
                }
            }
            injected_negative.insert(name);
        } else {
            match prompts.prompts.get(&name) {
                Some(text) => {
                    *leaf = text.clone();
                    injected_positive.insert(name);
                }
                None => {
                    return Err(PipelineError::PromptSectionMissing { section: name });
                }
            }
        }
        Ok(())
    })?;

    let unused: Vec<String> = prompts
        .prompts
        .keys()
        .filter(|name| !injected_positive.contains(*name))
        .cloned()
        .collect();
    if !unused.is_empty() {
        tracing::info!(sections = ?unused, "sections resolved but not referenced by the workflow");
    }
    for name in &defaulted {
        tracing::warn!(section = %name, "workflow requests a negative the template does not define, using empty string");
    }

    let mut injected: Vec<String> = injected_positive.into_iter().collect();
    injected.extend(injected_negative.into_iter().map(|n| format!("{n}:negative")));

    Ok((
        copy,
        InjectionReport {
            injected,
            unused_sections: unused,
            defaulted_negatives: defaulted.into_iter().collect(),
        },
    ))
}

/// Set the run seed on every `Seed (rgthree)` node
///
/// Keeps the service from treating `-1` as a sentinel while leaving
/// workflows without such nodes unchanged.
pub fn inject_seed(document: &mut Value, seed: u64) {
    let Some(nodes) = document.as_object_mut() else {
        return;
    };

    for (node_id, node) in nodes.iter_mut() {
        let is_seed_node = node
            .get("class_type")
            .and_then(Value::as_str)
            .is_some_and(|class| class == "Seed (rgthree)");
        if !is_seed_node {
            continue;
        }

        if let Some(inputs) = node.get_mut("inputs").and_then(Value::as_object_mut) {
            inputs.insert("seed".to_string(), Value::from(seed));
            tracing::debug!(node_id = %node_id, seed, "injected seed node value");
        }
    }
}

/// Parse a whole-value placeholder into its name and negative flag
fn parse_placeholder(text: &str) -> Option<(&str, bool)> {
    let inner = text.strip_prefix("$$")?.strip_suffix("$$")?;
    let (name, negative) = match inner.strip_suffix(":negative") {
        Some(base) => (base, true),
        None => (inner, false),
    };
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    valid.then_some((name, negative))
}

/// Apply a fallible visitor to every string leaf of a JSON tree
fn visit_strings(
    value: &mut Value,
    visit: &mut impl FnMut(&mut String) -> Result<()>,
) -> Result<()> {
    match value {
        Value::String(text) => visit(text),
        Value::Array(items) => {
            for item in items {
                visit_strings(item, visit)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                visit_strings(item, visit)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
