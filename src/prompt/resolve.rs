//! Seeded resolution of template sections into final prompt strings
//!
//! Each section gets its own PRNG derived from the base seed and a stable
//! hash of the section name, so different sections draw independently while
//! the whole resolution stays reproducible.

use crate::io::configuration::SUBSTITUTION_PASS_LIMIT;
use crate::io::error::{PipelineError, Result};
use crate::math::probability::{fnv1a64, RandomSelector};
use crate::prompt::atoms::AtomStore;
use crate::prompt::template::Template;
use serde::Serialize;
use std::collections::BTreeMap;

/// Resolved prompt sections plus the seed that produced them
#[derive(Debug, Clone, Serialize)]
pub struct PromptResult {
    /// Resolved non-negative sections keyed by base name
    pub prompts: BTreeMap<String, String>,
    /// Resolved negative sections keyed by base name
    pub negatives: BTreeMap<String, String>,
    /// Seed all random draws were derived from
    pub seed: u64,
}

impl PromptResult {
    /// Negative counterpart of a section, empty when absent
    pub fn negative_or_empty(&self, base: &str) -> &str {
        self.negatives.get(base).map_or("", String::as_str)
    }
}

/// Resolves wildcard and variant constructs against an atom store
pub struct TemplateResolver<'a> {
    atoms: &'a mut AtomStore,
}

impl<'a> TemplateResolver<'a> {
    /// Create a resolver borrowing the run's atom store
    pub fn new(atoms: &'a mut AtomStore) -> Self {
        Self { atoms }
    }

    /// Resolve every section of a template with the given base seed
    ///
    /// # Errors
    ///
    /// Returns `TemplateSyntax` on malformed variants, `AtomMissing` or
    /// `AtomEmpty` when a wildcard cannot be satisfied.
    pub fn resolve(&mut self, template: &Template, seed: u64) -> Result<PromptResult> {
        let mut prompts = BTreeMap::new();
        let mut negatives = BTreeMap::new();

        for section in template.sections() {
            let scoped = seed ^ fnv1a64(&section.name.to_string());
            let mut selector = RandomSelector::new(scoped);
            let resolved =
                self.resolve_text(template.label(), &section.text(), &mut selector)?;

            if section.name.is_negative() {
                negatives.insert(section.name.base().to_string(), resolved);
            } else {
                prompts.insert(section.name.base().to_string(), resolved);
            }
        }

        Ok(PromptResult {
            prompts,
            negatives,
            seed,
        })
    }

    /// Repeatedly substitute constructs until the text is stable
    ///
    /// The pass ceiling bounds self-referential atom files; on hitting it the
    /// partially resolved text is kept with a warning.
    fn resolve_text(
        &mut self,
        label: &str,
        text: &str,
        selector: &mut RandomSelector,
    ) -> Result<String> {
        let mut current = text.to_string();

        for _ in 0..SUBSTITUTION_PASS_LIMIT {
            let (next, changed) = self.substitute_pass(label, &current, selector)?;
            current = next;
            if !changed {
                return Ok(current.trim().to_string());
            }
        }

        tracing::warn!(
            template = label,
            limit = SUBSTITUTION_PASS_LIMIT,
            "substitution pass ceiling reached, keeping partially resolved text"
        );
        Ok(current.trim().to_string())
    }

    /// One left-to-right pass replacing each construct encountered once
    ///
    /// Replacement text is not rescanned within the pass, so atoms that
    /// expand to further constructs resolve on the following pass.
    fn substitute_pass(
        &mut self,
        label: &str,
        text: &str,
        selector: &mut RandomSelector,
    ) -> Result<(String, bool)> {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut changed = false;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'_' && text[i..].starts_with("__") {
                if let Some((name, token_len)) = scan_wildcard(&text[i..]) {
                    let atom = self.atoms.select(name, selector)?;
                    out.push_str(&atom);
                    i += token_len;
                    changed = true;
                    continue;
                }
            }

            if bytes[i] == b'{' {
                let (choice, token_len) = resolve_variant(label, &text[i..], selector)?;
                out.push_str(&choice);
                i += token_len;
                changed = true;
                continue;
            }

            if bytes[i] == b'}' {
                return Err(variant_syntax(label, "unbalanced '}' outside a variant"));
            }

            let ch = text[i..].chars().next().unwrap_or('\u{fffd}');
            out.push(ch);
            i += ch.len_utf8();
        }

        Ok((out, changed))
    }
}

/// Scan a `__path__` wildcard at the start of `text`
///
/// Returns the atom name and total token length, or `None` when the leading
/// underscores do not open a valid wildcard.
fn scan_wildcard(text: &str) -> Option<(&str, usize)> {
    let inner = &text[2..];
    let end = inner.find("__")?;
    let name = &inner[..end];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '/');
    valid.then_some((name, end + 4))
}

/// Resolve a `{a|b|c}` variant at the start of `text`
///
/// Supports the weighted form `{w::a|w::b}`; weights must be positive finite
/// numbers. Returns the selected alternative and total token length.
fn resolve_variant(
    label: &str,
    text: &str,
    selector: &mut RandomSelector,
) -> Result<(String, usize)> {
    let inner_start = 1;
    let mut close = None;
    for (idx, ch) in text[inner_start..].char_indices() {
        match ch {
            '{' => {
                return Err(variant_syntax(
                    label,
                    "variants cannot nest inside other variants",
                ))
            }
            '}' => {
                close = Some(inner_start + idx);
                break;
            }
            _ => {}
        }
    }
    let close = close.ok_or_else(|| variant_syntax(label, "unbalanced '{' in variant"))?;
    let inner = &text[inner_start..close];

    let mut alternatives = Vec::new();
    let mut weights = Vec::new();
    for alt in inner.split('|') {
        match alt.split_once("::") {
            Some((prefix, body)) => {
                let weight: f64 = prefix.trim().parse().map_err(|_| {
                    variant_syntax(label, format!("variant weight '{prefix}' is not a number"))
                })?;
                if !weight.is_finite() || weight <= 0.0 {
                    return Err(variant_syntax(
                        label,
                        format!("variant weight '{prefix}' must be positive"),
                    ));
                }
                alternatives.push(body);
                weights.push(weight);
            }
            None => {
                alternatives.push(alt);
                weights.push(1.0);
            }
        }
    }

    let index = selector.weighted_choice(&weights);
    Ok((alternatives[index].to_string(), close + 1))
}

fn variant_syntax(label: &str, reason: impl ToString) -> PipelineError {
    PipelineError::TemplateSyntax {
        template: label.to_string(),
        reason: reason.to_string(),
    }
}
