//! Validates whole-token placeholder substitution

use comfywall::prompt::resolve::PromptResult;
use comfywall::workflow::inject::{inject_prompts, inject_seed};
use comfywall::PipelineError;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn prompt_result(prompts: &[(&str, &str)], negatives: &[(&str, &str)]) -> PromptResult {
    PromptResult {
        prompts: prompts
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        negatives: negatives
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        seed: 42,
    }
}

#[test]
fn test_four_leaf_injection() {
    let workflow = json!({
        "3": {"class_type": "CLIPTextEncode", "inputs": {"text": "$$environment$$"}},
        "4": {"class_type": "CLIPTextEncode", "inputs": {"text": "$$environment:negative$$"}},
        "5": {"class_type": "CLIPTextEncode", "inputs": {"text": "$$subject$$"}},
        "6": {"class_type": "CLIPTextEncode", "inputs": {"text": "$$subject:negative$$"}},
        "7": {"class_type": "KSampler", "inputs": {"steps": 20, "sampler_name": "euler"}}
    });
    let prompts = prompt_result(
        &[("environment", "misty forest"), ("subject", "a red fox")],
        &[("environment", "crowds"), ("subject", "blurry")],
    );

    let (injected, report) = inject_prompts(&workflow, &prompts).expect("inject");

    assert_eq!(injected["3"]["inputs"]["text"], "misty forest");
    assert_eq!(injected["4"]["inputs"]["text"], "crowds");
    assert_eq!(injected["5"]["inputs"]["text"], "a red fox");
    assert_eq!(injected["6"]["inputs"]["text"], "blurry");
    // Untouched leaves stay identical
    assert_eq!(injected["7"], workflow["7"]);
    assert!(report.unused_sections.is_empty());
}

#[test]
fn test_substring_occurrences_not_substituted() {
    let workflow = json!({
        "3": {"inputs": {"text": "prefix $$subject$$ suffix"}}
    });
    let prompts = prompt_result(&[("subject", "a fox")], &[]);

    let (injected, report) = inject_prompts(&workflow, &prompts).expect("inject");
    assert_eq!(injected["3"]["inputs"]["text"], "prefix $$subject$$ suffix");
    assert_eq!(report.unused_sections, ["subject"]);
}

#[test]
fn test_missing_positive_section_is_an_error() {
    let workflow = json!({
        "3": {"inputs": {"text": "$$environment$$"}}
    });
    let prompts = prompt_result(&[("subject", "a fox")], &[]);

    let error = inject_prompts(&workflow, &prompts).expect_err("must fail");
    match error {
        PipelineError::PromptSectionMissing { section } => assert_eq!(section, "environment"),
        other => panic!("expected PromptSectionMissing, got {other:?}"),
    }
}

#[test]
fn test_missing_negative_becomes_empty_string() {
    let workflow = json!({
        "3": {"inputs": {"text": "$$subject$$"}},
        "4": {"inputs": {"text": "$$subject:negative$$"}}
    });
    let prompts = prompt_result(&[("subject", "a fox")], &[]);

    let (injected, report) = inject_prompts(&workflow, &prompts).expect("inject");
    assert_eq!(injected["4"]["inputs"]["text"], "");
    assert_eq!(report.defaulted_negatives, ["subject"]);
}

#[test]
fn test_source_document_never_mutated() {
    let workflow = json!({
        "3": {"inputs": {"text": "$$positive$$"}}
    });
    let prompts = prompt_result(&[("positive", "hello")], &[]);

    let before = workflow.clone();
    let (injected, _) = inject_prompts(&workflow, &prompts).expect("inject");
    assert_eq!(workflow, before);
    assert_ne!(injected, before);
}

#[test]
fn test_placeholders_in_nested_arrays() {
    let workflow = json!({
        "3": {"inputs": {"texts": ["$$positive$$", "static"]}}
    });
    let prompts = prompt_result(&[("positive", "hello")], &[]);

    let (injected, _) = inject_prompts(&workflow, &prompts).expect("inject");
    assert_eq!(injected["3"]["inputs"]["texts"][0], "hello");
    assert_eq!(injected["3"]["inputs"]["texts"][1], "static");
}

#[test]
fn test_malformed_placeholder_left_alone() {
    let workflow = json!({
        "3": {"inputs": {"text": "$$Not-A-Section$$"}}
    });
    let prompts = prompt_result(&[("positive", "hello")], &[]);

    let (injected, _) = inject_prompts(&workflow, &prompts).expect("inject");
    assert_eq!(injected["3"]["inputs"]["text"], "$$Not-A-Section$$");
}

#[test]
fn test_seed_injected_into_seed_nodes_only() {
    let mut workflow = json!({
        "1": {"class_type": "Seed (rgthree)", "inputs": {"seed": -1}},
        "2": {"class_type": "KSampler", "inputs": {"seed": 0}}
    });

    inject_seed(&mut workflow, 3_675_670_325);
    assert_eq!(workflow["1"]["inputs"]["seed"], 3_675_670_325u64);
    assert_eq!(workflow["2"]["inputs"]["seed"], 0);
}

#[test]
fn test_seed_injection_without_seed_nodes_is_noop() {
    let mut workflow = json!({
        "2": {"class_type": "KSampler", "inputs": {"seed": 7}}
    });
    let before = workflow.clone();
    inject_seed(&mut workflow, 99);
    assert_eq!(workflow, before);
}

#[test]
fn test_non_object_document_tolerated_by_seed_injection() {
    let mut document = Value::Array(vec![json!("$$positive$$")]);
    inject_seed(&mut document, 1);
    assert_eq!(document, Value::Array(vec![json!("$$positive$$")]));
}
