//! Validates seeded selection determinism and blend factor math

use comfywall::math::probability::{blend_factor, fnv1a64, RandomSelector};

#[test]
fn test_weighted_choice_deterministic_per_seed() {
    let weights = [0.2, 0.3, 0.5];
    for seed in 0..32 {
        let a = RandomSelector::new(seed).weighted_choice(&weights);
        let b = RandomSelector::new(seed).weighted_choice(&weights);
        assert_eq!(a, b);
        assert!(a < weights.len());
    }
}

#[test]
fn test_weighted_choice_honors_certain_weight() {
    // A single positive weight must always win regardless of the seed
    let weights = [0.0, 1.0, 0.0];
    for seed in 0..64 {
        assert_eq!(RandomSelector::new(seed).weighted_choice(&weights), 1);
    }
}

#[test]
fn test_weighted_choice_zero_total_falls_back_to_first() {
    assert_eq!(RandomSelector::new(5).weighted_choice(&[0.0, 0.0]), 0);
    assert_eq!(RandomSelector::new(5).weighted_choice(&[]), 0);
}

#[test]
fn test_uniform_choice_stays_in_range() {
    let mut selector = RandomSelector::new(123);
    for len in 1..20 {
        let pick = selector.uniform_choice(len);
        assert!(pick < len);
    }
    assert_eq!(selector.uniform_choice(0), 0);
}

#[test]
fn test_uniform_choice_single_element() {
    let mut selector = RandomSelector::new(77);
    assert_eq!(selector.uniform_choice(1), 0);
}

#[test]
fn test_fnv1a64_known_vectors() {
    assert_eq!(fnv1a64(""), 0xcbf2_9ce4_8422_2325);
    assert_eq!(fnv1a64("a"), 0xaf63_dc4c_8601_ec8c);
}

#[test]
fn test_fnv1a64_distinguishes_section_names() {
    assert_ne!(fnv1a64("positive"), fnv1a64("positive:negative"));
    assert_ne!(fnv1a64("environment"), fnv1a64("subject"));
}

#[test]
fn test_blend_factor_linear_interior() {
    assert!((blend_factor(-15.0, 30.0) - 0.25).abs() < 1e-12);
    assert!((blend_factor(0.0, 30.0) - 0.5).abs() < 1e-12);
    assert!((blend_factor(15.0, 30.0) - 0.75).abs() < 1e-12);
}

#[test]
fn test_blend_factor_clamped_outside_window() {
    assert_eq!(blend_factor(-45.0, 30.0), 0.0);
    assert_eq!(blend_factor(45.0, 30.0), 1.0);
}

#[test]
fn test_blend_factor_degenerate_radius() {
    assert_eq!(blend_factor(-1.0, 0.0), 0.0);
    assert_eq!(blend_factor(1.0, 0.0), 1.0);
}
