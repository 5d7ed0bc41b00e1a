//! Bulk properties of the security primitives: activation-code shape and
//! rough uniformity, and origin-policy parsing.

use std::collections::HashMap;

use anyhow::Result;

use plenario::security::{generate_activation_code, OriginPolicy};

#[test]
fn activation_codes_stay_in_shape_over_many_draws() -> Result<()> {
    let mut counts: HashMap<char, u64> = HashMap::new();
    for _ in 0..10_000 {
        let code = generate_activation_code()?;
        assert_eq!(code.len(), 6);
        for c in code.chars() {
            assert!(
                c.is_ascii_uppercase() || c.is_ascii_digit(),
                "unexpected symbol {:?} in code {:?}",
                c,
                code
            );
            *counts.entry(c).or_default() += 1;
        }
    }
    // Uniformity spot check, not a distribution proof: with 60k draws over a
    // 36-symbol alphabet every symbol shows up, and no symbol strays wildly
    // from the expected ~1666 occurrences.
    assert_eq!(counts.len(), 36, "every symbol of [A-Z0-9] should appear");
    let expected = 60_000.0 / 36.0;
    for (c, n) in &counts {
        let ratio = *n as f64 / expected;
        assert!(
            (0.5..=2.0).contains(&ratio),
            "symbol {:?} count {} is far from expected {}",
            c,
            n,
            expected
        );
    }
    Ok(())
}

#[test]
fn codes_are_not_repeating_a_single_value() -> Result<()> {
    let a = generate_activation_code()?;
    let b = generate_activation_code()?;
    let c = generate_activation_code()?;
    assert!(!(a == b && b == c), "three identical codes in a row is not random");
    Ok(())
}

#[test]
fn origin_policy_parses_csv_with_whitespace() {
    let policy = OriginPolicy::from_csv(" https://app.example.com ,https://other.example.com, ");
    assert!(policy.is_allowed("https://app.example.com"));
    assert!(policy.is_allowed("https://other.example.com"));
    assert!(!policy.is_allowed("https://evil.example.com"));
    assert!(!policy.is_allowed(""));
}

#[test]
fn origin_policy_wildcard_among_entries() {
    // a `*` anywhere in the list opens the gate entirely
    let policy = OriginPolicy::from_csv("https://app.example.com,*");
    assert!(policy.is_allowed("https://anything.example.net"));
}

#[test]
fn empty_allow_list_denies_all_cross_origin() {
    let policy = OriginPolicy::from_csv("");
    assert!(!policy.is_allowed("https://app.example.com"));
}
