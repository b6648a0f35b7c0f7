//! Common utilities for benchmarks.
//!
//! Provides test data generators with fixed seeds for reproducibility.

#![allow(dead_code)]

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Fixed seed for reproducible benchmark data
const SEED: u64 = 42;

/// Create a seeded RNG for reproducible test data
pub fn seeded_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(SEED)
}

/// Generate a multi-hunk diff with `hunk_count` hunks in file order.
///
/// Each hunk has a random mix of added, removed and context lines, and its
/// header counts them correctly.
pub fn generate_multi_hunk_diff(hunk_count: usize) -> String {
    let mut rng = seeded_rng();
    let mut lines = vec![
        "diff --git a/src/lib.rs b/src/lib.rs".to_string(),
        "index 1111111..2222222 100644".to_string(),
        "--- a/src/lib.rs".to_string(),
        "+++ b/src/lib.rs".to_string(),
    ];
    let mut left_start = 1u32;
    let mut right_start = 1u32;

    for h in 0..hunk_count {
        let mut body = Vec::new();
        let (mut left_len, mut right_len) = (0u32, 0u32);
        for i in 0..rng.random_range(4..20) {
            let content = generate_code_line(&mut rng, h * 100 + i);
            match rng.random_range(0..10u8) {
                0..=1 => {
                    body.push(format!("+{}", content));
                    right_len += 1;
                }
                2..=3 => {
                    body.push(format!("-{}", content));
                    left_len += 1;
                }
                _ => {
                    body.push(format!(" {}", content));
                    left_len += 1;
                    right_len += 1;
                }
            }
        }
        lines.push(format!(
            "@@ -{},{} +{},{} @@",
            left_start, left_len, right_start, right_len
        ));
        lines.extend(body);

        let gap = rng.random_range(10..40);
        left_start += left_len + gap;
        right_start += right_len + gap;
    }

    lines.join("\n")
}

/// Generate a maximal-context diff of a file with `line_count` rows
pub fn generate_full_context_diff(line_count: usize) -> String {
    let mut rng = seeded_rng();
    let mut lines = vec![format!("@@ -1,{0} +1,{0} @@", line_count)];

    for i in 0..line_count {
        let content = generate_code_line(&mut rng, i);
        match rng.random_range(0..10u8) {
            0 => lines.push(format!("+{}", content)),
            1 => lines.push(format!("-{}", content)),
            _ => lines.push(format!(" {}", content)),
        }
    }

    lines.join("\n")
}

/// Generate (current, next) displayed line pairs up to `max_line`
pub fn generate_observation_lines(count: usize, max_line: u32) -> Vec<(u32, u32)> {
    let mut rng = seeded_rng();
    (0..count)
        .map(|_| (rng.random_range(1..=max_line), rng.random_range(1..=max_line)))
        .collect()
}

/// Generate a line of realistic Rust-like code
fn generate_code_line(rng: &mut ChaCha8Rng, line_num: usize) -> String {
    let templates = [
        "    let x = value.unwrap_or_default();",
        "    fn process_data(input: &str) -> Result<String> {",
        "    }",
        "    if condition { return Ok(()); }",
        "    for item in items.iter() {",
        "    match result {",
        "        Ok(v) => v,",
        "        Err(e) => return Err(e),",
        "    use std::collections::HashMap;",
        "    pub struct Config {",
        "        field: String,",
        "    #[derive(Debug, Clone)]",
        "    /// Documentation comment",
        "    assert_eq!(expected, actual);",
        "    async fn fetch_data() -> Result<Vec<u8>> {",
    ];

    let idx = rng.random_range(0..templates.len());
    format!("{} // line {}", templates[idx], line_num)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_generate_multi_hunk_diff_reproducible() {
        let diff1 = super::generate_multi_hunk_diff(10);
        let diff2 = super::generate_multi_hunk_diff(10);
        assert_eq!(diff1, diff2);
    }

    #[test]
    fn test_generate_full_context_diff_length() {
        let diff = super::generate_full_context_diff(100);
        assert_eq!(diff.lines().count(), 101);
    }
}
