//! Request validators for the regression replay mocks (C12).
//!
//! Ported from `request_validators.py`: the replay harness re-plays a
//! recorded inquiry against these endpoints and each one decides whether the
//! replayed request still matches the one that was originally recorded.
//! Most bureaus require byte-exact equality; a couple of services carry
//! documented exceptions (a dynamic key, or a block of the CCR inquiry
//! string that legitimately reorders itself between runs) and those
//! exceptions are preserved here rather than "fixed" into exact equality.

use std::collections::HashSet;

use serde_json::Value;

/// Generic structural diff between two JSON values used by the bureaus that
/// tolerate a documented set of dynamic keys/values rather than requiring
/// byte-exact equality.
///
/// Objects must have identical key sets; arrays are compared position by
/// position (trailing elements of the longer array are ignored, matching
/// Python's `zip`); leaf values must be equal unless the enclosing key is in
/// `ignore_keys` or either leaf value is in `ignore_values`.
pub fn match_dicts_recursively(
    current: &Value,
    baseline: &Value,
    ignore_values: &[Value],
    ignore_keys: &[&str],
    parent_key: Option<&str>,
) -> bool {
    match (current, baseline) {
        (Value::Object(cur), Value::Object(base)) => {
            let cur_keys: HashSet<&String> = cur.keys().collect();
            let base_keys: HashSet<&String> = base.keys().collect();
            if cur_keys != base_keys {
                return false;
            }
            cur.iter().all(|(key, cur_val)| {
                let base_val = &base[key];
                match_dicts_recursively(cur_val, base_val, ignore_values, ignore_keys, Some(key))
            })
        }
        (Value::Array(cur), Value::Array(base)) => cur
            .iter()
            .zip(base.iter())
            .all(|(c, b)| match_dicts_recursively(c, b, ignore_values, ignore_keys, parent_key)),
        (cur_leaf, base_leaf) => {
            if let Some(key) = parent_key {
                if ignore_keys.contains(&key) {
                    return true;
                }
            }
            if ignore_values.contains(cur_leaf) || ignore_values.contains(base_leaf) {
                return true;
            }
            cur_leaf == base_leaf
        }
    }
}

/// CCR's `inquiry` field is a `;`-delimited sequence of fixed blocks. Two
/// blocks that differ can still be considered a match:
///
/// - a block beginning with `VERIFY` is re-checked by splitting the
///   remainder on `/` and comparing as an unordered set (the bureau is free
///   to reorder verification codes between runs)
/// - a block beginning with `M-` is skipped unconditionally — it carries a
///   run-specific marker that is never expected to match
///
/// Any other mismatching block fails the whole comparison.
fn inquiry_blocks_match(current: &str, baseline: &str) -> bool {
    let cur_blocks: Vec<&str> = current.split(';').collect();
    let base_blocks: Vec<&str> = baseline.split(';').collect();
    cur_blocks
        .iter()
        .zip(base_blocks.iter())
        .all(|(cur_block, base_block)| {
            if cur_block == base_block {
                return true;
            }
            if cur_block.starts_with("VERIFY") && base_block.starts_with("VERIFY") {
                let cur_set: HashSet<&str> = cur_block.get(7..).unwrap_or("").split('/').collect();
                let base_set: HashSet<&str> =
                    base_block.get(7..).unwrap_or("").split('/').collect();
                return cur_set == base_set;
            }
            if cur_block.starts_with("M-") {
                return true;
            }
            false
        })
}

/// CCR: exact match on every key except `inquiry`, which gets the
/// block-level comparison in [`inquiry_blocks_match`].
pub fn ccr_base_validate(current: &Value, baseline: &Value) -> bool {
    let (Some(cur), Some(base)) = (current.as_object(), baseline.as_object()) else {
        return false;
    };
    let cur_keys: HashSet<&String> = cur.keys().collect();
    let base_keys: HashSet<&String> = base.keys().collect();
    if cur_keys != base_keys {
        return false;
    }
    cur.iter().all(|(key, cur_val)| {
        let base_val = &base[key];
        if key == "inquiry" {
            match (cur_val.as_str(), base_val.as_str()) {
                (Some(c), Some(b)) => inquiry_blocks_match(c, b),
                _ => cur_val == base_val,
            }
        } else {
            cur_val == base_val
        }
    })
}

/// Proctor, Pinning, Clarity, CrossCore (token and base), Criteria, and
/// Decision all require byte-exact request equality.
pub fn exact_match_validate(current: &Value, baseline: &Value) -> bool {
    current == baseline
}

/// ATB tolerates one dynamic value (the testcase id echoed back into the
/// request) but no dynamic keys.
pub fn atb_base_validate(current: &Value, baseline: &Value, ignore_values: &[Value]) -> bool {
    match_dicts_recursively(current, baseline, ignore_values, &[], None)
}

/// SageMaker tolerates a rotating `experian_consumer_key` but no dynamic
/// values elsewhere.
pub fn sagemaker_validate(current: &Value, baseline: &Value) -> bool {
    match_dicts_recursively(current, baseline, &[], &["experian_consumer_key"], None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_match_requires_identical_values() {
        let a = json!({"x": 1, "y": "two"});
        let b = json!({"x": 1, "y": "two"});
        let c = json!({"x": 1, "y": "three"});
        assert!(exact_match_validate(&a, &b));
        assert!(!exact_match_validate(&a, &c));
    }

    #[test]
    fn match_dicts_recursively_ignores_configured_key() {
        let current = json!({"experian_consumer_key": "abc123", "model_uid": "m1"});
        let baseline = json!({"experian_consumer_key": "zzz999", "model_uid": "m1"});
        assert!(sagemaker_validate(&current, &baseline));
    }

    #[test]
    fn match_dicts_recursively_rejects_unignored_mismatch() {
        let current = json!({"experian_consumer_key": "abc123", "model_uid": "m1"});
        let baseline = json!({"experian_consumer_key": "zzz999", "model_uid": "m2"});
        assert!(!sagemaker_validate(&current, &baseline));
    }

    #[test]
    fn match_dicts_recursively_rejects_differing_key_sets() {
        let current = json!({"a": 1});
        let baseline = json!({"a": 1, "b": 2});
        assert!(!match_dicts_recursively(&current, &baseline, &[], &[], None));
    }

    #[test]
    fn atb_validate_ignores_named_value_wherever_it_appears() {
        let current = json!({"testcase_id": "tc-1", "score": 700});
        let baseline = json!({"testcase_id": "tc-baseline", "score": 700});
        assert!(atb_base_validate(
            &current,
            &baseline,
            &[json!("tc-1"), json!("tc-baseline")]
        ));
    }

    #[test]
    fn ccr_validate_requires_exact_match_on_non_inquiry_keys() {
        let current = json!({"inquiry": "A;B", "applicant_type": "primary"});
        let baseline = json!({"inquiry": "A;B", "applicant_type": "secondary"});
        assert!(!ccr_base_validate(&current, &baseline));
    }

    #[test]
    fn ccr_validate_allows_verify_block_reordering() {
        let current = json!({"inquiry": "HDR01;VERIFY-1/2/3"});
        let baseline = json!({"inquiry": "HDR01;VERIFY-3/1/2"});
        assert!(ccr_base_validate(&current, &baseline));
    }

    #[test]
    fn ccr_validate_skips_m_dash_blocks_unconditionally() {
        let current = json!({"inquiry": "HDR01;M-anything-goes-here"});
        let baseline = json!({"inquiry": "HDR01;M-completely-different"});
        assert!(ccr_base_validate(&current, &baseline));
    }

    #[test]
    fn ccr_validate_rejects_other_mismatching_blocks() {
        let current = json!({"inquiry": "HDR01;PLAINBLOCK"});
        let baseline = json!({"inquiry": "HDR01;DIFFERENTBLOCK"});
        assert!(!ccr_base_validate(&current, &baseline));
    }
}
