//! Property-based tests for template expansion and archive path stripping.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::archive::strip_leading_segments;
    use crate::expander::{is_truthy, Environment, Expander};
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn single(key: &str, value: Value) -> Expander {
        let mut env = Environment::new();
        env.insert(key.to_string(), value);
        Expander::new(env)
    }

    // ============================================================================
    // Expander property tests
    // ============================================================================

    proptest! {
        /// Property: strings without '$' resolve to themselves
        #[test]
        fn plain_strings_are_unchanged(text in "[^$]*") {
            let mut expander = single("k", json!(text.clone()));
            prop_assert_eq!(expander.resolve("k").unwrap(), json!(text));
        }

        /// Property: "$$" always collapses to a single '$'
        #[test]
        fn double_dollar_is_literal(prefix in "[a-z ]*", suffix in "[a-z ]*") {
            let mut expander = single("k", json!(format!("{prefix}$${suffix}")));
            prop_assert_eq!(
                expander.resolve("k").unwrap(),
                json!(format!("{prefix}${suffix}"))
            );
        }

        /// Property: a string reference inlines the referenced string verbatim
        #[test]
        fn reference_inlines_value(value in "[^$]*", key in "k-[a-z0-9-]{0,12}") {
            let mut env = Environment::new();
            env.insert(key.clone(), json!(value.clone()));
            env.insert("out".to_string(), json!(format!("<${{{key}}}>")));
            let mut expander = Expander::new(env);
            prop_assert_eq!(expander.resolve("out").unwrap(), json!(format!("<{value}>")));
        }

        /// Property: resolution is deterministic across repeated calls
        #[test]
        fn resolve_is_stable(value in "[a-z]{0,8}") {
            let mut env = Environment::new();
            env.insert("a".to_string(), json!(value));
            env.insert("b".to_string(), json!("${a}-${a}"));
            let mut expander = Expander::new(env);
            let first = expander.resolve("b").unwrap();
            let second = expander.resolve("b").unwrap();
            prop_assert_eq!(first, second);
        }

        /// Property: non-string scalars resolve to themselves
        #[test]
        fn numbers_are_unchanged(n in any::<i64>()) {
            let mut expander = single("k", json!(n));
            prop_assert_eq!(expander.resolve("k").unwrap(), json!(n));
        }

        /// Property: a conditional picks exactly one branch
        #[test]
        fn conditional_picks_branch(flag in any::<bool>()) {
            let mut env = Environment::new();
            env.insert("flag".to_string(), json!(flag));
            env.insert("yes".to_string(), json!("Y"));
            env.insert("no".to_string(), json!("N"));
            env.insert("out".to_string(), json!("${flag?yes:no}"));
            let mut expander = Expander::new(env);
            let expected = if flag { "Y" } else { "N" };
            prop_assert_eq!(expander.resolve("out").unwrap(), json!(expected));
        }

        /// Property: truthiness of strings ignores case
        #[test]
        fn truthy_ignores_case(word in prop::sample::select(vec!["yes", "y", "true", "on", "1"]), upper in any::<bool>()) {
            let text = if upper { word.to_uppercase() } else { word.to_string() };
            prop_assert!(is_truthy(&json!(text)));
        }
    }

    // ============================================================================
    // strip_leading_segments property tests
    // ============================================================================

    proptest! {
        /// Property: stripping zero segments keeps every segment
        #[test]
        fn strip_zero_keeps_segments(segments in prop::collection::vec("[a-z]{1,6}", 1..5)) {
            let name = segments.join("/");
            let stripped = strip_leading_segments(&name, 0).unwrap();
            prop_assert_eq!(stripped.components().count(), segments.len());
        }

        /// Property: stripping removes exactly `count` leading segments
        #[test]
        fn strip_removes_prefix(segments in prop::collection::vec("[a-z]{1,6}", 1..6), count in 0usize..6) {
            let name = segments.join("/");
            let stripped = strip_leading_segments(&name, count);
            if count < segments.len() {
                let stripped = stripped.unwrap();
                prop_assert_eq!(stripped.components().count(), segments.len() - count);
            } else {
                prop_assert!(stripped.is_none() || stripped.unwrap().as_os_str().is_empty());
            }
        }

        /// Property: stripped paths never escape the destination
        #[test]
        fn strip_never_escapes(segments in prop::collection::vec("[a-z.]{1,4}", 1..5), count in 0usize..3) {
            let name = segments.join("/");
            if let Some(path) = strip_leading_segments(&name, count) {
                prop_assert!(!path.is_absolute());
                prop_assert!(!path
                    .components()
                    .any(|c| matches!(c, std::path::Component::ParentDir)));
            }
        }
    }
}
