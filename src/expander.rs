//! # Environment Expansion
//!
//! A dependency's settings live in an [`Environment`]: a mapping from key to
//! JSON value. String values may refer to other keys, so `"${name}.exe"`
//! resolves to `"Example.exe"` when `name` is `"Example"`. The order in which
//! keys are defined does not matter.
//!
//! ## Template syntax
//!
//! - `$$` is a literal dollar sign.
//! - `$name` refers to the key `name` (`[A-Za-z_][A-Za-z0-9_]*`).
//! - `${any-key}` refers to any key, including hyphenated ones.
//! - `${condition?primary:alternative}` resolves `primary` when `condition`
//!   holds a truthy value and `alternative` otherwise. An undefined
//!   `condition` counts as false, so optional flags can gate on absent keys.
//!
//! Lists and mappings are expanded element by element. Mapping keys are never
//! expanded.
//!
//! ## Caching and cycles
//!
//! Every successfully resolved key is cached for the lifetime of the
//! [`Expander`]; failed resolutions are not. Cycle detection uses a stack of
//! in-progress keys threaded through one top-level [`Expander::resolve`] call,
//! so an error in one resolution never leaks into the next.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Key/value settings of one dependency, in definition order.
pub type Environment = Map<String, Value>;

static TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$([A-Za-z_][A-Za-z0-9_]*)|\$\{([^}]*)\}")
        .expect("template pattern is a valid regex")
});

/// Returns `true` for the values a conditional treats as set.
///
/// Strings are compared case-insensitively against `1`, `YES`, `Y`, `TRUE`
/// and `ON`. The number 1 and boolean `true` are also truthy. Everything else,
/// including `null`, lists and mappings, is false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(
            s.to_uppercase().as_str(),
            "1" | "YES" | "Y" | "TRUE" | "ON"
        ),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Memoizing resolver over one [`Environment`].
#[derive(Debug, Clone)]
pub struct Expander {
    env: Environment,
    cache: HashMap<String, Value>,
}

impl Expander {
    /// Creates an expander over `env` with an empty cache.
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            cache: HashMap::new(),
        }
    }

    /// Whether `key` is defined, regardless of its value.
    pub fn has(&self, key: &str) -> bool {
        self.env.contains_key(key)
    }

    /// The unexpanded value of `key`.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.env.get(key)
    }

    /// All defined keys, in environment order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.env.keys().map(String::as_str)
    }

    /// Resolves `key` to its fully expanded value.
    ///
    /// # Errors
    ///
    /// - [`Error::UndefinedKey`] if `key`, or any key it references, is absent.
    /// - [`Error::RecursiveExpansion`] if `key` depends on itself.
    /// - [`Error::MalformedExpression`] for a conditional without `:`.
    /// - [`Error::Template`] if a list, mapping or null is referenced from
    ///   inside a string.
    pub fn resolve(&mut self, key: &str) -> Result<Value> {
        let mut in_progress = Vec::new();
        self.resolve_key(key, &mut in_progress)
    }

    /// Resolves every key, returning `(key, value)` pairs in environment order.
    pub fn items(&mut self) -> Result<Vec<(String, Value)>> {
        let keys: Vec<String> = self.env.keys().cloned().collect();
        keys.into_iter()
            .map(|key| {
                let value = self.resolve(&key)?;
                Ok((key, value))
            })
            .collect()
    }

    fn resolve_key(&mut self, key: &str, in_progress: &mut Vec<String>) -> Result<Value> {
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached.clone());
        }
        if let Some(start) = in_progress.iter().position(|k| k == key) {
            let mut chain: Vec<&str> = in_progress[start..].iter().map(String::as_str).collect();
            chain.push(key);
            return Err(Error::RecursiveExpansion {
                key: key.to_string(),
                chain: chain.join(" -> "),
            });
        }
        let raw = self
            .env
            .get(key)
            .cloned()
            .ok_or_else(|| Error::UndefinedKey {
                key: key.to_string(),
            })?;

        in_progress.push(key.to_string());
        let result = self.expand_value(&raw, in_progress);
        in_progress.pop();

        let value = result?;
        self.cache.insert(key.to_string(), value.clone());
        Ok(value)
    }

    fn expand_value(&mut self, value: &Value, in_progress: &mut Vec<String>) -> Result<Value> {
        match value {
            Value::String(s) => self.expand_str(s, in_progress).map(Value::String),
            Value::Array(items) => items
                .iter()
                .map(|item| self.expand_value(item, in_progress))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut expanded = Map::with_capacity(map.len());
                for (k, v) in map {
                    expanded.insert(k.clone(), self.expand_value(v, in_progress)?);
                }
                Ok(Value::Object(expanded))
            }
            Value::Bool(_) | Value::Number(_) | Value::Null => Ok(value.clone()),
        }
    }

    fn expand_str(&mut self, template: &str, in_progress: &mut Vec<String>) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in TEMPLATE.captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&template[last..whole.start()]);
            last = whole.end();
            out.push_str(&self.replace_match(&caps, in_progress)?);
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    fn replace_match(&mut self, caps: &Captures<'_>, in_progress: &mut Vec<String>) -> Result<String> {
        let expression = match (caps.get(1), caps.get(2)) {
            (Some(word), _) => word.as_str(),
            (None, Some(braced)) => braced.as_str(),
            (None, None) => return Ok("$".to_string()),
        };
        let expression = expression.trim();
        let (key, value) = if expression.contains('?') {
            self.expand_conditional(expression, in_progress)?
        } else {
            (expression, self.resolve_key(expression, in_progress)?)
        };
        render_scalar(key, value)
    }

    /// Evaluates `condition?primary:alternative`, returning the chosen key and
    /// its resolved value.
    fn expand_conditional<'e>(
        &mut self,
        expression: &'e str,
        in_progress: &mut Vec<String>,
    ) -> Result<(&'e str, Value)> {
        let malformed = || Error::MalformedExpression {
            expression: expression.to_string(),
        };
        let (condition, rest) = expression.split_once('?').ok_or_else(malformed)?;
        let (primary, alternative) = rest.split_once(':').ok_or_else(malformed)?;
        let (condition, primary, alternative) =
            (condition.trim(), primary.trim(), alternative.trim());

        let holds = if self.has(condition) {
            is_truthy(&self.resolve_key(condition, in_progress)?)
        } else {
            false
        };
        let chosen = if holds { primary } else { alternative };
        let value = self.resolve_key(chosen, in_progress)?;
        Ok((chosen, value))
    }
}

/// Converts a resolved value into the text spliced into a template.
fn render_scalar(key: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(Error::Template {
            message: format!("cannot substitute {} into a string", describe(&value)),
            variable: Some(key.to_string()),
        }),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expander(value: Value) -> Expander {
        match value {
            Value::Object(map) => Expander::new(map),
            other => panic!("test environment must be an object, got {other}"),
        }
    }

    #[test]
    fn test_plain_reference() {
        let mut exp = expander(json!({"name": "Example", "exe": "${name}.exe"}));
        assert_eq!(exp.resolve("exe").unwrap(), json!("Example.exe"));
    }

    #[test]
    fn test_bare_word_reference_stops_at_hyphen() {
        let mut exp = expander(json!({"archive": "a", "path": "$archive-path"}));
        assert_eq!(exp.resolve("path").unwrap(), json!("a-path"));
    }

    #[test]
    fn test_definition_order_is_irrelevant() {
        let mut exp = expander(json!({
            "c": "${b}/c",
            "b": "${a}/b",
            "a": "root",
        }));
        assert_eq!(exp.resolve("c").unwrap(), json!("root/b/c"));
    }

    #[test]
    fn test_dollar_escape() {
        let mut exp = expander(json!({"name": "x", "price": "$$name costs $$5"}));
        assert_eq!(exp.resolve("price").unwrap(), json!("$name costs $5"));
    }

    #[test]
    fn test_whitespace_inside_braces_is_trimmed() {
        let mut exp = expander(json!({"name": "x", "v": "${ name }"}));
        assert_eq!(exp.resolve("v").unwrap(), json!("x"));
    }

    #[test]
    fn test_undefined_key() {
        let mut exp = expander(json!({"a": "${missing}"}));
        match exp.resolve("a") {
            Err(Error::UndefinedKey { key }) => assert_eq!(key, "missing"),
            other => panic!("expected UndefinedKey, got {other:?}"),
        }
        assert!(matches!(
            exp.resolve("nope"),
            Err(Error::UndefinedKey { .. })
        ));
    }

    #[test]
    fn test_direct_cycle() {
        let mut exp = expander(json!({"a": "${a}"}));
        assert!(matches!(
            exp.resolve("a"),
            Err(Error::RecursiveExpansion { .. })
        ));
    }

    #[test]
    fn test_indirect_cycle_from_either_side() {
        let mut exp = expander(json!({"a": "${b}", "b": "${a}"}));
        match exp.resolve("a") {
            Err(Error::RecursiveExpansion { key, chain }) => {
                assert_eq!(key, "a");
                assert_eq!(chain, "a -> b -> a");
            }
            other => panic!("expected RecursiveExpansion, got {other:?}"),
        }
        assert!(matches!(
            exp.resolve("b"),
            Err(Error::RecursiveExpansion { .. })
        ));
    }

    #[test]
    fn test_failed_resolution_is_not_sticky() {
        let mut exp = expander(json!({"a": "${b}", "b": "${a}", "c": "ok"}));
        assert!(exp.resolve("a").is_err());
        // Nothing from the failed session remains in progress.
        assert_eq!(exp.resolve("c").unwrap(), json!("ok"));
        assert!(matches!(
            exp.resolve("a"),
            Err(Error::RecursiveExpansion { .. })
        ));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut exp = expander(json!({
            "root": "r",
            "left": "${root}-l",
            "right": "${root}-r",
            "top": "${left}+${right}",
        }));
        assert_eq!(exp.resolve("top").unwrap(), json!("r-l+r-r"));
    }

    #[test]
    fn test_memoized_result_is_identical() {
        let mut exp = expander(json!({"a": "x", "b": "${a}${a}"}));
        let first = exp.resolve("b").unwrap();
        let second = exp.resolve("b").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_conditional_truthy_values() {
        for flag in [json!(1), json!("Y"), json!("on"), json!(true), json!("yes"), json!("TRUE")] {
            let mut exp = expander(json!({
                "flag": flag,
                "yes": "picked-yes",
                "no": "picked-no",
                "v": "${flag?yes:no}",
            }));
            assert_eq!(exp.resolve("v").unwrap(), json!("picked-yes"), "flag {flag}");
        }
    }

    #[test]
    fn test_conditional_falsy_values() {
        for flag in [json!(0), json!("false"), json!("maybe"), json!(false), json!(null), json!([1])] {
            let mut exp = expander(json!({
                "flag": flag,
                "yes": "picked-yes",
                "no": "picked-no",
                "v": "${flag?yes:no}",
            }));
            assert_eq!(exp.resolve("v").unwrap(), json!("picked-no"), "flag {flag}");
        }
    }

    #[test]
    fn test_conditional_missing_condition_is_false() {
        let mut exp = expander(json!({
            "yes": "picked-yes",
            "no": "picked-no",
            "v": "${missing-key?yes:no}",
        }));
        assert_eq!(exp.resolve("v").unwrap(), json!("picked-no"));
    }

    #[test]
    fn test_conditional_branches_are_trimmed() {
        let mut exp = expander(json!({
            "flag": true,
            "yes": "Y",
            "no": "N",
            "v": "${ flag ? yes : no }",
        }));
        assert_eq!(exp.resolve("v").unwrap(), json!("Y"));
    }

    #[test]
    fn test_conditional_condition_is_itself_expanded() {
        let mut exp = expander(json!({
            "setting": "on",
            "flag": "${setting}",
            "yes": "Y",
            "no": "N",
            "v": "${flag?yes:no}",
        }));
        assert_eq!(exp.resolve("v").unwrap(), json!("Y"));
    }

    #[test]
    fn test_conditional_present_condition_with_undefined_reference_fails() {
        let mut exp = expander(json!({
            "flag": "${missing-key}",
            "yes": "Y",
            "no": "N",
            "v": "${flag?yes:no}",
        }));
        assert!(matches!(
            exp.resolve("v"),
            Err(Error::UndefinedKey { key }) if key == "missing-key"
        ));
    }

    #[test]
    fn test_conditional_chosen_branch_must_exist() {
        let mut exp = expander(json!({"flag": true, "no": "N", "v": "${flag?yes:no}"}));
        assert!(matches!(
            exp.resolve("v"),
            Err(Error::UndefinedKey { key }) if key == "yes"
        ));
    }

    #[test]
    fn test_malformed_conditional() {
        let mut exp = expander(json!({"flag": true, "v": "${flag?yes}"}));
        assert!(matches!(
            exp.resolve("v"),
            Err(Error::MalformedExpression { expression }) if expression == "flag?yes"
        ));
    }

    #[test]
    fn test_platform_selection_like_builtin_types() {
        let mut exp = expander(json!({
            "platform": "Linux-x64",
            "any-platform": "AnyPlatform",
            "platform-specific": false,
            "archive-platform": "${platform-specific?platform:any-platform}",
            "dest": "dependencies/${archive-platform}/",
        }));
        assert_eq!(exp.resolve("dest").unwrap(), json!("dependencies/AnyPlatform/"));
    }

    #[test]
    fn test_lists_and_mappings_are_expanded_structurally() {
        let mut exp = expander(json!({
            "name": "lib",
            "configure-args": ["--with-${name}", "--plain", 3, null],
            "nested": {"${name}": "${name}-value", "list": ["${name}"]},
        }));
        assert_eq!(
            exp.resolve("configure-args").unwrap(),
            json!(["--with-lib", "--plain", 3, null])
        );
        assert_eq!(
            exp.resolve("nested").unwrap(),
            json!({"${name}": "lib-value", "list": ["lib"]})
        );
    }

    #[test]
    fn test_scalars_pass_through() {
        let mut exp = expander(json!({"n": 0, "b": false, "z": null}));
        assert_eq!(exp.resolve("n").unwrap(), json!(0));
        assert_eq!(exp.resolve("b").unwrap(), json!(false));
        assert_eq!(exp.resolve("z").unwrap(), json!(null));
    }

    #[test]
    fn test_numbers_and_booleans_render_into_strings() {
        let mut exp = expander(json!({"n": 2, "b": true, "v": "${n}-${b}"}));
        assert_eq!(exp.resolve("v").unwrap(), json!("2-true"));
    }

    #[test]
    fn test_list_cannot_be_substituted_into_string() {
        let mut exp = expander(json!({"l": ["a"], "v": "x${l}"}));
        assert!(matches!(
            exp.resolve("v"),
            Err(Error::Template { variable: Some(v), .. }) if v == "l"
        ));
    }

    #[test]
    fn test_items_resolves_everything_in_order() {
        let mut exp = expander(json!({"b": "${a}!", "a": "x"}));
        let items = exp.items().unwrap();
        assert_eq!(
            items,
            vec![
                ("b".to_string(), json!("x!")),
                ("a".to_string(), json!("x")),
            ]
        );
    }

    #[test]
    fn test_has_and_raw() {
        let exp = expander(json!({"a": "${b}", "n": null}));
        assert!(exp.has("a"));
        assert!(exp.has("n"));
        assert!(!exp.has("b"));
        assert_eq!(exp.raw("a"), Some(&json!("${b}")));
        assert_eq!(exp.keys().collect::<Vec<_>>(), vec!["a", "n"]);
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!(1.0)));
        assert!(is_truthy(&json!("1")));
        assert!(is_truthy(&json!("y")));
        assert!(is_truthy(&json!("On")));
        assert!(!is_truthy(&json!(2)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!("no")));
        assert!(!is_truthy(&json!({})));
    }
}
