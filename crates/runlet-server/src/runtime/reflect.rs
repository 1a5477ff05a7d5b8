//! Interface reflector.
//!
//! Builds the client-facing description of a loaded unit's public surface:
//! method names, parameter names parsed out of the function source, and
//! types inferred from default-value literals where present. This is
//! tooling metadata only; anything the reflector cannot make sense of
//! degrades to `any` instead of failing the upload.

use boa_engine::object::JsObject;
use boa_engine::property::PropertyKey;
use boa_engine::Context;

use crate::runtime::context::{ScriptContext, ENTRY_FUNCTION, ON_DESTROY_HOOK, ON_LOAD_HOOK};

struct MethodInfo {
    name: String,
    params: Vec<ParamInfo>,
    returns: &'static str,
}

struct ParamInfo {
    name: String,
    ty: &'static str,
}

/// Renders the interface description for one module's unit.
///
/// Public methods are the unit's own callable properties whose names do not
/// start with `_`, excluding the entry point and the lifecycle hooks.
pub fn describe_interface(module: &str, unit: &ScriptContext) -> String {
    let methods = unit.with_target(collect_methods);

    let mut out = format!("module {module}:\n");
    if methods.is_empty() {
        out.push_str("  (no public methods)\n");
        return out;
    }
    for method in methods {
        let params = method
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("  {}({}) -> {}\n", method.name, params, method.returns));
    }
    out
}

fn collect_methods(target: &JsObject, ctx: &mut Context) -> Vec<MethodInfo> {
    let Ok(keys) = target.own_property_keys(ctx) else {
        return Vec::new();
    };

    let mut methods = Vec::new();
    for key in keys {
        let PropertyKey::String(s) = &key else {
            continue;
        };
        let Ok(name) = s.to_std_string() else {
            continue;
        };
        if name.starts_with('_')
            || name == ENTRY_FUNCTION
            || name == ON_LOAD_HOOK
            || name == ON_DESTROY_HOOK
        {
            continue;
        }

        let Ok(value) = target.get(key.clone(), ctx) else {
            continue;
        };
        if !value.as_object().map_or(false, |o| o.is_callable()) {
            continue;
        }

        // Function.prototype.toString gives us the source, which is the
        // only place parameter names survive to.
        let params = value
            .to_string(ctx)
            .ok()
            .map(|src| parse_params(&src.to_std_string_escaped()))
            .unwrap_or_default();

        methods.push(MethodInfo {
            name,
            params,
            returns: "any",
        });
    }

    methods.sort_by(|a, b| a.name.cmp(&b.name));
    methods
}

/// Extracts the parameter list from a function's source text.
fn parse_params(source: &str) -> Vec<ParamInfo> {
    let Some(list) = parameter_list(source) else {
        return Vec::new();
    };

    split_top_level(&list)
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|param| match param.split_once('=') {
            Some((name, default)) => ParamInfo {
                name: name.trim().to_string(),
                ty: infer_type(default),
            },
            None => ParamInfo {
                name: param.trim().to_string(),
                ty: "any",
            },
        })
        .collect()
}

/// Finds the text between the first `(` and its matching `)`. An arrow
/// function without parentheses contributes its single bare parameter.
fn parameter_list(source: &str) -> Option<String> {
    let open = match source.find('(') {
        Some(i) => i,
        None => {
            let head = source.split("=>").next()?.trim();
            return (!head.is_empty()).then(|| head.to_string());
        }
    };

    let mut depth = 0usize;
    for (i, c) in source[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(source[open + 1..open + i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits a parameter list on commas, ignoring commas nested in brackets
/// or string literals (destructuring patterns, array defaults).
fn split_top_level(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;

    for c in list.chars() {
        if let Some(quote) = in_string {
            current.push(c);
            if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                in_string = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Maps a default-value literal onto the fixed type vocabulary.
fn infer_type(default: &str) -> &'static str {
    let d = default.trim();
    if d.starts_with('"') || d.starts_with('\'') {
        "text"
    } else if d == "true" || d == "false" {
        "boolean"
    } else if d.starts_with('[') {
        "array"
    } else if d.starts_with('{') {
        "object"
    } else if d.parse::<f64>().is_ok() {
        "number"
    } else {
        "any"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(src: &str) -> ScriptContext {
        ScriptContext::load_module("m", src).unwrap()
    }

    #[test]
    fn lists_public_methods_with_params() {
        let unit = load(
            r#"
            function main() {
                return {
                    add: function(a, b) { return a + b; },
                    greet: function(name) { return "hi " + name; }
                };
            }
        "#,
        );

        let desc = describe_interface("calc", &unit);
        assert!(desc.starts_with("module calc:\n"));
        assert!(desc.contains("add(a: any, b: any) -> any"));
        assert!(desc.contains("greet(name: any) -> any"));
    }

    #[test]
    fn infers_types_from_default_literals() {
        let unit = load(
            r#"
            function main() {
                return {
                    configure: function(count = 10, label = "x", strict = true, tags = []) {
                        return null;
                    }
                };
            }
        "#,
        );

        let desc = describe_interface("m", &unit);
        assert!(desc.contains("count: number"));
        assert!(desc.contains("label: text"));
        assert!(desc.contains("strict: boolean"));
        assert!(desc.contains("tags: array"));
    }

    #[test]
    fn omits_hooks_underscore_members_and_data() {
        let unit = load(
            r#"
            function main() {
                return {
                    run: function() { return 1; },
                    _internal: function() { return 2; },
                    onLoad: function() {},
                    onDestroy: function() {},
                    counter: 0
                };
            }
        "#,
        );

        let desc = describe_interface("m", &unit);
        assert!(desc.contains("run()"));
        assert!(!desc.contains("_internal"));
        assert!(!desc.contains("onLoad"));
        assert!(!desc.contains("onDestroy"));
        assert!(!desc.contains("counter"));
    }

    #[test]
    fn unit_without_methods_degrades_gracefully() {
        let unit = load("function main() { return { value: 3 }; }");
        let desc = describe_interface("m", &unit);
        assert!(desc.contains("(no public methods)"));
    }

    #[test]
    fn parse_params_handles_arrows_and_destructuring() {
        let params = parse_params("(a, {b, c}, d = 5) => a");
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].name, "a");
        assert_eq!(params[2].name, "d");
        assert_eq!(params[2].ty, "number");

        let bare = parse_params("x => x * 2");
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].name, "x");
    }
}
