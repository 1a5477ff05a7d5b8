//! Boa context wrapper: the executable unit loader and call surface.
//!
//! Every loaded unit owns a private `boa_engine::Context`, which gives the
//! isolation guarantee the engine relies on: two loads never share mutable
//! globals. The loader has two modes:
//!
//! - **Script mode**: the source is evaluated and the context's global
//!   object becomes the callable surface. Used by the stateless script
//!   cache.
//! - **Module mode**: the source must define a `main` entry function; the
//!   loader calls it and the returned object becomes the unit instance. If
//!   the instance exposes an `onLoad` hook it runs before the unit is
//!   returned, awaited if it yields a promise.
//!
//! The loader performs no caching; callers own caching and rollback policy.

use std::sync::Mutex;

use boa_engine::builtins::promise::PromiseState;
use boa_engine::object::builtins::JsPromise;
use boa_engine::object::JsObject;
use boa_engine::value::JsValue;
use boa_engine::{js_string, Context, Source};
use serde_json::Value as JsonValue;

use runlet_common::protocol::error::{Result, RunletError};

use crate::runtime::conversions::{js_value_to_json, json_to_js_value};

/// Name of the function a session module's entry file must define.
pub const ENTRY_FUNCTION: &str = "main";
/// Hook invoked on the instance right after the entry point returns it.
pub const ON_LOAD_HOOK: &str = "onLoad";
/// Hook invoked on the instance at session teardown.
pub const ON_DESTROY_HOOK: &str = "onDestroy";

/// A loaded, callable unit: a Boa context plus the object function names
/// resolve against (the global object in script mode, the entry-point
/// instance in module mode).
pub struct ScriptContext {
    inner: Mutex<ContextInner>,
}

struct ContextInner {
    ctx: Context,
    target: JsObject,
}

/// # Safety
///
/// Boa's `Context` has thread-local state and is neither `Send` nor `Sync`,
/// and `target` is a GC handle into it. Every access to either goes through
/// the `Mutex` in `inner` and no method leaks a reference that outlives the
/// lock, so exclusive access is enforced at runtime even when the unit is
/// shared behind an `Arc` across tokio tasks.
unsafe impl Send for ScriptContext {}

/// # Safety
///
/// See the `Send` impl: all interior access is serialized by the mutex.
unsafe impl Sync for ScriptContext {}

impl ScriptContext {
    /// Evaluates standalone script source in a fresh context. Functions
    /// defined at the top level become the unit's callable surface.
    pub fn load_script(source: &str) -> Result<Self> {
        let mut ctx = Context::default();
        ctx.eval(Source::from_bytes(source))
            .map_err(|e| RunletError::Load(format!("Script evaluation error: {e}")))?;

        let target = ctx.global_object();
        Ok(Self {
            inner: Mutex::new(ContextInner { ctx, target }),
        })
    }

    /// Evaluates a session module's entry source, instantiates it through
    /// its `main` entry point, and runs the `onLoad` hook if present.
    ///
    /// Every failure mode (evaluation error, missing or non-callable
    /// `main`, a non-object instance, a throwing or rejecting `onLoad`) is
    /// a `LoadError`; no partially constructed unit escapes.
    pub fn load_module(name: &str, source: &str) -> Result<Self> {
        let mut ctx = Context::default();
        ctx.eval(Source::from_bytes(source))
            .map_err(|e| RunletError::Load(format!("Module '{name}' evaluation error: {e}")))?;

        let entry = ctx
            .global_object()
            .get(js_string!(ENTRY_FUNCTION), &mut ctx)
            .map_err(|e| RunletError::Load(format!("Module '{name}': {e}")))?;
        let entry_fn = entry
            .as_object()
            .filter(|o| o.is_callable())
            .cloned()
            .ok_or_else(|| {
                RunletError::Load(format!(
                    "Module '{name}' defines no '{ENTRY_FUNCTION}' entry point"
                ))
            })?;

        let instance = entry_fn
            .call(&JsValue::undefined(), &[], &mut ctx)
            .map_err(|e| RunletError::Load(format!("Module '{name}' entry point failed: {e}")))?;
        let instance = resolve_value(instance, &mut ctx)
            .map_err(|e| RunletError::Load(format!("Module '{name}' entry point failed: {e}")))?;
        let target = instance.as_object().cloned().ok_or_else(|| {
            RunletError::Load(format!(
                "Module '{name}' entry point did not return an object"
            ))
        })?;

        if let Err(e) = invoke_hook(&target, ON_LOAD_HOOK, &mut ctx) {
            return Err(RunletError::Load(format!(
                "Module '{name}' {ON_LOAD_HOOK} hook failed: {e}"
            )));
        }

        tracing::debug!(module = %name, "Module instantiated");
        Ok(Self {
            inner: Mutex::new(ContextInner { ctx, target }),
        })
    }

    /// Whether the unit exposes an attribute with this name. Presence is
    /// what dispatch keys on; a present-but-not-callable attribute still
    /// claims the name and fails at invocation time.
    pub fn has_attribute(&self, name: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let ContextInner { ctx, target } = &mut *inner;
        target
            .get(js_string!(name), ctx)
            .map(|v| !v.is_undefined())
            .unwrap_or(false)
    }

    /// Resolves `name` on the unit and invokes it with `params` as the
    /// single keyword-arguments object, awaiting a returned promise.
    pub fn call_function(&self, name: &str, params: JsonValue) -> Result<JsonValue> {
        let mut inner = self.inner.lock().unwrap();
        let ContextInner { ctx, target } = &mut *inner;

        let value = target
            .get(js_string!(name), ctx)
            .map_err(|e| RunletError::Execution(format!("Function '{name}' lookup error: {e}")))?;
        if value.is_undefined() {
            return Err(RunletError::NotFound(format!("Function '{name}' not found")));
        }
        let func = value
            .as_object()
            .filter(|o| o.is_callable())
            .cloned()
            .ok_or_else(|| RunletError::Execution(format!("'{name}' is not callable")))?;

        let args = json_to_js_value(params, ctx)?;
        let this = JsValue::from(target.clone());
        let result = func
            .call(&this, &[args], ctx)
            .map_err(|e| RunletError::Execution(format!("Function '{name}' execution error: {e}")))?;
        let result = resolve_value(result, ctx)
            .map_err(|e| RunletError::Execution(format!("Function '{name}' execution error: {e}")))?;

        js_value_to_json(result, ctx)
    }

    /// Invokes a lifecycle hook if the unit exposes it, awaiting a returned
    /// promise. Returns `Ok(false)` when the hook is absent.
    pub fn run_hook(&self, hook: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let ContextInner { ctx, target } = &mut *inner;
        invoke_hook(target, hook, ctx).map_err(RunletError::Execution)
    }

    /// Gives the reflector locked access to the unit's target object.
    pub(crate) fn with_target<R>(&self, f: impl FnOnce(&JsObject, &mut Context) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        let ContextInner { ctx, target } = &mut *inner;
        f(target, ctx)
    }
}

/// Drains the context's job queue and unwraps a settled promise result.
///
/// The engine has no external event sources, so a promise still pending
/// after the queue drains can never settle; that is reported as an error
/// rather than blocking.
fn resolve_value(value: JsValue, ctx: &mut Context) -> std::result::Result<JsValue, String> {
    let Some(obj) = value.as_object().cloned() else {
        return Ok(value);
    };
    let Ok(promise) = JsPromise::from_object(obj) else {
        return Ok(value);
    };

    let _ = ctx.run_jobs();
    match promise.state() {
        PromiseState::Fulfilled(v) => Ok(v),
        PromiseState::Rejected(err) => Err(err
            .to_string(ctx)
            .map(|s| s.to_std_string_escaped())
            .unwrap_or_else(|_| "promise rejected".into())),
        PromiseState::Pending => Err("promise did not settle".into()),
    }
}

fn invoke_hook(
    target: &JsObject,
    hook: &str,
    ctx: &mut Context,
) -> std::result::Result<bool, String> {
    let value = target
        .get(js_string!(hook), ctx)
        .map_err(|e| e.to_string())?;
    let Some(func) = value.as_object().filter(|o| o.is_callable()).cloned() else {
        return Ok(false);
    };

    let this = JsValue::from(target.clone());
    let result = func.call(&this, &[], ctx).map_err(|e| e.to_string())?;
    resolve_value(result, ctx)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_script_and_call() {
        let unit = ScriptContext::load_script(
            r#"
            function double(args) {
                return args.x * 2;
            }
        "#,
        )
        .unwrap();

        let result = unit.call_function("double", json!({"x": 21})).unwrap();
        assert_eq!(result, json!(42));
    }

    #[test]
    fn load_script_with_syntax_error_fails() {
        let result = ScriptContext::load_script("this is not valid javascript ))");
        assert!(matches!(result, Err(RunletError::Load(_))));
    }

    #[test]
    fn missing_function_is_not_found() {
        let unit = ScriptContext::load_script("void 0;").unwrap();
        let result = unit.call_function("nope", json!({}));
        assert!(matches!(result, Err(RunletError::NotFound(_))));
    }

    #[test]
    fn throwing_function_is_execution_error() {
        let unit = ScriptContext::load_script(
            r#"
            function broken() {
                throw new Error('intentional');
            }
        "#,
        )
        .unwrap();

        let result = unit.call_function("broken", json!({}));
        assert!(matches!(result, Err(RunletError::Execution(_))));
    }

    #[test]
    fn promise_result_is_resolved() {
        let unit = ScriptContext::load_script(
            r#"
            function deferred() {
                return Promise.resolve(7);
            }
        "#,
        )
        .unwrap();

        let result = unit.call_function("deferred", json!({})).unwrap();
        assert_eq!(result, json!(7));
    }

    #[test]
    fn rejected_promise_is_execution_error() {
        let unit = ScriptContext::load_script(
            r#"
            function doomed() {
                return Promise.reject('no luck');
            }
        "#,
        )
        .unwrap();

        let result = unit.call_function("doomed", json!({}));
        assert!(matches!(result, Err(RunletError::Execution(_))));
    }

    #[test]
    fn two_loads_do_not_share_globals() {
        let src = r#"
            var counter = 0;
            function bump() {
                counter += 1;
                return counter;
            }
        "#;
        let a = ScriptContext::load_script(src).unwrap();
        let b = ScriptContext::load_script(src).unwrap();

        assert_eq!(a.call_function("bump", json!({})).unwrap(), json!(1));
        assert_eq!(a.call_function("bump", json!({})).unwrap(), json!(2));
        // b has its own namespace, unaffected by a's mutations
        assert_eq!(b.call_function("bump", json!({})).unwrap(), json!(1));
    }

    #[test]
    fn load_module_instantiates_entry_point() {
        let unit = ScriptContext::load_module(
            "calc",
            r#"
            function main() {
                return {
                    add: function(args) { return args.a + args.b; }
                };
            }
        "#,
        )
        .unwrap();

        let result = unit.call_function("add", json!({"a": 2, "b": 3})).unwrap();
        assert_eq!(result, json!(5));
    }

    #[test]
    fn load_module_without_entry_point_fails() {
        let result = ScriptContext::load_module("m", "var x = 1;");
        assert!(matches!(result, Err(RunletError::Load(_))));
    }

    #[test]
    fn load_module_with_non_object_instance_fails() {
        let result = ScriptContext::load_module("m", "function main() { return 42; }");
        assert!(matches!(result, Err(RunletError::Load(_))));
    }

    #[test]
    fn on_load_hook_runs_before_unit_is_ready() {
        let unit = ScriptContext::load_module(
            "m",
            r#"
            function main() {
                return {
                    ready: false,
                    onLoad: function() { this.ready = true; },
                    isReady: function() { return this.ready; }
                };
            }
        "#,
        )
        .unwrap();

        assert_eq!(unit.call_function("isReady", json!({})).unwrap(), json!(true));
    }

    #[test]
    fn throwing_on_load_hook_fails_the_load() {
        let result = ScriptContext::load_module(
            "m",
            r#"
            function main() {
                return {
                    onLoad: function() { throw new Error('setup failed'); }
                };
            }
        "#,
        );
        assert!(matches!(result, Err(RunletError::Load(_))));
    }

    #[test]
    fn async_on_load_hook_is_awaited() {
        let unit = ScriptContext::load_module(
            "m",
            r#"
            function main() {
                return {
                    state: "new",
                    onLoad: async function() { this.state = "loaded"; },
                    state_of: function() { return this.state; }
                };
            }
        "#,
        )
        .unwrap();

        assert_eq!(
            unit.call_function("state_of", json!({})).unwrap(),
            json!("loaded")
        );
    }

    #[test]
    fn run_hook_reports_absence() {
        let unit = ScriptContext::load_module("m", "function main() { return {}; }").unwrap();
        assert!(!unit.run_hook(ON_DESTROY_HOOK).unwrap());
    }

    #[test]
    fn run_hook_invokes_destroy() {
        let unit = ScriptContext::load_module(
            "m",
            r#"
            function main() {
                return {
                    onDestroy: function() { return "bye"; }
                };
            }
        "#,
        )
        .unwrap();
        assert!(unit.run_hook(ON_DESTROY_HOOK).unwrap());
    }

    #[test]
    fn has_attribute_sees_non_callable_members() {
        let unit = ScriptContext::load_module(
            "m",
            r#"
            function main() {
                return { flag: true };
            }
        "#,
        )
        .unwrap();
        assert!(unit.has_attribute("flag"));
        assert!(!unit.has_attribute("missing"));
        // claimed but not callable: invocation fails, lookup succeeds
        assert!(matches!(
            unit.call_function("flag", json!({})),
            Err(RunletError::Execution(_))
        ));
    }
}
