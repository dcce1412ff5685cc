//!
//! Binding, branching, functions and continuations.
//!
//! The forms here that shape evaluation (`quote`, `if`, `define`, ...)
//! receive their arguments unevaluated; the rest are ordinary by-value
//! functions. Anything that needs an argument's value first schedules it
//! with `eval_and_then` and finishes in a continuation callback.

use crate::eval::APPLY_DROP_RESCUE;
use crate::eval::APPLY_PUSH_EVAL;
use crate::interp::Interp;
use crate::modules;
use crate::value::{ObjRef, Value};

use super::PrimInfo;

pub(super) static PRIMITIVES: &[PrimInfo] = &[
    ("quote", cf_quote, false),
    ("if", cf_if, false),
    ("define", cf_define, false),
    ("set!", cf_set, false),
    ("lambda", cf_lambda, false),
    ("macro", cf_macro, false),
    ("rescue", cf_rescue, false),
    ("call/cc", cf_call_cc, true),
    ("call-with-current-continuation", cf_call_cc, true),
    ("error", cf_error, true),
    ("eval-in", cf_eval_in, true),
    ("apply", cf_apply, true),
    ("env", cf_env, true),
    ("set-env!", cf_set_env, true),
    ("top-env", cf_top_env, true),
    ("prefix", cf_prefix, true),
    ("modload", cf_modload, true),
];

fn cf_quote(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let v = interp.first(args);
    interp.values_push(v);
}

fn cf_if(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    if interp.list_len(args) < 3 {
        interp.error_with("bad arity", args);
        return;
    }
    let cond = interp.arg(args, 0);
    let ift = interp.arg(args, 1);
    let iff = interp.arg(args, 2);
    let branches = interp.new_pair(ift, iff);
    let env = interp.env();
    interp.eval_and_then(cond, env, branches, if_k);
}

fn if_k(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let cond = interp.first(args);
    let branch = if interp.truthy(cond) {
        interp.first(state)
    } else {
        interp.rest(state)
    };
    let env = interp.env();
    interp.push_apply(APPLY_PUSH_EVAL, branch, env);
}

fn cf_define(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let key = interp.arg(args, 0);
    let vexpr = interp.arg(args, 1);
    if key.is_nil() {
        interp.error_with("bad arity", args);
        return;
    }
    if interp.sym_of(key).is_none() {
        interp.error_with("define non-sym", key);
        return;
    }
    let env = interp.env();
    interp.eval_and_then(vexpr, env, key, define_k);
}

fn define_k(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let v = interp.first(args);
    let env = interp.env();
    interp.env_set_local(env, state, v);
    let t = interp.true_();
    interp.values_push(t);
}

fn cf_set(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let key = interp.arg(args, 0);
    let vexpr = interp.arg(args, 1);
    if key.is_nil() {
        interp.error_with("bad arity", args);
        return;
    }
    if interp.sym_of(key).is_none() {
        interp.error_with("define non-sym", key);
        return;
    }
    let env = interp.env();
    interp.eval_and_then(vexpr, env, key, set_k);
}

fn set_k(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let v = interp.first(args);
    let env = interp.env();
    interp.env_set_global(env, state, v);
    let t = interp.true_();
    interp.values_push(t);
}

fn cf_lambda(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let params = interp.first(args);
    let body = interp.rest(args);
    let env = interp.env();
    let f = interp.new_closure(params, body, env);
    interp.values_push(f);
}

fn cf_macro(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let params = interp.arg(args, 0);
    let env_name = interp.arg(args, 1);
    let body = interp.rest(interp.rest(args));
    let name = match interp.sym_of(env_name) {
        Some(name) => name,
        None => {
            interp.error_with("bad macro envname", env_name);
            return;
        }
    };
    let env = interp.env();
    let m = interp.new_macro(params, body, env, name);
    interp.values_push(m);
}

/// `(rescue thunk-expr)`: install a handler around both the evaluation
/// of the thunk expression and the call of its result. On error the
/// captured continuation delivers the error value as the whole form's
/// result.
fn cf_rescue(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let thunk_expr = interp.arg(args, 0);
    let handler = interp.capture();
    interp.rescue = interp.new_pair(handler, interp.rescue);
    let env = interp.env();
    interp.push_apply(APPLY_DROP_RESCUE, ObjRef::NIL, env);
    interp.eval_and_then(thunk_expr, env, ObjRef::NIL, rescue_k);
}

fn rescue_k(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let thunk = interp.first(args);
    if !interp.is_callable(thunk) {
        interp.error_with("not callable", thunk);
        return;
    }
    interp.queue_apply(thunk, ObjRef::NIL);
}

fn cf_call_cc(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let f = interp.arg(args, 0);
    if !interp.is_callable(f) {
        interp.error_with("not callable", f);
        return;
    }
    let k = interp.capture();
    let env = interp.env();
    interp.push_apply(1, f, env);
    interp.values_push(k);
}

/// With an argument, raise it; with none, return the pending error (or
/// `#f` when there is none).
fn cf_error(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    if args.is_nil() {
        let v = interp.error_get().unwrap_or_else(|| interp.false_());
        interp.values_push(v);
        return;
    }
    let v = interp.first(args);
    interp.error_set(v);
}

fn cf_eval_in(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let env = interp.arg(args, 0);
    let expr = interp.arg(args, 1);
    interp.push_apply(APPLY_PUSH_EVAL, expr, env);
}

/// `(apply f a b c)`: everything is already evaluated, so this is just a
/// tail call of `f`.
fn cf_apply(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let f = interp.first(args);
    let fargs = interp.rest(args);
    interp.queue_apply(f, fargs);
}

fn cf_env(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    if args.is_nil() {
        let env = interp.env();
        interp.values_push(env);
        return;
    }
    let f = interp.first(args);
    match interp.value(f) {
        Value::Closure { env, .. } | Value::Macro { env, .. } => {
            let env = *env;
            interp.values_push(env);
        }
        _ => interp.error_with("env of non-func", f),
    }
}

/// One argument replaces the current environment; two arguments rewrite
/// a function's captured environment in place.
fn cf_set_env(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let first = interp.arg(args, 0);
    if interp.rest(args).is_nil() {
        interp.env = first;
        let t = interp.true_();
        interp.values_push(t);
        return;
    }
    let new_env = interp.arg(args, 1);
    match interp.store.value_mut(first) {
        Value::Closure { env, .. } | Value::Macro { env, .. } => {
            *env = new_env;
            let t = interp.true_();
            interp.values_push(t);
        }
        _ => interp.error_with("set-env! on non-func", first),
    }
}

fn cf_top_env(interp: &mut Interp, _args: ObjRef, _state: ObjRef) {
    let top = interp.top_env();
    interp.values_push(top);
}

fn cf_prefix(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let sym = interp.arg(args, 0);
    let expander = interp.arg(args, 1);
    let ok = match interp.sym_of(sym) {
        Some(name) => !interp.sym_bytes(name).is_empty(),
        None => false,
    };
    if !ok {
        interp.error_with("bad prefix", sym);
        return;
    }
    if !interp.is_callable(expander) {
        interp.error_with("not callable", expander);
        return;
    }
    interp.add_prefix(sym, expander);
    let t = interp.true_();
    interp.values_push(t);
}

fn cf_modload(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let sym = interp.arg(args, 0);
    let name = match interp.sym_of(sym) {
        Some(name) => String::from_utf8_lossy(interp.sym_bytes(name)).into_owned(),
        None => {
            interp.error_with("bad module name", sym);
            return;
        }
    };
    let loaded = match interp.modload_hook() {
        Some(hook) => hook(interp, &name),
        None => modules::load_builtin(interp, &name),
    };
    let v = if loaded {
        interp.true_()
    } else {
        interp.false_()
    };
    interp.values_push(v);
}
