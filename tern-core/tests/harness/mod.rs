//! Shared driver for the integration tests: reads expressions from a
//! source string one at a time, evaluates each, and returns the value of
//! the last one.

use tern_core::eval::APPLY_PUSH_EVAL;
use tern_core::{BufferSource, Interp, ObjRef};

/// Continuation handed to the reader: park the parsed expression on the
/// value stack for the driver to pick up.
fn keep_value_k(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let v = interp.first(args);
    interp.values_push(v);
}

pub fn try_eval(interp: &mut Interp, src: &str) -> Result<ObjRef, String> {
    let mut buf = BufferSource::from(src.trim());
    let mut last = ObjRef::NIL;
    while !buf.is_empty() {
        interp.read_and_then(ObjRef::NIL, keep_value_k);
        interp.run_until_done(&mut buf);
        if let Some(err) = interp.error_get() {
            return Err(drain_error(interp, err));
        }
        let expr = match interp.values_pop() {
            Some((v, _)) => v,
            None => ObjRef::NIL,
        };
        // A nil read means the source ran out of expressions.
        if expr.is_nil() {
            break;
        }

        let env = interp.env();
        interp.push_apply(APPLY_PUSH_EVAL, expr, env);
        interp.run_until_done(&mut buf);
        if let Some(err) = interp.error_get() {
            return Err(drain_error(interp, err));
        }
        if let Some((v, _)) = interp.values_pop() {
            last = v;
        }
    }
    Ok(last)
}

fn drain_error(interp: &mut Interp, err: ObjRef) -> String {
    let msg = interp.print_str(err);
    interp.reset_stacks();
    interp.error_clear();
    interp.reset_env();
    msg
}

pub fn eval_str(interp: &mut Interp, src: &str) -> ObjRef {
    match try_eval(interp, src) {
        Ok(v) => v,
        Err(err) => panic!("unexpected error evaluating {:?}: {}", src, err),
    }
}
