//!
//! Integer arithmetic and comparison.
//!
//! Arithmetic is variadic over wrapping machine integers. Subtraction
//! and division treat their first argument as the seed and fold the
//! rest; with no arguments they yield their identity element.

use std::cmp::Ordering;

use crate::interp::Interp;
use crate::value::{ObjRef, Value};

use super::PrimInfo;

pub(super) static PRIMITIVES: &[PrimInfo] = &[
    ("+", cf_add, true),
    ("-", cf_sub, true),
    ("*", cf_mul, true),
    ("/", cf_div, true),
    ("%", cf_mod, true),
    ("=", cf_eq, true),
    ("<", cf_less, true),
    (">", cf_greater, true),
    ("<=", cf_less_eq, true),
    (">=", cf_greater_eq, true),
    ("nand", cf_nand, true),
];

/// Collect the arguments as integers, raising `<op> on non-int` at the
/// first offender.
fn int_args(interp: &mut Interp, args: ObjRef, op: &str) -> Option<Vec<i64>> {
    let mut out = Vec::new();
    let mut cur = args;
    while !cur.is_nil() {
        let item = interp.first(cur);
        match interp.int_of(item) {
            Some(i) => out.push(i),
            None => {
                interp.error_with(&format!("{} on non-int", op), item);
                return None;
            }
        }
        cur = interp.rest(cur);
    }
    Some(out)
}

fn cf_add(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    if let Some(vs) = int_args(interp, args, "+") {
        let sum = vs.iter().fold(0i64, |acc, &v| acc.wrapping_add(v));
        let r = interp.new_int(sum);
        interp.values_push(r);
    }
}

fn cf_sub(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    if let Some(vs) = int_args(interp, args, "-") {
        let res = match vs.split_first() {
            Some((&seed, rest)) => rest.iter().fold(seed, |acc, &v| acc.wrapping_sub(v)),
            None => 0,
        };
        let r = interp.new_int(res);
        interp.values_push(r);
    }
}

fn cf_mul(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    if let Some(vs) = int_args(interp, args, "*") {
        let prod = vs.iter().fold(1i64, |acc, &v| acc.wrapping_mul(v));
        let r = interp.new_int(prod);
        interp.values_push(r);
    }
}

fn cf_div(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    if let Some(vs) = int_args(interp, args, "/") {
        let mut acc = match vs.first() {
            Some(&seed) => seed,
            None => 1,
        };
        for &v in vs.iter().skip(1) {
            if v == 0 {
                interp.error_with("divide by zero", args);
                return;
            }
            acc = acc.wrapping_div(v);
        }
        let r = interp.new_int(acc);
        interp.values_push(r);
    }
}

fn cf_mod(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    if let Some(vs) = int_args(interp, args, "%") {
        let mut acc = match vs.first() {
            Some(&seed) => seed,
            None => 1,
        };
        for &v in vs.iter().skip(1) {
            if v == 0 {
                interp.error_with("divide by zero", args);
                return;
            }
            acc = acc.wrapping_rem(v);
        }
        let r = interp.new_int(acc);
        interp.values_push(r);
    }
}

fn cf_eq(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let a = interp.arg(args, 0);
    let b = interp.arg(args, 1);
    let eq = match (interp.value(a), interp.value(b)) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Sym(x), Value::Sym(y)) => x == y,
        _ => a == b,
    };
    push_bool(interp, eq);
}

/// Ints and symbols order among themselves; symbols sort shortest
/// first, then bytewise. Anything else is unsortable.
fn compare(interp: &mut Interp, a: ObjRef, b: ObjRef) -> Option<Ordering> {
    match (interp.value(a), interp.value(b)) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Sym(x), Value::Sym(y)) => Some(interp.ns.cmp_names(*x, *y)),
        _ => {
            let msg = interp.new_sym_str("unsortable types");
            let head = interp.new_pair(msg, a);
            let err = interp.new_pair(head, b);
            interp.error_set(err);
            None
        }
    }
}

fn cf_less(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let a = interp.arg(args, 0);
    let b = interp.arg(args, 1);
    if let Some(ord) = compare(interp, a, b) {
        push_bool(interp, ord == Ordering::Less);
    }
}

fn cf_greater(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let a = interp.arg(args, 0);
    let b = interp.arg(args, 1);
    if let Some(ord) = compare(interp, a, b) {
        push_bool(interp, ord == Ordering::Greater);
    }
}

fn cf_less_eq(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let a = interp.arg(args, 0);
    let b = interp.arg(args, 1);
    if let Some(ord) = compare(interp, a, b) {
        push_bool(interp, ord != Ordering::Greater);
    }
}

fn cf_greater_eq(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let a = interp.arg(args, 0);
    let b = interp.arg(args, 1);
    if let Some(ord) = compare(interp, a, b) {
        push_bool(interp, ord != Ordering::Less);
    }
}

fn cf_nand(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let a = interp.arg(args, 0);
    let b = interp.arg(args, 1);
    let res = !(interp.truthy(a) && interp.truthy(b));
    push_bool(interp, res);
}

fn push_bool(interp: &mut Interp, b: bool) {
    let v = if b { interp.true_() } else { interp.false_() };
    interp.values_push(v);
}
