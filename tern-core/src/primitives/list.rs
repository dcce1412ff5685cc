//!
//! Pairs, lists and type inspection.
//!

use crate::interp::Interp;
use crate::value::ObjRef;

use super::PrimInfo;

pub(super) static PRIMITIVES: &[PrimInfo] = &[
    ("cons", cf_cons, true),
    ("car", cf_car, true),
    ("cdr", cf_cdr, true),
    ("list", cf_list, true),
    ("null?", cf_null, true),
    ("type", cf_type, true),
];

fn cf_cons(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let first = interp.arg(args, 0);
    let rest = interp.arg(args, 1);
    let p = interp.new_pair(first, rest);
    interp.values_push(p);
}

/// Heads of non-pairs are nil, quietly.
fn cf_car(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let v = interp.first(interp.arg(args, 0));
    interp.values_push(v);
}

fn cf_cdr(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let v = interp.rest(interp.arg(args, 0));
    interp.values_push(v);
}

fn cf_list(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    interp.values_push(args);
}

fn cf_null(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    if args.is_nil() {
        interp.error_with("bad arity", args);
        return;
    }
    let v = interp.arg(args, 0);
    let b = if v.is_nil() {
        interp.true_()
    } else {
        interp.false_()
    };
    interp.values_push(b);
}

fn cf_type(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let v = interp.arg(args, 0);
    let name = interp.value(v).kind_name();
    let sym = interp.new_sym_str(name);
    interp.values_push(sym);
}
