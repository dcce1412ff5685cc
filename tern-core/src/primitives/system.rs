//!
//! Output, input and collection control.
//!

use crate::interp::Interp;
use crate::value::ObjRef;

use super::PrimInfo;

pub(super) static PRIMITIVES: &[PrimInfo] = &[
    ("display", cf_display, true),
    ("read", cf_read, true),
    ("gc", cf_gc, true),
];

/// Print each argument to the host sink, tab separated, newline at the
/// end.
fn cf_display(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let mut cur = args;
    while !cur.is_nil() {
        let item = interp.first(cur);
        interp.print(item);
        interp.emit("\t");
        cur = interp.rest(cur);
    }
    interp.emit("\n");
    let t = interp.true_();
    interp.values_push(t);
}

/// Read one expression from the host input. Suspends the evaluation
/// until the bytes arrive.
fn cf_read(interp: &mut Interp, _args: ObjRef, _state: ObjRef) {
    interp.read_and_then(ObjRef::NIL, read_k);
}

fn read_k(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let v = interp.first(args);
    interp.values_push(v);
}

fn cf_gc(interp: &mut Interp, _args: ObjRef, _state: ObjRef) {
    interp.collect();
    let t = interp.true_();
    interp.values_push(t);
}
