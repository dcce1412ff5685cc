//!
//! Facilities for reading expressions.
//!
//! The reader is written against the same continuation stacks as the
//! evaluator: every state is a callback resumed with one byte of input,
//! so a whole parse can suspend mid-token whenever the host has no bytes
//! ready. Interactive hosts get incremental parsing for free.
//!
//! Syntax: lists in parentheses with `.` for an improper tail, `;`
//! comments to end of line, integers with an optional leading `-`,
//! double-quoted symbols (no escapes), registered single-byte prefixes,
//! and bare symbols terminated by whitespace or a parenthesis.

use crate::interp::Interp;
use crate::value::{NativeFn, ObjRef};

impl Interp {
    /// Read one expression, then invoke `func` with it. At end of input
    /// a toplevel read delivers nil; a partial form is an error.
    pub fn read_and_then(&mut self, state: ObjRef, func: NativeFn) {
        let k = self.new_then(func, state, Some("read-done"));
        want_byte(self, rd_expr, k, "rd-expr");
    }

    /// Return one byte to the reader. Serves the next input request
    /// before the host is consulted again.
    pub(crate) fn putback(&mut self, b: u8) {
        debug_assert!(self.pushback.is_none());
        self.pushback = Some(b);
    }
}

/// Suspend until a byte arrives, then resume `func` with it.
fn want_byte(interp: &mut Interp, func: NativeFn, state: ObjRef, name: &'static str) {
    let env = interp.env();
    let k = interp.new_then(func, state, Some(name));
    interp.push_apply(1, k, env);
    interp.push_apply(crate::eval::APPLY_GETCHAR, ObjRef::NIL, env);
}

/// Hand a finished expression to its consumer.
fn deliver(interp: &mut Interp, k: ObjRef, v: ObjRef) {
    let env = interp.env();
    interp.push_apply(1, k, env);
    interp.values_push(v);
}

/// Start reading a nested expression whose result goes to `func` with
/// `state`.
fn nested_read(interp: &mut Interp, func: NativeFn, state: ObjRef, name: &'static str) {
    let k = interp.new_then(func, state, Some(name));
    want_byte(interp, rd_expr, k, "rd-expr");
}

fn byte_of(interp: &Interp, args: ObjRef) -> i64 {
    interp.int_of(interp.first(args)).unwrap_or(-1)
}

fn is_ws(b: u8) -> bool {
    b.is_ascii_whitespace()
}

/// Top of an expression. State is the consumer.
fn rd_expr(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let k = state;
    let b = byte_of(interp, args);
    if b < 0 {
        deliver(interp, k, ObjRef::NIL);
        return;
    }
    let b = b as u8;
    if is_ws(b) {
        want_byte(interp, rd_expr, k, "rd-expr");
    } else if b == b';' {
        want_byte(interp, rd_comment, k, "rd-comment");
    } else if b == b'(' {
        let st = interp.new_pair(k, ObjRef::NIL);
        want_byte(interp, rd_list, st, "rd-list");
    } else if b == b'"' {
        let st = interp.new_pair(k, ObjRef::NIL);
        want_byte(interp, rd_string, st, "rd-string");
    } else if b == b')' {
        interp.error_str("malformed form");
    } else if b.is_ascii_digit() {
        let sign = interp.new_int(1);
        let acc = interp.new_int((b - b'0') as i64);
        let num = interp.new_pair(sign, acc);
        let st = interp.new_pair(k, num);
        want_byte(interp, rd_num, st, "rd-num");
    } else if let Some(expander) = prefix_for(interp, b) {
        let st = interp.new_pair(k, expander);
        nested_read(interp, rd_prefix, st, "rd-prefix");
    } else {
        let byte = interp.new_int(b as i64);
        let acc = interp.new_pair(byte, ObjRef::NIL);
        let st = interp.new_pair(k, acc);
        want_byte(interp, rd_sym, st, "rd-sym");
    }
}

/// Comment outside a list: skip to newline, then try again.
fn rd_comment(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let b = byte_of(interp, args);
    if b < 0 {
        deliver(interp, state, ObjRef::NIL);
    } else if b == b'\n' as i64 {
        want_byte(interp, rd_expr, state, "rd-expr");
    } else {
        want_byte(interp, rd_comment, state, "rd-comment");
    }
}

/// Inside a list, between elements. State is `(consumer . items)` with
/// the elements read so far in reverse.
fn rd_list(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let b = byte_of(interp, args);
    if b < 0 {
        interp.error_str("eof while reading");
        return;
    }
    let b = b as u8;
    if is_ws(b) {
        want_byte(interp, rd_list, state, "rd-list");
    } else if b == b')' {
        let k = interp.first(state);
        let items = interp.rest(state);
        let result = interp.list_rvs(items);
        deliver(interp, k, result);
    } else if b == b';' {
        want_byte(interp, rd_list_comment, state, "rd-list-comment");
    } else {
        interp.putback(b);
        nested_read(interp, rd_list_item, state, "rd-list-item");
    }
}

/// Comment inside a list: end of input here is a real error.
fn rd_list_comment(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let b = byte_of(interp, args);
    if b < 0 {
        interp.error_str("eof while reading");
    } else if b == b'\n' as i64 {
        want_byte(interp, rd_list, state, "rd-list");
    } else {
        want_byte(interp, rd_list_comment, state, "rd-list-comment");
    }
}

/// One list element came back. A lone `.` symbol switches to reading
/// the improper tail.
fn rd_list_item(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let item = interp.first(args);
    if interp.sym_of(item) == Some(interp.name_dot) {
        nested_read(interp, rd_list_tail, state, "rd-list-tail");
        return;
    }
    let k = interp.first(state);
    let items = interp.rest(state);
    let items = interp.new_pair(item, items);
    let st = interp.new_pair(k, items);
    want_byte(interp, rd_list, st, "rd-list");
}

/// The improper tail came back; fold the collected elements onto it and
/// insist on a closing parenthesis.
fn rd_list_tail(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let tail = interp.first(args);
    let k = interp.first(state);
    let items = interp.rest(state);
    let mut result = tail;
    let mut cur = items;
    while !cur.is_nil() {
        let item = interp.first(cur);
        result = interp.new_pair(item, result);
        cur = interp.rest(cur);
    }
    let st = interp.new_pair(k, result);
    want_byte(interp, rd_tail_close, st, "rd-tail-close");
}

fn rd_tail_close(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let b = byte_of(interp, args);
    if b < 0 {
        interp.error_str("eof while reading");
        return;
    }
    let b = b as u8;
    if is_ws(b) {
        want_byte(interp, rd_tail_close, state, "rd-tail-close");
    } else if b == b')' {
        let k = interp.first(state);
        let result = interp.rest(state);
        deliver(interp, k, result);
    } else {
        interp.error_str("malformed form");
    }
}

/// Double-quoted symbol. State is `(consumer . bytes-reversed)`.
fn rd_string(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let b = byte_of(interp, args);
    if b < 0 {
        interp.error_str("eof while reading");
        return;
    }
    let b = b as u8;
    if b == b'"' {
        let k = interp.first(state);
        let acc = interp.rest(state);
        let sym = finish_sym(interp, acc);
        deliver(interp, k, sym);
    } else {
        let k = interp.first(state);
        let byte = interp.new_int(b as i64);
        let acc = interp.rest(state);
        let acc = interp.new_pair(byte, acc);
        let st = interp.new_pair(k, acc);
        want_byte(interp, rd_string, st, "rd-string");
    }
}

/// Integer literal. State is `(consumer . (sign . accumulator))`.
fn rd_num(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let b = byte_of(interp, args);
    let k = interp.first(state);
    let num = interp.rest(state);
    let sign = interp.int_of(interp.first(num)).unwrap_or(1);
    let acc = interp.int_of(interp.rest(num)).unwrap_or(0);
    if b >= 0 && (b as u8).is_ascii_digit() {
        let acc = acc.wrapping_mul(10).wrapping_add((b as u8 - b'0') as i64);
        let sign = interp.new_int(sign);
        let acc = interp.new_int(acc);
        let num = interp.new_pair(sign, acc);
        let st = interp.new_pair(k, num);
        want_byte(interp, rd_num, st, "rd-num");
        return;
    }
    if b >= 0 {
        interp.putback(b as u8);
    }
    let v = interp.new_int(sign.wrapping_mul(acc));
    deliver(interp, k, v);
}

/// Bare symbol. State is `(consumer . bytes-reversed)`. A digit right
/// after a single leading byte turns the token into a number instead;
/// a leading `-` keeps its meaning as the sign.
fn rd_sym(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let b = byte_of(interp, args);
    let k = interp.first(state);
    let acc = interp.rest(state);
    if b < 0 {
        let sym = finish_sym(interp, acc);
        deliver(interp, k, sym);
        return;
    }
    let b = b as u8;
    if is_ws(b) || b == b'(' || b == b')' {
        if b == b'(' || b == b')' {
            interp.putback(b);
        }
        let sym = finish_sym(interp, acc);
        deliver(interp, k, sym);
        return;
    }
    if b.is_ascii_digit() && interp.rest(acc).is_nil() {
        let lead = interp.int_of(interp.first(acc)).unwrap_or(0) as u8;
        let sign = interp.new_int(if lead == b'-' { -1 } else { 1 });
        let start = interp.new_int((b - b'0') as i64);
        let num = interp.new_pair(sign, start);
        let st = interp.new_pair(k, num);
        want_byte(interp, rd_num, st, "rd-num");
        return;
    }
    let byte = interp.new_int(b as i64);
    let acc = interp.new_pair(byte, acc);
    let st = interp.new_pair(k, acc);
    want_byte(interp, rd_sym, st, "rd-sym");
}

/// A prefixed expression came back: wrap it in a call to the expander.
fn rd_prefix(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let expr = interp.first(args);
    let k = interp.first(state);
    let expander = interp.rest(state);
    let v = interp.list(&[expander, expr]);
    deliver(interp, k, v);
}

fn prefix_for(interp: &Interp, b: u8) -> Option<ObjRef> {
    let mut cur = interp.prefixes;
    while !cur.is_nil() {
        let kv = interp.first(cur);
        if let Some(name) = interp.sym_of(interp.first(kv)) {
            if interp.sym_bytes(name).first() == Some(&b) {
                return Some(interp.rest(kv));
            }
        }
        cur = interp.rest(cur);
    }
    None
}

/// Intern the accumulated (reversed) byte list as a symbol.
fn finish_sym(interp: &mut Interp, acc: ObjRef) -> ObjRef {
    let mut bytes = Vec::new();
    let mut cur = acc;
    while !cur.is_nil() {
        if let Some(b) = interp.int_of(interp.first(cur)) {
            bytes.push(b as u8);
        }
        cur = interp.rest(cur);
    }
    bytes.reverse();
    interp.new_sym_bytes(&bytes)
}
