//!
//! Facilities for printing values.
//!
//! Data prints in a form the reader accepts back: integers, symbols
//! (quoted when their spelling would re-read as something else), lists
//! with `.` for improper tails, and `lambda`/`macro` forms. Opaque kinds
//! print as `kind:detail` with no raw addresses.

use std::fmt::Write;

use crate::interp::Interp;
use crate::value::{ObjRef, Value};

/// Bytes that force a symbol into quotes wherever they appear, because
/// the reader would give them structure.
const QUOTED_SYM_BYTES: &[u8] = b"0123456789.,'\"`";

fn needs_quoting(bytes: &[u8]) -> bool {
    bytes.is_empty()
        || bytes.iter().any(|&b| {
            QUOTED_SYM_BYTES.contains(&b)
                || b.is_ascii_whitespace()
                || b == b'('
                || b == b')'
                || b == b';'
        })
}

impl Interp {
    /// Render `obj` to a string.
    pub fn print_str(&self, obj: ObjRef) -> String {
        let mut out = String::new();
        self.write_value(&mut out, obj);
        out
    }

    /// Render `obj` to the host output sink.
    pub fn print(&mut self, obj: ObjRef) {
        let s = self.print_str(obj);
        self.emit(&s);
    }

    fn write_value(&self, out: &mut String, obj: ObjRef) {
        match self.value(obj) {
            Value::Nil => out.push_str("()"),
            Value::Int(i) => {
                let _ = write!(out, "{}", i);
            }
            Value::Sym(name) => {
                let bytes = self.sym_bytes(*name);
                if needs_quoting(bytes) {
                    let _ = write!(out, "\"{}\"", String::from_utf8_lossy(bytes));
                } else {
                    out.push_str(&String::from_utf8_lossy(bytes));
                }
            }
            Value::Pair { .. } => {
                out.push('(');
                self.write_pairs(out, obj);
                out.push(')');
            }
            Value::Native { name, by_value, .. } => {
                let kind = if *by_value { "native" } else { "native-form" };
                let _ = write!(out, "{}:{}", kind, name.unwrap_or("?"));
            }
            Value::Then { name, .. } => {
                let _ = write!(out, "then:{}", name.unwrap_or("?"));
            }
            Value::Closure { params, body, .. } => {
                out.push_str("(lambda ");
                self.write_value(out, *params);
                out.push(' ');
                self.write_pairs(out, *body);
                out.push(')');
            }
            Value::Macro {
                params,
                body,
                env_name,
                ..
            } => {
                out.push_str("(macro ");
                self.write_value(out, *params);
                let _ = write!(out, " {} ", String::from_utf8_lossy(self.sym_bytes(*env_name)));
                self.write_pairs(out, *body);
                out.push(')');
            }
            Value::Cont { .. } => {
                let _ = write!(out, "cont:{}", obj.0);
            }
            Value::Ptr { tag, data, .. } => {
                let state = if data.is_some() { "open" } else { "closed" };
                let _ = write!(out, "ptr:{}:{}", tag, state);
            }
        }
    }

    /// The inside of a list: elements separated by spaces, an improper
    /// tail after a dot.
    fn write_pairs(&self, out: &mut String, list: ObjRef) {
        let mut cur = list;
        while !cur.is_nil() {
            match self.value(cur) {
                Value::Pair { first, rest } => {
                    self.write_value(out, *first);
                    if !rest.is_nil() {
                        out.push(' ');
                    }
                    cur = *rest;
                }
                _ => {
                    out.push_str(". ");
                    self.write_value(out, cur);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp() -> Interp {
        Interp::new()
    }

    #[test]
    fn ints_and_nil_print_plainly() {
        let mut interp = interp();
        let i = interp.new_int(-42);
        assert_eq!(interp.print_str(i), "-42");
        assert_eq!(interp.print_str(ObjRef::NIL), "()");
    }

    #[test]
    fn plain_symbols_print_bare() {
        let mut interp = interp();
        let s = interp.new_sym_str("hello-world!");
        assert_eq!(interp.print_str(s), "hello-world!");
    }

    #[test]
    fn awkward_symbols_are_quoted() {
        let mut interp = interp();
        let cases = [
            ("has space", "\"has space\""),
            ("", "\"\""),
            ("123abc", "\"123abc\""),
            ("a.b", "\"a.b\""),
        ];
        for (name, expected) in cases {
            let s = interp.new_sym_str(name);
            assert_eq!(interp.print_str(s), expected);
        }
    }

    #[test]
    fn lists_print_with_dots_for_improper_tails() {
        let mut interp = interp();
        let a = interp.new_sym_str("a");
        let b = interp.new_sym_str("b");
        let c = interp.new_sym_str("c");
        let tail = interp.new_pair(b, c);
        let l = interp.new_pair(a, tail);
        assert_eq!(interp.print_str(l), "(a b . c)");
        let one = interp.new_int(1);
        let two = interp.new_int(2);
        let proper = interp.list(&[one, two]);
        assert_eq!(interp.print_str(proper), "(1 2)");
    }

    #[test]
    fn nested_lists_print_recursively() {
        let mut interp = interp();
        let x = interp.new_sym_str("x");
        let one = interp.new_int(1);
        let inner = interp.list(&[x, one]);
        let y = interp.new_sym_str("y");
        let outer = interp.list(&[y, inner]);
        assert_eq!(interp.print_str(outer), "(y (x 1))");
    }
}
