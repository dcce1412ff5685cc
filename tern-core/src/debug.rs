//!
//! Facilities for inspecting interpreter state.
//!

use std::fmt::{self, Write as _};

use indenter::indented;

use crate::interp::Interp;
use crate::value::{ObjRef, Value};

/// Render `obj` as an indented kind tree, one node per line.
pub fn dump_value(interp: &Interp, obj: ObjRef) -> String {
    let mut out = String::new();
    let _ = write_tree(&mut out, interp, obj);
    out
}

fn write_tree(mut out: &mut dyn fmt::Write, interp: &Interp, obj: ObjRef) -> fmt::Result {
    match interp.value(obj) {
        Value::Nil => writeln!(out, "NIL"),
        Value::Int(i) => writeln!(out, "INT: {}", i),
        Value::Sym(name) => writeln!(
            out,
            "SYM: {}",
            String::from_utf8_lossy(interp.sym_bytes(*name))
        ),
        Value::Pair { first, rest } => {
            writeln!(out, "PAIR:")?;
            let mut inner = indented(&mut out).with_str("  ");
            write_tree(&mut inner, interp, *first)?;
            write_tree(&mut inner, interp, *rest)
        }
        Value::Native { name, by_value, .. } => writeln!(
            out,
            "NATIVE{}: {}",
            if *by_value { "" } else { "-FORM" },
            name.unwrap_or("?")
        ),
        Value::Then { name, state, .. } => {
            writeln!(out, "THEN: {}", name.unwrap_or("?"))?;
            let mut inner = indented(&mut out).with_str("  ");
            write_tree(&mut inner, interp, *state)
        }
        Value::Closure { params, body, env } => {
            writeln!(out, "LAMBDA: ({} env frames)", interp.list_len(*env))?;
            let mut inner = indented(&mut out).with_str("  ");
            write_tree(&mut inner, interp, *params)?;
            write_tree(&mut inner, interp, *body)
        }
        Value::Macro {
            params,
            body,
            env,
            env_name,
        } => {
            writeln!(
                out,
                "MACRO: {} ({} env frames)",
                String::from_utf8_lossy(interp.sym_bytes(*env_name)),
                interp.list_len(*env)
            )?;
            let mut inner = indented(&mut out).with_str("  ");
            write_tree(&mut inner, interp, *params)?;
            write_tree(&mut inner, interp, *body)
        }
        Value::Cont { conts, values, .. } => writeln!(
            out,
            "CONT: {} pending, {} values",
            interp.list_len(*conts),
            interp.list_len(*values)
        ),
        Value::Ptr { tag, data, .. } => writeln!(
            out,
            "PTR: tag {} ({})",
            tag,
            if data.is_some() { "open" } else { "closed" }
        ),
    }
}

impl fmt::Debug for Interp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "interp:")?;
        let mut out = indented(f).with_str("  ");
        writeln!(out, "live objects: {}", self.live_count())?;
        writeln!(out, "interned names: {}", self.ns.len())?;
        if let Some(err) = self.error_get() {
            writeln!(out, "pending error: {}", self.print_str(err))?;
        }
        writeln!(out, "conts ({} deep):", self.conts_depth())?;
        {
            let mut items = indented(&mut out).with_str("  ");
            let mut cur = self.conts;
            while !cur.is_nil() {
                let item = self.first(cur);
                let n = self.int_of(self.first(item)).unwrap_or(0);
                let callee = self.first(self.rest(item));
                writeln!(items, "[{}] {}", n, self.print_str(callee))?;
                cur = self.rest(cur);
            }
        }
        writeln!(out, "values ({} deep):", self.values_depth())?;
        let mut entries = indented(&mut out).with_str("  ");
        let mut cur = self.values;
        while !cur.is_nil() {
            let entry = self.first(cur);
            let v = self.first(entry);
            let direct = self.rest(entry) == self.true_;
            writeln!(
                entries,
                "{} {}",
                if direct { "val" } else { "expr" },
                self.print_str(v)
            )?;
            cur = self.rest(cur);
        }
        Ok(())
    }
}

#[cfg(feature = "debug-info")]
pub(crate) fn install(interp: &mut Interp) {
    interp.register("debug-print", cf_debug_print, false);
    interp.register("all-symbols", cf_all_symbols, true);
    interp.register("dump-state", cf_dump_state, true);
}

/// Dump each argument's kind tree, unevaluated, to the host sink.
#[cfg(feature = "debug-info")]
fn cf_debug_print(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let mut cur = args;
    while !cur.is_nil() {
        let item = interp.first(cur);
        let dump = dump_value(interp, item);
        interp.emit(&dump);
        cur = interp.rest(cur);
    }
    let t = interp.true_();
    interp.values_push(t);
}

/// Every interned name, as a list of symbols.
#[cfg(feature = "debug-info")]
fn cf_all_symbols(interp: &mut Interp, _args: ObjRef, _state: ObjRef) {
    let mut names = Vec::new();
    interp.ns.for_each_name(|id, _bytes| names.push(id));
    let mut out = ObjRef::NIL;
    for name in names.into_iter().rev() {
        let sym = interp.new_sym(name);
        out = interp.new_pair(sym, out);
    }
    interp.values_push(out);
}

#[cfg(feature = "debug-info")]
fn cf_dump_state(interp: &mut Interp, _args: ObjRef, _state: ObjRef) {
    let dump = format!("{:?}", interp);
    interp.emit(&dump);
    let t = interp.true_();
    interp.values_push(t);
}
