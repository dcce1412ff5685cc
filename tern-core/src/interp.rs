//!
//! Facilities for the interpreter context.
//!
//! `Interp` owns every piece of runtime state: the object store, the
//! symbol namespace, the evaluator stacks, the environment chain and the
//! host output sink. There are no globals; embedders may run any number
//! of interpreters side by side.

use std::io::{self, Write};

use tern_ns::{NameId, Namespace};

use crate::obj::{Store, DEFAULT_BATCH};
use crate::primitives;
use crate::value::{NativeFn, ObjRef, PtrDropFn, Value};

/// How many evaluator steps to run between collection cycles.
pub const DEFAULT_GC_INTERVAL: usize = 50_000;

/// Embedder hook consulted by the `modload` primitive before the built-in
/// module registry. Returns whether the named module was loaded.
pub type ModloadHook = fn(&mut Interp, &str) -> bool;

/// Tuning knobs for a fresh interpreter.
#[derive(Debug, Clone)]
pub struct InterpConfig {
    /// Ceiling on live objects, or `None` for unbounded. Enforced at
    /// step boundaries: allocation may overshoot by one batch, then the
    /// driver collects and panics if live objects still exceed the
    /// limit. Must leave room for the interpreter's own baseline.
    pub heap_limit: Option<usize>,
    /// Slots carved from the backing vector per refill.
    pub heap_batch: usize,
    /// Evaluator steps between collection cycles.
    pub gc_interval: usize,
}

impl Default for InterpConfig {
    fn default() -> InterpConfig {
        InterpConfig {
            heap_limit: None,
            heap_batch: DEFAULT_BATCH,
            gc_interval: DEFAULT_GC_INTERVAL,
        }
    }
}

pub struct Interp {
    pub(crate) store: Store,
    pub(crate) ns: Namespace,

    /// Canonical truth value, bound to `#t`.
    pub(crate) true_: ObjRef,
    /// Canonical false value, bound to `#f`.
    pub(crate) false_: ObjRef,
    /// Pending error value, if any. First error wins until cleared.
    pub(crate) error: Option<ObjRef>,

    /// Current environment: a list of frames, innermost first.
    pub(crate) env: ObjRef,
    /// The outermost environment, where primitives live.
    pub(crate) top_env: ObjRef,

    /// Pending continuation items, top of stack first.
    pub(crate) conts: ObjRef,
    /// Pending value entries, top of stack first.
    pub(crate) values: ObjRef,
    /// Active error handlers, innermost first.
    pub(crate) rescue: ObjRef,
    /// Reader prefix table: a list of (symbol . callable) entries.
    pub(crate) prefixes: ObjRef,

    /// The continuation item being executed right now, kept reachable
    /// across any collection its handler triggers.
    pub(crate) current_item: ObjRef,
    /// Arguments of the application being executed right now.
    pub(crate) current_args: ObjRef,

    /// One byte of reader pushback.
    pub(crate) pushback: Option<u8>,
    /// The interned name of the improper-tail marker `.`.
    pub(crate) name_dot: NameId,

    pub(crate) gc_interval: usize,
    pub(crate) steps: usize,
    next_tag: u32,

    out: Box<dyn Write>,
    modload_hook: Option<ModloadHook>,
}

impl Interp {
    pub fn new() -> Interp {
        Interp::with_config(InterpConfig::default())
    }

    pub fn with_config(config: InterpConfig) -> Interp {
        let mut ns = Namespace::new();
        let name_dot = ns.resolve(b".");
        let mut interp = Interp {
            store: Store::new(config.heap_limit, config.heap_batch),
            ns,
            true_: ObjRef::NIL,
            false_: ObjRef::NIL,
            error: None,
            env: ObjRef::NIL,
            top_env: ObjRef::NIL,
            conts: ObjRef::NIL,
            values: ObjRef::NIL,
            rescue: ObjRef::NIL,
            prefixes: ObjRef::NIL,
            current_item: ObjRef::NIL,
            current_args: ObjRef::NIL,
            pushback: None,
            name_dot,
            gc_interval: config.gc_interval,
            steps: 0,
            next_tag: 1,
            out: Box::new(io::sink()),
            modload_hook: None,
        };

        interp.true_ = interp.new_sym_str("#t");
        interp.false_ = interp.new_sym_str("#f");

        // One empty frame; primitives land in it.
        interp.top_env = interp.new_pair(ObjRef::NIL, ObjRef::NIL);
        interp.env = interp.top_env;
        let t = interp.true_;
        let f = interp.false_;
        interp.define_value("#t", t);
        interp.define_value("#f", f);

        primitives::install(&mut interp);

        // `'` expands through the freshly installed quote primitive.
        let quote_sym = interp.new_sym_str("quote");
        if let Some(quote) = interp.env_get(interp.top_env, quote_sym) {
            let tick = interp.new_sym_str("'");
            interp.add_prefix(tick, quote);
        }

        interp
    }

    // --- value constructors ---

    /// Allocate a slot. Allocation never collects: an evaluator step may
    /// hold fresh objects outside any root, so reclamation under the heap
    /// limit is deferred to the next step boundary in [`Interp::run`].
    pub(crate) fn alloc(&mut self, value: Value) -> ObjRef {
        self.store.alloc(value)
    }

    pub fn new_int(&mut self, i: i64) -> ObjRef {
        self.alloc(Value::Int(i))
    }

    pub fn new_sym(&mut self, name: NameId) -> ObjRef {
        self.alloc(Value::Sym(name))
    }

    pub fn new_sym_bytes(&mut self, bytes: &[u8]) -> ObjRef {
        let name = self.ns.resolve(bytes);
        self.new_sym(name)
    }

    pub fn new_sym_str(&mut self, s: &str) -> ObjRef {
        self.new_sym_bytes(s.as_bytes())
    }

    pub fn new_pair(&mut self, first: ObjRef, rest: ObjRef) -> ObjRef {
        self.alloc(Value::Pair { first, rest })
    }

    pub fn new_native(&mut self, name: &'static str, func: NativeFn, by_value: bool) -> ObjRef {
        self.alloc(Value::Native {
            func,
            name: Some(name),
            by_value,
            state: ObjRef::NIL,
        })
    }

    pub fn new_native_with_state(
        &mut self,
        name: &'static str,
        func: NativeFn,
        by_value: bool,
        state: ObjRef,
    ) -> ObjRef {
        self.alloc(Value::Native {
            func,
            name: Some(name),
            by_value,
            state,
        })
    }

    pub fn new_then(&mut self, func: NativeFn, state: ObjRef, name: Option<&'static str>) -> ObjRef {
        self.alloc(Value::Then { func, name, state })
    }

    pub fn new_closure(&mut self, params: ObjRef, body: ObjRef, env: ObjRef) -> ObjRef {
        self.alloc(Value::Closure { params, body, env })
    }

    pub fn new_macro(
        &mut self,
        params: ObjRef,
        body: ObjRef,
        env: ObjRef,
        env_name: NameId,
    ) -> ObjRef {
        self.alloc(Value::Macro {
            params,
            body,
            env,
            env_name,
        })
    }

    pub fn new_ptr(
        &mut self,
        data: Box<dyn std::any::Any>,
        drop_fn: Option<PtrDropFn>,
        tag: u32,
    ) -> ObjRef {
        self.alloc(Value::Ptr {
            data: Some(data),
            drop_fn,
            tag,
        })
    }

    /// Issue a fresh tag for a family of opaque pointers.
    pub fn new_tag(&mut self) -> u32 {
        let tag = self.next_tag;
        self.next_tag += 1;
        tag
    }

    // --- value inspection ---

    #[inline]
    pub fn value(&self, r: ObjRef) -> &Value {
        self.store.value(r)
    }

    pub fn is_pair(&self, r: ObjRef) -> bool {
        matches!(self.store.value(r), Value::Nil | Value::Pair { .. })
    }

    pub fn is_callable(&self, r: ObjRef) -> bool {
        self.store.value(r).is_callable()
    }

    pub fn int_of(&self, r: ObjRef) -> Option<i64> {
        match self.store.value(r) {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn sym_of(&self, r: ObjRef) -> Option<NameId> {
        match self.store.value(r) {
            Value::Sym(n) => Some(*n),
            _ => None,
        }
    }

    pub fn sym_bytes(&self, name: NameId) -> &[u8] {
        self.ns.bytes(name)
    }

    /// Everything is truthy except `#f`, nil, zero and the empty symbol.
    pub fn truthy(&self, r: ObjRef) -> bool {
        if r == self.false_ {
            return false;
        }
        match self.store.value(r) {
            Value::Nil => false,
            Value::Int(i) => *i != 0,
            Value::Sym(n) => !self.ns.bytes(*n).is_empty(),
            _ => true,
        }
    }

    // --- list helpers ---

    /// First element of a pair; nil for anything else, like the rest of
    /// the list walkers here.
    #[inline]
    pub fn first(&self, r: ObjRef) -> ObjRef {
        match self.store.value(r) {
            Value::Pair { first, .. } => *first,
            _ => ObjRef::NIL,
        }
    }

    #[inline]
    pub fn rest(&self, r: ObjRef) -> ObjRef {
        match self.store.value(r) {
            Value::Pair { rest, .. } => *rest,
            _ => ObjRef::NIL,
        }
    }

    /// `list.first = v`, ignored when `list` is not a proper pair.
    pub fn set_first(&mut self, list: ObjRef, v: ObjRef) {
        if let Value::Pair { first, .. } = self.store.value_mut(list) {
            *first = v;
        }
    }

    pub fn set_rest(&mut self, list: ObjRef, v: ObjRef) {
        if let Value::Pair { rest, .. } = self.store.value_mut(list) {
            *rest = v;
        }
    }

    /// Nth element, nil past the end.
    pub fn arg(&self, args: ObjRef, n: usize) -> ObjRef {
        let mut cur = args;
        for _ in 0..n {
            cur = self.rest(cur);
        }
        self.first(cur)
    }

    /// Number of elements in the proper prefix of a list.
    pub fn list_len(&self, list: ObjRef) -> usize {
        let mut n = 0;
        let mut cur = list;
        while let Value::Pair { rest, .. } = self.store.value(cur) {
            n += 1;
            cur = *rest;
        }
        n
    }

    /// Fresh list with the elements of `list` in reverse order.
    pub fn list_rvs(&mut self, list: ObjRef) -> ObjRef {
        let mut out = ObjRef::NIL;
        let mut cur = list;
        while let Value::Pair { first, rest } = self.store.value(cur) {
            let (first, rest) = (*first, *rest);
            out = self.new_pair(first, out);
            cur = rest;
        }
        out
    }

    pub fn list_to_vec(&self, list: ObjRef) -> Vec<ObjRef> {
        let mut out = Vec::new();
        let mut cur = list;
        while let Value::Pair { first, rest } = self.store.value(cur) {
            out.push(*first);
            cur = *rest;
        }
        out
    }

    pub fn list(&mut self, items: &[ObjRef]) -> ObjRef {
        let mut out = ObjRef::NIL;
        for &item in items.iter().rev() {
            out = self.new_pair(item, out);
        }
        out
    }

    /// Structural equality over ints, symbols and acyclic pairs. Other
    /// kinds compare by identity.
    pub fn deep_eq(&self, a: ObjRef, b: ObjRef) -> bool {
        let mut work = vec![(a, b)];
        while let Some((a, b)) = work.pop() {
            if a == b {
                continue;
            }
            match (self.store.value(a), self.store.value(b)) {
                (Value::Int(x), Value::Int(y)) if x == y => {}
                (Value::Sym(x), Value::Sym(y)) if x == y => {}
                (
                    Value::Pair { first: af, rest: ar },
                    Value::Pair { first: bf, rest: br },
                ) => {
                    work.push((*ar, *br));
                    work.push((*af, *bf));
                }
                _ => return false,
            }
        }
        true
    }

    // --- errors ---

    /// Record an error value. The first error wins until cleared.
    pub fn error_set(&mut self, v: ObjRef) {
        if self.error.is_none() {
            self.error = Some(v);
        }
    }

    pub fn error_str(&mut self, msg: &str) {
        let s = self.new_sym_str(msg);
        self.error_set(s);
    }

    /// Record `(msg . detail)`.
    pub fn error_with(&mut self, msg: &str, detail: ObjRef) {
        let s = self.new_sym_str(msg);
        let p = self.new_pair(s, detail);
        self.error_set(p);
    }

    pub fn error_get(&self) -> Option<ObjRef> {
        self.error
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_clear(&mut self) {
        self.error = None;
    }

    // --- registration and host wiring ---

    /// Bind a native function in the outermost environment.
    pub fn register(&mut self, name: &'static str, func: NativeFn, by_value: bool) {
        self.register_with_state(name, func, by_value, ObjRef::NIL)
    }

    pub fn register_with_state(
        &mut self,
        name: &'static str,
        func: NativeFn,
        by_value: bool,
        state: ObjRef,
    ) {
        let f = self.new_native_with_state(name, func, by_value, state);
        self.define_value(name, f);
    }

    /// Bind an arbitrary value in the outermost environment.
    pub fn define_value(&mut self, name: &str, v: ObjRef) {
        let sym = self.new_sym_str(name);
        let top = self.top_env;
        self.env_set_local(top, sym, v);
    }

    /// Register a reader prefix: `sym` followed by an expression reads as
    /// `(callable expression)`.
    pub fn add_prefix(&mut self, sym: ObjRef, callable: ObjRef) {
        let kv = self.new_pair(sym, callable);
        self.prefixes = self.new_pair(kv, self.prefixes);
    }

    pub fn set_modload_hook(&mut self, hook: ModloadHook) {
        self.modload_hook = Some(hook);
    }

    pub(crate) fn modload_hook(&self) -> Option<ModloadHook> {
        self.modload_hook
    }

    pub fn set_output(&mut self, out: Box<dyn Write>) {
        self.out = out;
    }

    /// Write text to the host output sink. Write errors are swallowed;
    /// the sink is advisory output, not part of evaluation.
    pub fn emit(&mut self, s: &str) {
        let _ = self.out.write_all(s.as_bytes());
    }

    pub fn flush_output(&mut self) {
        let _ = self.out.flush();
    }

    // --- pinning and introspection ---

    /// Pin an object (and transitively everything it references) across
    /// collections even while unreachable from the interpreter's roots.
    pub fn make_permanent(&mut self, r: ObjRef) {
        self.store.set_permanent(r, true);
    }

    pub fn make_transient(&mut self, r: ObjRef) {
        self.store.set_permanent(r, false);
    }

    pub fn live_count(&self) -> usize {
        self.store.live_count()
    }

    pub fn env(&self) -> ObjRef {
        self.env
    }

    pub fn top_env(&self) -> ObjRef {
        self.top_env
    }

    pub fn true_(&self) -> ObjRef {
        self.true_
    }

    pub fn false_(&self) -> ObjRef {
        self.false_
    }

    /// Depth of the pending continuation stack. Diagnostic only.
    pub fn conts_depth(&self) -> usize {
        self.list_len(self.conts)
    }

    pub fn values_depth(&self) -> usize {
        self.list_len(self.values)
    }
}

impl Default for Interp {
    fn default() -> Interp {
        Interp::new()
    }
}

impl Drop for Interp {
    fn drop(&mut self) {
        // Release every live host resource before the store goes away.
        let mut live = Vec::new();
        self.store.for_each_live(|r| live.push(r));
        for r in live {
            if let Value::Ptr { data, drop_fn, .. } = self.store.value_mut(r) {
                if let (Some(data), Some(f)) = (data.take(), drop_fn.take()) {
                    f(data);
                }
            }
        }
    }
}
