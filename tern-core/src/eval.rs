//!
//! Facilities for evaluation.
//!
//! The evaluator is a trampoline over two explicit stacks. `conts` holds
//! continuation items `(arity . (callable . env))`; `values` holds value
//! entries `(value . tag)` where the tag records whether the entry is a
//! computed value or a still-syntactic expression. Both stacks are
//! ordinary shared lists, which is what makes captured continuations
//! cheap and re-invokable: a capture is three list heads.
//!
//! Negative arities are sentinels for the evaluator's own bookkeeping
//! items; real applications use the non-negative argument count.

use crate::interp::Interp;
use crate::port::ByteSource;
use crate::value::{NativeFn, ObjRef, Value};

/// Evaluate the callable slot as an expression and push its value.
pub const APPLY_PUSH_EVAL: i64 = -1;
/// Evaluate the callable slot for effect only.
pub const APPLY_DROP_EVAL: i64 = -2;
/// Apply the popped value to the arity stored in the callable slot.
pub const APPLY_INDIRECT: i64 = -3;
/// Discard the top value entry.
pub const APPLY_DROP: i64 = -4;
/// Uninstall the innermost error handler.
pub const APPLY_DROP_RESCUE: i64 = -5;
/// Push one byte of input, suspending until the host provides it.
pub const APPLY_GETCHAR: i64 = -6;

/// Outcome of a single trampoline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// More work is pending.
    Again,
    /// The continuation stack is empty (or an error went unhandled).
    Done,
    /// A byte of input is needed; call `feed_byte` and resume.
    AwaitInput,
}

/// Outcome of `run`: as `StepResult`, minus the in-progress case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    Done,
    AwaitInput,
}

/// Continuation callback that replays a saved value. Used to keep
/// already-computed arguments in place while their siblings evaluate.
fn restore_value_k(interp: &mut Interp, _args: ObjRef, state: ObjRef) {
    interp.values_push(state);
}

impl Interp {
    // --- stack primitives ---

    /// Schedule an application (or a sentinel item) on the continuation
    /// stack. `env` is the environment the item executes under.
    pub fn push_apply(&mut self, n: i64, callable: ObjRef, env: ObjRef) {
        let n_obj = self.new_int(n);
        let ce = self.new_pair(callable, env);
        let item = self.new_pair(n_obj, ce);
        self.conts = self.new_pair(item, self.conts);
    }

    /// Push a computed value entry.
    pub fn values_push(&mut self, v: ObjRef) {
        self.values_push_tagged(v, true);
    }

    /// Push an expression entry still awaiting evaluation.
    pub fn values_push_syntactic(&mut self, v: ObjRef) {
        self.values_push_tagged(v, false);
    }

    fn values_push_tagged(&mut self, v: ObjRef, direct: bool) {
        let tag = if direct { self.true_ } else { self.false_ };
        let entry = self.new_pair(v, tag);
        self.values = self.new_pair(entry, self.values);
    }

    /// Pop the top value entry, returning the value and whether it was
    /// computed (`true`) or syntactic (`false`).
    pub fn values_pop(&mut self) -> Option<(ObjRef, bool)> {
        if self.values.is_nil() {
            return None;
        }
        let entry = self.first(self.values);
        self.values = self.rest(self.values);
        let v = self.first(entry);
        let direct = self.rest(entry) == self.true_;
        Some((v, direct))
    }

    /// Capture the current continuation. The stacks are shared, never
    /// copied, so the capture stays valid however often it is invoked.
    pub fn capture(&mut self) -> ObjRef {
        self.alloc(Value::Cont {
            env: self.env,
            conts: self.conts,
            values: self.values,
        })
    }

    /// Clear all evaluation state. Pending errors are left in place;
    /// clear those separately with `error_clear`.
    pub fn reset_stacks(&mut self) {
        self.conts = ObjRef::NIL;
        self.values = ObjRef::NIL;
        self.rescue = ObjRef::NIL;
        self.current_item = ObjRef::NIL;
        self.current_args = ObjRef::NIL;
        self.pushback = None;
    }

    /// Return to the outermost environment.
    pub fn reset_env(&mut self) {
        self.env = self.top_env;
    }

    // --- continuation-passing conveniences ---

    /// Evaluate `expr` under `env`, then invoke `func` with the result as
    /// its single argument and `state` as its state.
    pub fn eval_and_then(
        &mut self,
        expr: ObjRef,
        env: ObjRef,
        state: ObjRef,
        func: NativeFn,
    ) {
        let k = self.new_then(func, state, None);
        self.push_apply(1, k, env);
        self.push_apply(APPLY_PUSH_EVAL, expr, env);
    }

    /// Schedule `callable` applied to the already-computed `args` list.
    pub fn queue_apply(&mut self, callable: ObjRef, args: ObjRef) {
        let n = self.list_len(args) as i64;
        let env = self.env;
        self.push_apply(n, callable, env);
        let mut cur = args;
        while let Value::Pair { first, rest } = self.value(cur) {
            let (v, next) = (*first, *rest);
            self.values_push(v);
            cur = next;
        }
    }

    /// Apply `callable` to `args`, then invoke `func` with the result.
    pub fn apply_and_then(
        &mut self,
        callable: ObjRef,
        args: ObjRef,
        state: ObjRef,
        func: NativeFn,
    ) {
        let k = self.new_then(func, state, None);
        let env = self.env;
        self.push_apply(1, k, env);
        self.queue_apply(callable, args);
    }

    // --- the trampoline ---

    /// Execute one continuation item.
    pub fn step(&mut self) -> StepResult {
        if let Some(err) = self.error {
            if self.rescue.is_nil() {
                // Unhandled: evaluation halts with the error pending for
                // the host to inspect.
                return StepResult::Done;
            }
            let handler = self.first(self.rescue);
            self.rescue = self.rest(self.rescue);
            self.error = None;
            // The handler is a captured continuation, so applying it to
            // the error value is the whole unwind.
            self.push_apply(1, handler, self.env);
            self.values_push(err);
            return StepResult::Again;
        }
        if self.conts.is_nil() {
            return StepResult::Done;
        }

        let item = self.first(self.conts);
        self.conts = self.rest(self.conts);
        self.current_item = item;
        let n = self.int_of(self.first(item)).unwrap_or(0);
        let callee = self.first(self.rest(item));
        let env = self.rest(self.rest(item));
        self.env = env;

        match n {
            APPLY_PUSH_EVAL => self.eval_expr(callee, env, true),
            APPLY_DROP_EVAL => self.eval_expr(callee, env, false),
            APPLY_INDIRECT => {
                let real_n = self.int_of(callee).unwrap_or(0);
                match self.values_pop() {
                    Some((f, _)) => self.step_apply(real_n, f, env),
                    None => self.error_str("value stack underflow"),
                }
            }
            APPLY_DROP => {
                self.values_pop();
            }
            APPLY_DROP_RESCUE => {
                self.rescue = self.rest(self.rescue);
            }
            APPLY_GETCHAR => match self.pushback.take() {
                Some(b) => {
                    let v = self.new_int(b as i64);
                    self.values_push(v);
                }
                None => {
                    self.current_item = ObjRef::NIL;
                    return StepResult::AwaitInput;
                }
            },
            _ => self.step_apply(n, callee, env),
        }

        self.current_item = ObjRef::NIL;
        self.current_args = ObjRef::NIL;
        StepResult::Again
    }

    /// Run until evaluation finishes or input is needed. Collects garbage
    /// every `gc_interval` steps, and whenever allocation overshot the
    /// heap limit during the step just finished. Panics if live objects
    /// alone exceed the limit, since no collection can recover from that.
    pub fn run(&mut self) -> RunResult {
        loop {
            match self.step() {
                StepResult::Again => {
                    self.steps += 1;
                    if self.store.take_overshoot() {
                        self.collect();
                        if self.store.live_over_limit() {
                            panic!(
                                "object heap exhausted: {} live objects over limit {}",
                                self.store.live_count(),
                                self.store.limit().unwrap_or(0)
                            );
                        }
                    } else if self.steps >= self.gc_interval {
                        self.steps = 0;
                        self.collect();
                    }
                }
                StepResult::Done => return RunResult::Done,
                StepResult::AwaitInput => return RunResult::AwaitInput,
            }
        }
    }

    /// Run to completion, serving input requests from `src`.
    pub fn run_until_done(&mut self, src: &mut dyn ByteSource) {
        loop {
            match self.run() {
                RunResult::Done => return,
                RunResult::AwaitInput => {
                    let b = src.read_byte();
                    self.feed_byte(b);
                }
            }
        }
    }

    /// Provide the byte a suspended evaluation asked for. `None` means
    /// end of input and arrives in the language as -1.
    pub fn feed_byte(&mut self, b: Option<u8>) {
        let v = self.new_int(b.map(|b| b as i64).unwrap_or(-1));
        self.values_push(v);
    }

    // --- expression evaluation ---

    /// Evaluate one expression under `env`. Symbols resolve through the
    /// environment, pairs schedule an application, nil is an error, and
    /// everything else is itself. `keep` selects whether the result is
    /// pushed or dropped.
    fn eval_expr(&mut self, expr: ObjRef, env: ObjRef, keep: bool) {
        match self.value(expr) {
            Value::Sym(_) => match self.env_find(env, expr) {
                Some(kv) => {
                    if keep {
                        let v = self.rest(kv);
                        self.values_push(v);
                    }
                }
                None => self.error_with("unbound variable", expr),
            },
            Value::Pair { first, rest } => {
                let (callee, argexprs) = (*first, *rest);
                if !keep {
                    self.push_apply(APPLY_DROP, ObjRef::NIL, env);
                }
                let n = self.list_len(argexprs) as i64;
                self.push_apply(n, callee, env);
                let mut cur = argexprs;
                while let Value::Pair { first, rest } = self.value(cur) {
                    let (a, next) = (*first, *rest);
                    self.values_push_syntactic(a);
                    cur = next;
                }
            }
            Value::Nil => {
                // The empty form has no callee to apply.
                self.error_with("unevaluable", expr);
            }
            _ => {
                // Ints and every callable kind are self-evaluating.
                if keep {
                    self.values_push(expr);
                }
            }
        }
    }

    // --- application ---

    /// Apply a callee to the `n` pending value entries.
    fn step_apply(&mut self, n: i64, callee: ObjRef, env: ObjRef) {
        enum Target {
            Raw(NativeFn, ObjRef),
            ByValueNative(NativeFn, ObjRef),
            Closure,
            Macro,
            Cont(ObjRef, ObjRef, ObjRef),
            Indirect,
            NotCallable,
        }

        let target = match self.value(callee) {
            Value::Native {
                func,
                by_value,
                state,
                ..
            } => {
                if *by_value {
                    Target::ByValueNative(*func, *state)
                } else {
                    Target::Raw(*func, *state)
                }
            }
            Value::Then { func, state, .. } => Target::Raw(*func, *state),
            Value::Macro { .. } => Target::Macro,
            Value::Closure { .. } => Target::Closure,
            Value::Cont { env, conts, values } => Target::Cont(*env, *conts, *values),
            Value::Sym(_) => Target::Indirect,
            Value::Pair { .. } => Target::Indirect,
            Value::Nil | Value::Int(_) | Value::Ptr { .. } => Target::NotCallable,
        };

        match target {
            Target::Indirect => {
                // The callee is still an expression. Evaluate it, then
                // retry the application against the result; the argument
                // entries stay parked beneath it.
                let real_n = self.new_int(n);
                self.push_apply(APPLY_INDIRECT, real_n, env);
                self.push_apply(APPLY_PUSH_EVAL, callee, env);
            }
            Target::NotCallable => {
                self.error_with("not callable", callee);
            }
            Target::Raw(func, state) => {
                let args = match self.pop_args_raw(n) {
                    Some(args) => args,
                    None => return,
                };
                self.current_args = args;
                func(self, args, state);
            }
            Target::Macro => {
                let args = match self.pop_args_raw(n) {
                    Some(args) => args,
                    None => return,
                };
                self.current_args = args;
                self.apply_macro(callee, args, env);
            }
            Target::ByValueNative(..) | Target::Closure | Target::Cont(..) => {
                let mut entries = Vec::with_capacity(n.max(0) as usize);
                for _ in 0..n {
                    match self.values_pop() {
                        Some(entry) => entries.push(entry),
                        None => {
                            self.error_str("value stack underflow");
                            return;
                        }
                    }
                }
                if entries.iter().any(|&(_, direct)| !direct) {
                    self.rearm(n, callee, env, &entries);
                    return;
                }
                // Popped top-first, so fold back up into source order.
                let mut args = ObjRef::NIL;
                for &(v, _) in &entries {
                    args = self.new_pair(v, args);
                }
                self.current_args = args;
                match target {
                    Target::ByValueNative(func, state) => func(self, args, state),
                    Target::Closure => self.apply_closure(callee, args),
                    Target::Cont(kenv, kconts, kvalues) => {
                        if n != 1 {
                            self.error_with("bad arity", callee);
                            return;
                        }
                        let arg = self.first(args);
                        self.env = kenv;
                        self.conts = kconts;
                        self.values = kvalues;
                        self.values_push(arg);
                    }
                    _ => unreachable!(),
                }
            }
        }
    }

    /// Pop `n` entries without looking at their tags.
    fn pop_args_raw(&mut self, n: i64) -> Option<ObjRef> {
        let mut args = ObjRef::NIL;
        for _ in 0..n {
            match self.values_pop() {
                Some((v, _)) => args = self.new_pair(v, args),
                None => {
                    self.error_str("value stack underflow");
                    return None;
                }
            }
        }
        Some(args)
    }

    /// Reschedule an application whose arguments are not all computed
    /// yet. Entries were popped top-first; pushing their items in that
    /// same order makes them re-execute in source order, so the stack
    /// rebuilds exactly as the application expects.
    fn rearm(&mut self, n: i64, callee: ObjRef, env: ObjRef, entries: &[(ObjRef, bool)]) {
        self.push_apply(n, callee, env);
        for &(v, direct) in entries {
            if direct {
                let k = self.new_then(restore_value_k, v, Some("restore-value"));
                self.push_apply(0, k, env);
            } else {
                self.push_apply(APPLY_PUSH_EVAL, v, env);
            }
        }
    }

    fn apply_closure(&mut self, callee: ObjRef, args: ObjRef) {
        let (params, body, cenv) = match self.value(callee) {
            Value::Closure { params, body, env } => (*params, *body, *env),
            _ => return,
        };
        let new_env = self.env_push_frame(cenv);
        match self.value(params) {
            Value::Sym(_) => {
                // A bare symbol takes the whole argument list.
                self.env_set_local(new_env, params, args);
            }
            _ => {
                if self.list_len(params) != self.list_len(args) {
                    self.error_with("bad arity", callee);
                    return;
                }
                let mut p = params;
                let mut a = args;
                while !p.is_nil() {
                    let sym = self.first(p);
                    let v = self.first(a);
                    self.env_set_local(new_env, sym, v);
                    p = self.rest(p);
                    a = self.rest(a);
                }
            }
        }
        self.push_body(body, new_env);
    }

    /// Macros see their arguments unevaluated, bind the caller's
    /// environment under their declared name, and may take extra
    /// arguments: the last formal receives everything left over.
    fn apply_macro(&mut self, callee: ObjRef, args: ObjRef, caller_env: ObjRef) {
        let (params, body, menv, env_name) = match self.value(callee) {
            Value::Macro {
                params,
                body,
                env,
                env_name,
            } => (*params, *body, *env, *env_name),
            _ => return,
        };
        let new_env = self.env_push_frame(menv);
        if self.list_len(args) < self.list_len(params) {
            self.error_with("bad arity", callee);
            return;
        }
        let mut p = params;
        let mut a = args;
        while !p.is_nil() {
            let sym = self.first(p);
            if self.rest(p).is_nil() {
                self.env_set_local(new_env, sym, a);
            } else {
                let v = self.first(a);
                self.env_set_local(new_env, sym, v);
            }
            p = self.rest(p);
            a = self.rest(a);
        }
        let env_sym = self.new_sym(env_name);
        self.env_set_local(new_env, env_sym, caller_env);
        self.push_body(body, new_env);
    }

    /// Schedule a body: every expression for effect, the last one for
    /// value. An empty body yields `#f`.
    fn push_body(&mut self, body: ObjRef, env: ObjRef) {
        if body.is_nil() {
            let f = self.false_;
            self.values_push(f);
            return;
        }
        let exprs = self.list_to_vec(body);
        let last = exprs.len() - 1;
        for (i, &e) in exprs.iter().enumerate().rev() {
            if i == last {
                self.push_apply(APPLY_PUSH_EVAL, e, env);
            } else {
                self.push_apply(APPLY_DROP_EVAL, e, env);
            }
        }
    }
}
