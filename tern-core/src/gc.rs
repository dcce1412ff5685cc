//!
//! Facilities for garbage collection.
//!
//! Mark and sweep over the store's live list. Roots are the interpreter's
//! own registers plus every slot pinned with `make_permanent`. Marking
//! uses an explicit worklist so deep structures cannot overflow the host
//! stack; finalizers run after the sweep finishes, once the store is
//! consistent again.

use log::debug;

use crate::interp::Interp;
use crate::value::{ObjRef, Value};

impl Interp {
    /// Run a full collection cycle.
    pub fn collect(&mut self) {
        let mut live = Vec::with_capacity(self.store.live_count());
        self.store.for_each_live(|r| live.push(r));
        for &r in &live {
            self.store.set_mark(r, false);
        }

        let mut work = vec![
            self.true_,
            self.false_,
            self.env,
            self.top_env,
            self.conts,
            self.values,
            self.rescue,
            self.prefixes,
            self.current_item,
            self.current_args,
        ];
        if let Some(e) = self.error {
            work.push(e);
        }
        for &r in &live {
            if self.store.is_permanent(r) {
                work.push(r);
            }
        }
        self.mark_worklist(work);

        let mut finalizers = Vec::new();
        let mut freed = 0usize;
        for &r in &live {
            if self.store.is_marked(r) {
                continue;
            }
            if let Value::Ptr { data, drop_fn, .. } = self.store.value_mut(r) {
                if let (Some(data), Some(f)) = (data.take(), drop_fn.take()) {
                    finalizers.push((f, data));
                }
            }
            self.store.free(r);
            freed += 1;
        }

        debug!(
            "gc: freed {} of {} objects, {} slots carved",
            freed,
            live.len(),
            self.store.slot_count(),
        );

        for (f, data) in finalizers {
            f(data);
        }
    }

    fn mark_worklist(&mut self, mut work: Vec<ObjRef>) {
        while let Some(r) = work.pop() {
            if r.is_nil() || self.store.is_marked(r) {
                continue;
            }
            self.store.set_mark(r, true);
            match self.store.value(r) {
                Value::Pair { first, rest } => {
                    work.push(*first);
                    work.push(*rest);
                }
                Value::Native { state, .. } | Value::Then { state, .. } => {
                    work.push(*state);
                }
                Value::Closure { params, body, env } => {
                    work.push(*params);
                    work.push(*body);
                    work.push(*env);
                }
                Value::Macro {
                    params, body, env, ..
                } => {
                    work.push(*params);
                    work.push(*body);
                    work.push(*env);
                }
                Value::Cont { env, conts, values } => {
                    work.push(*env);
                    work.push(*conts);
                    work.push(*values);
                }
                Value::Nil | Value::Int(_) | Value::Sym(_) | Value::Ptr { .. } => {}
            }
        }
    }
}
