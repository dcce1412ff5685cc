//!
//! Facilities for environment lookup and mutation.
//!
//! An environment is a list of frames, innermost first; each frame is a
//! list of `(name . value)` pairs. Lookup returns the binding pair itself
//! so callers can mutate in place, which is what makes closures sharing a
//! frame see each other's assignments.

use crate::interp::Interp;
use crate::value::{ObjRef, Value};

impl Interp {
    /// The binding pair for `sym` in the innermost frame that has one.
    pub fn env_find(&self, env: ObjRef, sym: ObjRef) -> Option<ObjRef> {
        let name = self.sym_of(sym)?;
        let mut frames = env;
        while let Value::Pair { first, rest } = self.value(frames) {
            let (frame, next) = (*first, *rest);
            if let Some(kv) = self.frame_find(frame, name) {
                return Some(kv);
            }
            frames = next;
        }
        None
    }

    pub fn env_get(&self, env: ObjRef, sym: ObjRef) -> Option<ObjRef> {
        self.env_find(env, sym).map(|kv| self.rest(kv))
    }

    /// Bind `sym` in the innermost frame, overwriting an existing binding
    /// there but never touching outer frames.
    pub fn env_set_local(&mut self, env: ObjRef, sym: ObjRef, v: ObjRef) {
        let frame = self.first(env);
        let name = match self.sym_of(sym) {
            Some(name) => name,
            None => return,
        };
        if let Some(kv) = self.frame_find(frame, name) {
            self.set_rest(kv, v);
            return;
        }
        let kv = self.new_pair(sym, v);
        let frame = self.new_pair(kv, frame);
        self.set_first(env, frame);
    }

    /// Overwrite the innermost existing binding of `sym`, or create one
    /// in the outermost frame when none exists anywhere.
    pub fn env_set_global(&mut self, env: ObjRef, sym: ObjRef, v: ObjRef) {
        if let Some(kv) = self.env_find(env, sym) {
            self.set_rest(kv, v);
            return;
        }
        // Last frame link in the chain is the global one.
        let mut outer = env;
        while !self.rest(outer).is_nil() {
            outer = self.rest(outer);
        }
        let kv = self.new_pair(sym, v);
        let frame = self.new_pair(kv, self.first(outer));
        self.set_first(outer, frame);
    }

    /// Push a fresh innermost frame onto `env`, returning the extended
    /// environment. The original chain is shared, not copied.
    pub fn env_push_frame(&mut self, env: ObjRef) -> ObjRef {
        self.new_pair(ObjRef::NIL, env)
    }

    fn frame_find(&self, frame: ObjRef, name: tern_ns::NameId) -> Option<ObjRef> {
        let mut cur = frame;
        while let Value::Pair { first, rest } = self.value(cur) {
            let (kv, next) = (*first, *rest);
            if self.sym_of(self.first(kv)) == Some(name) {
                return Some(kv);
            }
            cur = next;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_binding_shadows_outer() {
        let mut interp = Interp::new();
        let sym = interp.new_sym_str("x");
        let outer_v = interp.new_int(1);
        let inner_v = interp.new_int(2);
        let top = interp.top_env();
        interp.env_set_local(top, sym, outer_v);
        let inner = interp.env_push_frame(top);
        interp.env_set_local(inner, sym, inner_v);
        assert_eq!(interp.env_get(inner, sym), Some(inner_v));
        assert_eq!(interp.env_get(top, sym), Some(outer_v));
    }

    #[test]
    fn global_set_mutates_existing_binding_in_place() {
        let mut interp = Interp::new();
        let sym = interp.new_sym_str("counter");
        let v1 = interp.new_int(10);
        let v2 = interp.new_int(20);
        let top = interp.top_env();
        interp.env_set_local(top, sym, v1);
        let inner = interp.env_push_frame(top);
        interp.env_set_global(inner, sym, v2);
        assert_eq!(interp.env_get(top, sym), Some(v2));
    }

    #[test]
    fn global_set_of_unknown_name_lands_in_outermost_frame() {
        let mut interp = Interp::new();
        let sym = interp.new_sym_str("fresh");
        let v = interp.new_int(7);
        let top = interp.top_env();
        let mid = interp.env_push_frame(top);
        let inner = interp.env_push_frame(mid);
        interp.env_set_global(inner, sym, v);
        assert_eq!(interp.env_get(top, sym), Some(v));
        // The intermediate frame stays empty.
        assert!(interp.first(mid).is_nil());
    }

    #[test]
    fn lookup_misses_return_none() {
        let mut interp = Interp::new();
        let sym = interp.new_sym_str("no-such-name");
        let top = interp.top_env();
        assert_eq!(interp.env_get(top, sym), None);
    }

    #[test]
    fn set_local_overwrites_without_growing_the_frame() {
        let mut interp = Interp::new();
        let sym = interp.new_sym_str("x");
        let v1 = interp.new_int(1);
        let v2 = interp.new_int(2);
        let top = interp.top_env();
        interp.env_set_local(top, sym, v1);
        let before = interp.list_len(interp.first(top));
        interp.env_set_local(top, sym, v2);
        assert_eq!(interp.list_len(interp.first(top)), before);
        assert_eq!(interp.env_get(top, sym), Some(v2));
    }
}
