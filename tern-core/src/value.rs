//!
//! Facilities for manipulating runtime values.
//!

use std::any::Any;
use std::fmt;

use tern_ns::NameId;

use crate::interp::Interp;

/// A handle to an object slot in the interpreter's store.
///
/// Slot 0 is reserved for the empty list, so `ObjRef::NIL` needs no store
/// access to test for. Handles are plain indices; they are cheap to copy
/// and compare but only meaningful against the store that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(pub u32);

impl ObjRef {
    /// The empty list.
    pub const NIL: ObjRef = ObjRef(0);

    /// Whether this is the empty list. Note that nil is still a pair; use
    /// this for the "is it non-empty" question.
    #[inline]
    pub fn is_nil(self) -> bool {
        self.0 == 0
    }
}

/// The calling convention shared by native functions, continuation
/// callbacks and reader states: the interpreter, the argument list, and
/// the object's state value (nil unless the object carries one).
pub type NativeFn = fn(&mut Interp, ObjRef, ObjRef);

/// Finalizer for an opaque pointer's payload, run when the object is
/// reclaimed or the interpreter is torn down.
pub type PtrDropFn = fn(Box<dyn Any>);

/// A runtime value. One closed set of kinds; every dispatch in the
/// evaluator is an exhaustive match over this enum.
pub enum Value {
    /// The empty list payload. Lives only in slot 0.
    Nil,
    /// A signed machine integer.
    Int(i64),
    /// An interned symbol; equality is identity on the name.
    Sym(NameId),
    /// A cons cell.
    Pair { first: ObjRef, rest: ObjRef },
    /// A host function. `by_value` selects whether the evaluator resolves
    /// argument expressions before the call; `state` is embedder instance
    /// data passed back on every invocation.
    Native {
        func: NativeFn,
        name: Option<&'static str>,
        by_value: bool,
        state: ObjRef,
    },
    /// An internal continuation callback: resumes a suspended native
    /// computation with its saved state. Receives arguments raw.
    Then {
        func: NativeFn,
        name: Option<&'static str>,
        state: ObjRef,
    },
    /// A user function: formals, body expressions, captured environment.
    Closure {
        params: ObjRef,
        body: ObjRef,
        env: ObjRef,
    },
    /// Like a closure, but receives arguments unevaluated and binds the
    /// caller's environment under `env_name` inside the body.
    Macro {
        params: ObjRef,
        body: ObjRef,
        env: ObjRef,
        env_name: NameId,
    },
    /// A captured continuation: immutable snapshots of the evaluator
    /// stacks and environment. Invokable any number of times.
    Cont {
        env: ObjRef,
        conts: ObjRef,
        values: ObjRef,
    },
    /// An opaque host resource. `data` is `None` once released; `tag`
    /// discriminates resource families across embedders.
    Ptr {
        data: Option<Box<dyn Any>>,
        drop_fn: Option<PtrDropFn>,
        tag: u32,
    },
}

impl Value {
    /// The kind name reported by the `type` primitive and debug dumps.
    /// Nil reports as a pair; emptiness is a separate question.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil | Value::Pair { .. } => "pair",
            Value::Int(_) => "int",
            Value::Sym(_) => "sym",
            Value::Native { .. } => "native",
            Value::Then { .. } => "then",
            Value::Closure { .. } => "lambda",
            Value::Macro { .. } => "macro",
            Value::Cont { .. } => "cont",
            Value::Ptr { .. } => "ptr",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Native { .. }
                | Value::Then { .. }
                | Value::Closure { .. }
                | Value::Macro { .. }
                | Value::Cont { .. }
        )
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Sym(n) => write!(f, "Sym({n})"),
            Value::Pair { first, rest } => write!(f, "Pair({}, {})", first.0, rest.0),
            Value::Native { name, by_value, .. } => {
                write!(f, "Native({}, by_value={by_value})", name.unwrap_or("?"))
            }
            Value::Then { name, state, .. } => {
                write!(f, "Then({}, state={})", name.unwrap_or("?"), state.0)
            }
            Value::Closure { params, body, .. } => {
                write!(f, "Closure(params={}, body={})", params.0, body.0)
            }
            Value::Macro { params, body, .. } => {
                write!(f, "Macro(params={}, body={})", params.0, body.0)
            }
            Value::Cont { conts, values, .. } => {
                write!(f, "Cont(conts={}, values={})", conts.0, values.0)
            }
            Value::Ptr { data, tag, .. } => {
                write!(f, "Ptr(tag={tag}, open={})", data.is_some())
            }
        }
    }
}
