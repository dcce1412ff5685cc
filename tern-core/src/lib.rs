//!
//! This is the core interpreter for the Tern language.
//!
//! Tern is a small S-expression language meant to be embedded: the host
//! owns the interpreter, feeds it bytes, and gets called back through
//! native functions. Evaluation is a trampoline over explicit stacks, so
//! tail calls run in constant space, continuations are first-class and
//! re-invokable, and a parse or a program can suspend at any point while
//! waiting for input.

/// Facilities for inspecting interpreter state.
pub mod debug;
/// Facilities for environment lookup and mutation.
pub mod env;
/// Facilities for evaluation.
pub mod eval;
/// Facilities for garbage collection.
pub mod gc;
/// The interpreter's main data structure.
pub mod interp;
/// Facilities for optional built-in modules.
pub mod modules;
/// Facilities for object storage.
pub mod obj;
/// Facilities for feeding bytes to a suspended evaluation.
pub mod port;
/// Definitions for all supported primitives.
pub mod primitives;
/// Facilities for printing values.
pub mod printer;
/// Facilities for reading expressions.
pub mod reader;
/// Facilities for manipulating runtime values.
pub mod value;

pub use eval::{RunResult, StepResult};
pub use interp::{Interp, InterpConfig, ModloadHook};
pub use port::{BufferSource, ByteSource, ReadSource};
pub use value::{NativeFn, ObjRef, PtrDropFn, Value};

pub use tern_ns::NameId;
