//!
//! Facilities for the built-in function library.
//!

use once_cell::sync::Lazy;

use crate::interp::Interp;
use crate::value::NativeFn;

mod arith;
mod control;
mod list;
mod system;

/// A primitive definition: binding name, implementation, and whether the
/// evaluator resolves arguments before the call.
pub type PrimInfo = (&'static str, NativeFn, bool);

static ALL_PRIMITIVES: Lazy<Vec<PrimInfo>> = Lazy::new(|| {
    let mut prims = Vec::new();
    prims.extend_from_slice(control::PRIMITIVES);
    prims.extend_from_slice(arith::PRIMITIVES);
    prims.extend_from_slice(list::PRIMITIVES);
    prims.extend_from_slice(system::PRIMITIVES);
    prims
});

/// Bind every primitive into the outermost environment.
pub(crate) fn install(interp: &mut Interp) {
    for &(name, func, by_value) in ALL_PRIMITIVES.iter() {
        interp.register(name, func, by_value);
    }
    #[cfg(feature = "debug-info")]
    crate::debug::install(interp);
}
