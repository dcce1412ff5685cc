//!
//! Facilities for optional built-in modules.
//!
//! Modules are bundles of natives that are not part of the core library.
//! A program pulls one in with `(modload (quote name))`; embedders can
//! front the registry with their own hook, or install everything up
//! front with [`install_std_modules`].

use anyhow::Result;
use indexmap::IndexMap;
use log::{debug, warn};
use once_cell::sync::Lazy;

use crate::interp::Interp;

pub mod io;

/// A module initializer: registers the module's natives.
pub type ModInitFn = fn(&mut Interp) -> Result<()>;

static REGISTRY: Lazy<IndexMap<&'static str, ModInitFn>> = Lazy::new(|| {
    let mut m: IndexMap<&'static str, ModInitFn> = IndexMap::new();
    m.insert("io", io::init as ModInitFn);
    m
});

/// Load one registered module by name. Returns whether it loaded.
pub fn load_builtin(interp: &mut Interp, name: &str) -> bool {
    match REGISTRY.get(name) {
        Some(init) => match init(interp) {
            Ok(()) => {
                debug!("loaded module {}", name);
                true
            }
            Err(e) => {
                warn!("module {} failed to load: {}", name, e);
                false
            }
        },
        None => false,
    }
}

/// Load every registered module.
pub fn install_std_modules(interp: &mut Interp) {
    for (name, init) in REGISTRY.iter() {
        if let Err(e) = init(interp) {
            warn!("module {} failed to load: {}", name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_module_is_registered() {
        let mut interp = Interp::new();
        assert!(load_builtin(&mut interp, "io"));
        let sym = interp.new_sym_str("io-open");
        assert!(interp.env_get(interp.top_env(), sym).is_some());
    }

    #[test]
    fn unknown_modules_are_refused() {
        let mut interp = Interp::new();
        assert!(!load_builtin(&mut interp, "no-such-module"));
    }
}
