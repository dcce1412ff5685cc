//!
//! This is the interactive driver for the Tern language.
//!

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
#[cfg(feature = "jemalloc")]
use jemallocator::Jemalloc;
use tern_core::eval::APPLY_PUSH_EVAL;
use tern_core::{BufferSource, Interp, InterpConfig, ObjRef};

mod shell;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Debug, Clone, Parser)]
#[clap(about, author)]
struct Options {
    /// Script to evaluate, instead of starting the interactive shell.
    file: Option<PathBuf>,

    /// Suppress shell chatter: 1 drops prompts, 2 also drops `#t`
    /// results, 3 drops every result.
    #[clap(long, short, default_value_t = 0)]
    quiet: i64,

    /// Ceiling on live interpreter objects.
    #[clap(long)]
    heap_limit: Option<usize>,

    /// Evaluator steps between garbage collections.
    #[clap(long)]
    gc_interval: Option<usize>,

    /// Enable verbose output (with timing information).
    #[clap(short = 'v')]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    run()
}

fn run() -> anyhow::Result<()> {
    let opts: Options = Options::parse();

    let mut config = InterpConfig::default();
    if let Some(limit) = opts.heap_limit {
        config.heap_limit = Some(limit);
    }
    if let Some(interval) = opts.gc_interval {
        config.gc_interval = interval;
    }
    let mut interp = Interp::with_config(config);
    interp.set_output(Box::new(std::io::stdout()));

    let mut level = opts.quiet;
    if opts.file.is_some() || !shell::stdin_is_terminal() {
        level = level.max(shell::QUIET_NO_TRUE);
    }
    let quiet_cell = shell::install_quiet(&mut interp, level);

    match opts.file {
        Some(ref path) => run_script(&mut interp, path, quiet_cell),
        None => shell::interactive(&mut interp, quiet_cell, opts.verbose),
    }
}

fn keep_value_k(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let v = interp.first(args);
    interp.values_push(v);
}

/// Evaluate a whole file expression by expression. Requests for input
/// made by the script, such as `(read)`, are served from the file's own
/// remaining bytes. A nil read ends the run, as at end of input.
fn run_script(interp: &mut Interp, path: &PathBuf, quiet_cell: ObjRef) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    let mut buf = BufferSource::from(text.trim());

    while !buf.is_empty() {
        interp.read_and_then(ObjRef::NIL, keep_value_k);
        interp.run_until_done(&mut buf);
        if let Some(err) = interp.error_get() {
            bail_script(interp, path, err)?;
        }
        let expr = match interp.values_pop() {
            Some((v, _)) => v,
            None => ObjRef::NIL,
        };
        if expr.is_nil() {
            break;
        }

        let env = interp.env();
        interp.push_apply(APPLY_PUSH_EVAL, expr, env);
        interp.run_until_done(&mut buf);
        if let Some(err) = interp.error_get() {
            bail_script(interp, path, err)?;
        }

        if let Some((v, _)) = interp.values_pop() {
            let level = shell::quiet_level(interp, quiet_cell);
            if level < shell::QUIET_NO_VALUE
                && !(level >= shell::QUIET_NO_TRUE && v == interp.true_())
            {
                let line = interp.print_str(v);
                interp.emit(&line);
                interp.emit("\n");
            }
        }
        interp.collect();
    }
    interp.flush_output();
    Ok(())
}

fn bail_script(interp: &mut Interp, path: &PathBuf, err: ObjRef) -> anyhow::Result<()> {
    let msg = interp.print_str(err);
    interp.reset_stacks();
    interp.error_clear();
    anyhow::bail!("error in {}: {}", path.display(), msg)
}
