use std::cell::Cell;
use std::io::IsTerminal;
use std::time::Instant;

use anyhow::Error;
use log::warn;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tern_core::eval::APPLY_PUSH_EVAL;
use tern_core::{BufferSource, ByteSource, Interp, ObjRef, RunResult, Value};

/// Print prompts and every result.
pub const QUIET_OFF: i64 = 0;
/// Drop the prompts and banners.
pub const QUIET_NO_PROMPT: i64 = 1;
/// Also drop results that are exactly `#t`, the usual answer of
/// definition forms.
pub const QUIET_NO_TRUE: i64 = 2;
/// Drop every result.
pub const QUIET_NO_VALUE: i64 = 3;

pub fn stdin_is_terminal() -> bool {
    std::io::stdin().is_terminal()
}

/// Bind the `quiet` primitive over a fresh level cell and return the
/// cell, so the host can consult the level the program last set.
pub fn install_quiet(interp: &mut Interp, level: i64) -> ObjRef {
    let tag = interp.new_tag();
    let cell = interp.new_ptr(Box::new(Cell::new(level)), None, tag);
    interp.register_with_state("quiet", cf_quiet, true, cell);
    cell
}

/// `(quiet)` reports the current chatter level; `(quiet n)` sets it.
fn cf_quiet(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    if !args.is_nil() {
        let arg = interp.first(args);
        match interp.int_of(arg) {
            Some(n) => {
                set_quiet_level(interp, state, n);
                let t = interp.true_();
                interp.values_push(t);
            }
            None => interp.error_with("quiet on non-int", arg),
        }
    } else {
        let n = quiet_level(interp, state);
        let v = interp.new_int(n);
        interp.values_push(v);
    }
}

pub fn quiet_level(interp: &Interp, cell: ObjRef) -> i64 {
    match interp.value(cell) {
        Value::Ptr {
            data: Some(data), ..
        } => data
            .downcast_ref::<Cell<i64>>()
            .map(|c| c.get())
            .unwrap_or(QUIET_OFF),
        _ => QUIET_OFF,
    }
}

fn set_quiet_level(interp: &Interp, cell: ObjRef, n: i64) {
    if let Value::Ptr {
        data: Some(data), ..
    } = interp.value(cell)
    {
        if let Some(c) = data.downcast_ref::<Cell<i64>>() {
            c.set(n);
        }
    }
}

fn keep_value_k(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let v = interp.first(args);
    interp.values_push(v);
}

/// Launches an interactive read-eval-print loop over the given
/// interpreter.
pub fn interactive(interp: &mut Interp, quiet_cell: ObjRef, verbose: bool) -> Result<(), Error> {
    let mut editor = DefaultEditor::new()?;
    let mut pending = BufferSource::new();

    if quiet_level(interp, quiet_cell) == QUIET_OFF {
        let banner = interp.print_str(interp.top_env());
        eprint!("Top Env: ");
        interp.emit(&banner);
        interp.emit("\n");
        interp.flush_output();
    }

    loop {
        let level = quiet_level(interp, quiet_cell);
        let prompt = if level >= QUIET_NO_PROMPT { "" } else { "> " };

        interp.read_and_then(ObjRef::NIL, keep_value_k);
        let start = Instant::now();
        drive(interp, &mut editor, &mut pending, prompt);
        let elapsed = start.elapsed();
        if verbose {
            eprintln!(
                "Reading time: {} ms ({} µs)",
                elapsed.as_millis(),
                elapsed.as_micros()
            );
        }

        if let Some(err) = interp.error_get() {
            report_error(interp, err);
            interp.reset_stacks();
            interp.error_clear();
            interp.collect();
            continue;
        }

        let expr = match interp.values_pop() {
            Some((v, _)) => v,
            None => ObjRef::NIL,
        };
        // A nil read is the end of the session, whether the input closed
        // or the user typed a bare `()`.
        if expr.is_nil() {
            if level == QUIET_OFF {
                eprintln!("Done.");
            }
            break;
        }
        if level == QUIET_OFF {
            eprint!("Read: ");
            let echoed = interp.print_str(expr);
            interp.emit(&echoed);
            interp.emit("\n");
            interp.flush_output();
        }

        let env = interp.env();
        interp.push_apply(APPLY_PUSH_EVAL, expr, env);
        let start = Instant::now();
        drive(interp, &mut editor, &mut pending, "");
        let elapsed = start.elapsed();
        if verbose {
            eprintln!(
                "Execution time: {} ms ({} µs)",
                elapsed.as_millis(),
                elapsed.as_micros()
            );
        }

        if let Some(err) = interp.error_get() {
            report_error(interp, err);
            interp.error_clear();
        } else {
            let level = quiet_level(interp, quiet_cell);
            if let Some((v, _)) = interp.values_pop() {
                if level == QUIET_OFF {
                    eprint!("Value: ");
                }
                if level < QUIET_NO_VALUE && !(level >= QUIET_NO_TRUE && v == interp.true_()) {
                    let line = interp.print_str(v);
                    interp.emit(&line);
                    interp.emit("\n");
                    interp.flush_output();
                }
            }
            if interp.values_depth() > 0 {
                eprint!("(Rest of stack:");
                while let Some((v, _)) = interp.values_pop() {
                    let line = interp.print_str(v);
                    eprint!(" {}", line);
                }
                eprintln!(")");
            }
        }

        interp.reset_stacks();
        interp.collect();
    }

    Ok(())
}

/// Errors are always reported, whatever the quiet level.
fn report_error(interp: &Interp, err: ObjRef) {
    let msg = interp.print_str(err);
    eprintln!("Error: {}", msg);
}

/// Run the pending evaluation, serving byte requests from leftover line
/// input and prompting for more lines as needed. A closed input feeds
/// the end-of-stream byte, which the evaluator sees as -1.
fn drive(
    interp: &mut Interp,
    editor: &mut DefaultEditor,
    pending: &mut BufferSource,
    prompt: &str,
) {
    loop {
        match interp.run() {
            RunResult::Done => return,
            RunResult::AwaitInput => match pending.read_byte() {
                Some(b) => interp.feed_byte(Some(b)),
                None => match editor.readline(prompt) {
                    Ok(line) => {
                        if !line.trim().is_empty() {
                            let _ = editor.add_history_entry(line.as_str());
                        }
                        pending.feed(line.as_bytes());
                        pending.feed(b"\n");
                        interp.feed_byte(pending.read_byte());
                    }
                    Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                        interp.feed_byte(None);
                    }
                    Err(e) => {
                        warn!("line input failed: {}", e);
                        interp.feed_byte(None);
                    }
                },
            },
        }
    }
}
