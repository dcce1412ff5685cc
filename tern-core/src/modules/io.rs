//!
//! File access for programs that want it.
//!
//! Handles are opaque pointers carrying a tag issued at load time, so
//! two interpreters (or two loads) never confuse each other's handles.
//! A handle left unclosed is closed by the collector once the program
//! drops it.

use std::any::Any;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};

use anyhow::Result;

use crate::interp::Interp;
use crate::value::{ObjRef, Value};

pub fn init(interp: &mut Interp) -> Result<()> {
    let tag = interp.new_tag();
    let tag_obj = interp.new_int(tag as i64);
    interp.register_with_state("io-open", cf_io_open, true, tag_obj);
    interp.register_with_state("io-close", cf_io_close, true, tag_obj);
    interp.register_with_state("io-read", cf_io_read, true, tag_obj);
    interp.register_with_state("io-write", cf_io_write, true, tag_obj);
    interp.register_with_state("io-flush", cf_io_flush, true, tag_obj);
    Ok(())
}

fn state_tag(interp: &Interp, state: ObjRef) -> u32 {
    interp.int_of(state).unwrap_or(0) as u32
}

fn sym_to_string(interp: &Interp, v: ObjRef) -> Option<String> {
    interp
        .sym_of(v)
        .map(|name| String::from_utf8_lossy(interp.sym_bytes(name)).into_owned())
}

/// `(io-open name mode)` with mode `r`, `w` or `a`. Yields a handle, or
/// `#f` when the file cannot be opened.
fn cf_io_open(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let tag = state_tag(interp, state);
    let name_arg = interp.arg(args, 0);
    let mode_arg = interp.arg(args, 1);
    let name = match sym_to_string(interp, name_arg) {
        Some(name) => name,
        None => {
            interp.error_with("io-open on non-sym", name_arg);
            return;
        }
    };
    let mode = match sym_to_string(interp, mode_arg) {
        Some(mode) => mode,
        None => {
            interp.error_with("io-open on non-sym", mode_arg);
            return;
        }
    };
    let opened = match mode.as_str() {
        "r" => OpenOptions::new().read(true).open(&name),
        "w" => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&name),
        "a" => OpenOptions::new().append(true).create(true).open(&name),
        _ => {
            interp.error_with("bad io mode", mode_arg);
            return;
        }
    };
    match opened {
        Ok(file) => {
            let p = interp.new_ptr(Box::new(file), Some(drop_file), tag);
            interp.values_push(p);
        }
        Err(_) => {
            let f = interp.false_();
            interp.values_push(f);
        }
    }
}

fn cf_io_close(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let tag = state_tag(interp, state);
    let p = interp.arg(args, 0);
    match interp.store.value_mut(p) {
        Value::Ptr {
            data,
            drop_fn,
            tag: t,
        } if *t == tag => {
            drop_fn.take();
            let was_open = data.take().is_some();
            let v = if was_open {
                interp.true_()
            } else {
                interp.false_()
            };
            interp.values_push(v);
        }
        _ => interp.error_with("not an io handle", p),
    }
}

/// `(io-read handle n)`: up to `n` bytes as a symbol. Short reads give a
/// short symbol; end of file gives the empty symbol.
fn cf_io_read(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let tag = state_tag(interp, state);
    let p = interp.arg(args, 0);
    let n_arg = interp.arg(args, 1);
    let n = match interp.int_of(n_arg) {
        Some(n) if n >= 0 => n as u64,
        _ => {
            interp.error_with("io-read on non-int", n_arg);
            return;
        }
    };
    let mut file = match take_file(interp, p, tag) {
        Some(file) => file,
        None => return,
    };
    let mut buf = Vec::new();
    let res = (&mut file).take(n).read_to_end(&mut buf);
    put_file(interp, p, file);
    match res {
        Ok(_) => {
            let sym = interp.new_sym_bytes(&buf);
            interp.values_push(sym);
        }
        Err(_) => {
            let f = interp.false_();
            interp.values_push(f);
        }
    }
}

/// `(io-write handle syms...)`: write each symbol's bytes, yielding the
/// total written.
fn cf_io_write(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let tag = state_tag(interp, state);
    let p = interp.arg(args, 0);
    let mut bytes = Vec::new();
    let mut cur = interp.rest(args);
    while !cur.is_nil() {
        let item = interp.first(cur);
        match interp.sym_of(item) {
            Some(name) => bytes.extend_from_slice(interp.sym_bytes(name)),
            None => {
                interp.error_with("io-write on non-sym", item);
                return;
            }
        }
        cur = interp.rest(cur);
    }
    let mut file = match take_file(interp, p, tag) {
        Some(file) => file,
        None => return,
    };
    let res = file.write_all(&bytes);
    put_file(interp, p, file);
    match res {
        Ok(()) => {
            let n = interp.new_int(bytes.len() as i64);
            interp.values_push(n);
        }
        Err(_) => {
            let f = interp.false_();
            interp.values_push(f);
        }
    }
}

fn cf_io_flush(interp: &mut Interp, args: ObjRef, state: ObjRef) {
    let tag = state_tag(interp, state);
    let p = interp.arg(args, 0);
    let mut file = match take_file(interp, p, tag) {
        Some(file) => file,
        None => return,
    };
    let res = file.flush();
    put_file(interp, p, file);
    let v = if res.is_ok() {
        interp.true_()
    } else {
        interp.false_()
    };
    interp.values_push(v);
}

/// Dropping the handle closes the file.
fn drop_file(_data: Box<dyn Any>) {}

/// Borrow the file out of its slot for the duration of an operation.
/// The handle stays rooted through the argument list, so the slot
/// cannot be collected while the file is out.
fn take_file(interp: &mut Interp, p: ObjRef, tag: u32) -> Option<File> {
    let taken = match interp.store.value_mut(p) {
        Value::Ptr { data, tag: t, .. } if *t == tag => data.take(),
        _ => None,
    };
    match taken {
        Some(data) => match data.downcast::<File>() {
            Ok(file) => Some(*file),
            Err(data) => {
                put_file_box(interp, p, data);
                interp.error_with("not an io handle", p);
                None
            }
        },
        None => {
            interp.error_with("not an io handle", p);
            None
        }
    }
}

fn put_file(interp: &mut Interp, p: ObjRef, file: File) {
    put_file_box(interp, p, Box::new(file));
}

fn put_file_box(interp: &mut Interp, p: ObjRef, data: Box<dyn Any>) {
    if let Value::Ptr { data: slot, .. } = interp.store.value_mut(p) {
        *slot = Some(data);
    }
}
