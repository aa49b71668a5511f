//! Purpose: C ABI bridge the host plugin loader links against (libjsonus).
//! Exports: One `jsonus_*` function per native, plus load/unload and error helpers.
//! Role: Marshals host arguments into `extension` calls and errors into codes.
//! Invariants: Return 0 on success, -1 on failure; failures fill `out_err` when non-null.
//! Invariants: Handles are opaque `u32` tokens; 0 is never a valid handle.
//! Invariants: Strings out are copied into caller buffers; no pointers into owned documents.
//! Invariants: Error kinds map 1:1 with `to_exit_code`.
#![allow(non_camel_case_types, clippy::not_unsafe_ptr_arg_deref)]

use crate::config::Config;
use crate::core::error::{Error, ErrorKind, to_exit_code};
use crate::core::handles::Handle;
use crate::extension::{self, Extension};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

#[repr(C)]
pub struct jsonus_error {
    kind: i32,
    message: *mut c_char,
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_load(base_dir: *const c_char, out_err: *mut *mut jsonus_error) -> i32 {
    let mut config = Config::new();
    if !base_dir.is_null() {
        match read_str(base_dir, "base_dir") {
            Ok(dir) => config = config.with_base_dir(dir),
            Err(err) => return fail(out_err, err),
        }
    }
    if !extension::load(config) {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("extension already loaded"),
        );
    }
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_unload() -> u32 {
    extension::unload() as u32
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_create(out_handle: *mut u32, out_err: *mut *mut jsonus_error) -> i32 {
    call(out_handle, out_err, |ext| ext.create().map(Handle::into_raw))
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_from_string(
    text: *const c_char,
    out_handle: *mut u32,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_handle, out_err, |ext| {
        let text = read_str(text, "text")?;
        ext.from_string(text).map(Handle::into_raw)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_from_file(
    path: *const c_char,
    out_handle: *mut u32,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_handle, out_err, |ext| {
        let path = read_str(path, "path")?;
        ext.from_file(path).map(Handle::into_raw)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_to_string(
    handle: u32,
    indent: i32,
    buf: *mut c_char,
    maxlen: usize,
    out_written: *mut usize,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_written, out_err, |ext| {
        let text = ext.to_string(Handle::from_raw(handle), indent)?;
        copy_to_buf(&text, buf, maxlen)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_to_file(
    handle: u32,
    path: *const c_char,
    indent: i32,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(ptr::null_mut(), out_err, |ext| {
        let path = read_str(path, "path")?;
        ext.to_file(Handle::from_raw(handle), path, indent)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_get(
    handle: u32,
    key: *const c_char,
    out_handle: *mut u32,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_handle, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.get(Handle::from_raw(handle), key).map(Handle::into_raw)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_get_bool(
    handle: u32,
    key: *const c_char,
    out_value: *mut u8,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_value, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.get_bool(Handle::from_raw(handle), key).map(u8::from)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_get_float(
    handle: u32,
    key: *const c_char,
    out_value: *mut f32,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_value, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.get_float(Handle::from_raw(handle), key)
            .map(|value| value as f32)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_get_int(
    handle: u32,
    key: *const c_char,
    out_value: *mut i32,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_value, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.get_int(Handle::from_raw(handle), key)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_get_int64(
    handle: u32,
    key: *const c_char,
    out_value: *mut i64,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_value, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.get_int64(Handle::from_raw(handle), key)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_get_string(
    handle: u32,
    key: *const c_char,
    buf: *mut c_char,
    maxlen: usize,
    out_written: *mut usize,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_written, out_err, |ext| {
        let key = read_str(key, "key")?;
        let value = ext.get_string(Handle::from_raw(handle), key)?;
        copy_to_buf(value, buf, maxlen)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_is_null(
    handle: u32,
    key: *const c_char,
    out_value: *mut u8,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_value, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.is_null(Handle::from_raw(handle), key).map(u8::from)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_has_key(
    handle: u32,
    key: *const c_char,
    out_value: *mut u8,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_value, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.has_key(Handle::from_raw(handle), key).map(u8::from)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_set_string(
    handle: u32,
    key: *const c_char,
    value: *const c_char,
    out_ok: *mut u8,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_ok, out_err, |ext| {
        let key = read_str(key, "key")?;
        let value = read_str(value, "value")?;
        ext.set_string(Handle::from_raw(handle), key, value).map(u8::from)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_set_int(
    handle: u32,
    key: *const c_char,
    value: i32,
    out_ok: *mut u8,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_ok, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.set_int(Handle::from_raw(handle), key, value).map(u8::from)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_set_int64(
    handle: u32,
    key: *const c_char,
    value: i64,
    out_ok: *mut u8,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_ok, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.set_int64(Handle::from_raw(handle), key, value).map(u8::from)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_set_bool(
    handle: u32,
    key: *const c_char,
    value: u8,
    out_ok: *mut u8,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_ok, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.set_bool(Handle::from_raw(handle), key, value != 0)
            .map(u8::from)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_set_float(
    handle: u32,
    key: *const c_char,
    value: f32,
    out_ok: *mut u8,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_ok, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.set_float(Handle::from_raw(handle), key, f64::from(value))
            .map(u8::from)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_write(
    handle: u32,
    key: *const c_char,
    value_json: *const c_char,
    out_ok: *mut u8,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_ok, out_err, |ext| {
        let key = read_str(key, "key")?;
        let value = read_str(value_json, "value_json")?;
        ext.write(Handle::from_raw(handle), key, value).map(u8::from)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_set(
    handle: u32,
    key: *const c_char,
    other: u32,
    out_ok: *mut u8,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_ok, out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.set(Handle::from_raw(handle), key, Handle::from_raw(other))
            .map(u8::from)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_remove(
    handle: u32,
    key: *const c_char,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(ptr::null_mut(), out_err, |ext| {
        let key = read_str(key, "key")?;
        ext.remove(Handle::from_raw(handle), key)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_clear(handle: u32, out_err: *mut *mut jsonus_error) -> i32 {
    call(ptr::null_mut(), out_err, |ext| {
        ext.clear(Handle::from_raw(handle))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_get_type(
    handle: u32,
    out_type: *mut i32,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_type, out_err, |ext| {
        ext.get_type(Handle::from_raw(handle)).map(|kind| kind.code())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_size(
    handle: u32,
    out_size: *mut usize,
    out_err: *mut *mut jsonus_error,
) -> i32 {
    call(out_size, out_err, |ext| ext.size(Handle::from_raw(handle)))
}

/// Host destroy notification for a handle.
#[unsafe(no_mangle)]
pub extern "C" fn jsonus_close(handle: u32, out_err: *mut *mut jsonus_error) -> i32 {
    call(ptr::null_mut(), out_err, |ext| {
        ext.close(Handle::from_raw(handle))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_error_kind(err: *const jsonus_error) -> i32 {
    if err.is_null() {
        return 0;
    }
    unsafe { (*err).kind }
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_error_message(err: *const jsonus_error) -> *const c_char {
    if err.is_null() {
        return ptr::null();
    }
    unsafe { (*err).message }
}

#[unsafe(no_mangle)]
pub extern "C" fn jsonus_error_free(err: *mut jsonus_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        if !err.message.is_null() {
            drop(CString::from_raw(err.message));
        }
    }
}

/// Runs `f` against the loaded extension and stores its result in `out`.
/// A null `out` is allowed only for unit results.
fn call<T>(
    out: *mut T,
    out_err: *mut *mut jsonus_error,
    f: impl FnOnce(&mut Extension) -> Result<T, Error>,
) -> i32 {
    let needs_out = std::mem::size_of::<T>() != 0;
    if needs_out && out.is_null() {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("output pointer is null"),
        );
    }
    match extension::with(f) {
        Ok(value) => {
            if needs_out {
                unsafe {
                    *out = value;
                }
            }
            0
        }
        Err(err) => fail(out_err, err),
    }
}

fn read_str<'a>(input: *const c_char, name: &str) -> Result<&'a str, Error> {
    if input.is_null() {
        return Err(Error::new(ErrorKind::Usage).with_message(format!("{name} is null")));
    }
    unsafe { CStr::from_ptr(input) }.to_str().map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{name} is not valid UTF-8"))
            .with_source(err)
    })
}

/// Copies `text` into `buf`, truncating on a char boundary, and NUL-terminates.
fn copy_to_buf(text: &str, buf: *mut c_char, maxlen: usize) -> Result<usize, Error> {
    if buf.is_null() || maxlen == 0 {
        return Err(Error::new(ErrorKind::Usage).with_message("output buffer is empty"));
    }
    let mut len = text.len().min(maxlen - 1);
    while !text.is_char_boundary(len) {
        len -= 1;
    }
    unsafe {
        ptr::copy_nonoverlapping(text.as_ptr(), buf.cast::<u8>(), len);
        *buf.add(len) = 0;
    }
    Ok(len)
}

fn fail(out_err: *mut *mut jsonus_error, err: Error) -> i32 {
    tracing::debug!(error = %err, "native call failed");
    if out_err.is_null() {
        return -1;
    }
    let error = Box::new(jsonus_error {
        kind: to_exit_code(err.kind()),
        message: to_c_string(&err.to_string()),
    });
    unsafe {
        *out_err = Box::into_raw(error);
    }
    -1
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}
