// C ABI smoke test: one sequential host session from load to unload.
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use jsonus::abi::*;

fn c(text: &str) -> CString {
    CString::new(text).expect("no interior nul")
}

fn take_error(err: *mut jsonus_error) -> (i32, String) {
    assert!(!err.is_null(), "error object expected");
    let kind = jsonus_error_kind(err);
    let message = unsafe { CStr::from_ptr(jsonus_error_message(err)) }
        .to_string_lossy()
        .into_owned();
    jsonus_error_free(err);
    (kind, message)
}

fn read_buf(buf: &[c_char], written: usize) -> String {
    let bytes: Vec<u8> = buf[..written].iter().map(|b| *b as u8).collect();
    String::from_utf8(bytes).expect("utf8")
}

#[test]
fn host_session_lifecycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = c(dir.path().to_str().expect("utf8 path"));
    let mut err: *mut jsonus_error = ptr::null_mut();

    // Calls before load fail with a usage error.
    let mut handle = 0u32;
    assert_eq!(jsonus_create(&mut handle, &mut err), -1);
    assert_eq!(take_error(err).0, 2);
    err = ptr::null_mut();

    assert_eq!(jsonus_load(base.as_ptr(), &mut err), 0);

    // A second load keeps the first instance and says so.
    let elsewhere = c("/nonexistent");
    assert_eq!(jsonus_load(elsewhere.as_ptr(), &mut err), -1);
    let (kind, message) = take_error(err);
    assert_eq!(kind, 2);
    assert!(message.contains("already loaded"));
    err = ptr::null_mut();

    // Parse and read.
    let text = c(r#"{"a":1,"b":"x","f":2.5,"on":true,"n":null}"#);
    assert_eq!(jsonus_from_string(text.as_ptr(), &mut handle, &mut err), 0);
    assert_ne!(handle, 0);

    let mut flag = 0u8;
    assert_eq!(jsonus_has_key(handle, c("a").as_ptr(), &mut flag, &mut err), 0);
    assert_eq!(flag, 1);
    let mut int = 0i32;
    assert_eq!(jsonus_get_int(handle, c("a").as_ptr(), &mut int, &mut err), 0);
    assert_eq!(int, 1);
    let mut float = 0f32;
    assert_eq!(jsonus_get_float(handle, c("f").as_ptr(), &mut float, &mut err), 0);
    assert_eq!(float, 2.5);
    assert_eq!(jsonus_get_bool(handle, c("on").as_ptr(), &mut flag, &mut err), 0);
    assert_eq!(flag, 1);
    assert_eq!(jsonus_is_null(handle, c("n").as_ptr(), &mut flag, &mut err), 0);
    assert_eq!(flag, 1);

    // Strict setter with readback, then string copy-out.
    assert_eq!(
        jsonus_set_string(handle, c("b").as_ptr(), c("y").as_ptr(), &mut flag, &mut err),
        0
    );
    assert_eq!(flag, 1);
    let mut buf = [0 as c_char; 128];
    let mut written = 0usize;
    assert_eq!(
        jsonus_get_string(
            handle,
            c("b").as_ptr(),
            buf.as_mut_ptr(),
            buf.len(),
            &mut written,
            &mut err
        ),
        0
    );
    assert_eq!(read_buf(&buf, written), "y");

    // Missing key on a strict setter is a key error.
    assert_eq!(
        jsonus_set_int(handle, c("missing").as_ptr(), 5, &mut flag, &mut err),
        -1
    );
    let (kind, message) = take_error(err);
    assert_eq!(kind, 4);
    assert!(message.contains("missing"));
    err = ptr::null_mut();

    // Upsert and nested set.
    assert_eq!(
        jsonus_write(handle, c("list").as_ptr(), c("[1,2]").as_ptr(), &mut flag, &mut err),
        0
    );
    assert_eq!(flag, 1);
    let mut other = 0u32;
    assert_eq!(jsonus_from_string(c(r#"{"k":"v"}"#).as_ptr(), &mut other, &mut err), 0);
    assert_eq!(jsonus_set(handle, c("obj").as_ptr(), other, &mut flag, &mut err), 0);
    assert_eq!(flag, 1);

    // Get issues a detached child handle.
    let mut child = 0u32;
    assert_eq!(jsonus_get(handle, c("obj").as_ptr(), &mut child, &mut err), 0);
    assert_ne!(child, handle);
    assert_eq!(jsonus_clear(child, &mut err), 0);
    let mut size = 0usize;
    assert_eq!(jsonus_size(child, &mut size, &mut err), 0);
    assert_eq!(size, 0);
    let mut kind = -1i32;
    assert_eq!(jsonus_get_type(child, &mut kind, &mut err), 0);
    assert_eq!(kind, 1);

    assert_eq!(jsonus_remove(handle, c("a").as_ptr(), &mut err), 0);
    assert_eq!(jsonus_remove(handle, c("a").as_ptr(), &mut err), 0);
    assert_eq!(
        jsonus_to_string(handle, 0, buf.as_mut_ptr(), buf.len(), &mut written, &mut err),
        0
    );
    assert_eq!(
        read_buf(&buf, written),
        r#"{"b":"y","f":2.5,"on":true,"n":null,"list":[1,2],"obj":{"k":"v"}}"#
    );

    // Truncated copy-out stays NUL-terminated.
    let mut small = [0 as c_char; 5];
    assert_eq!(
        jsonus_to_string(handle, -1, small.as_mut_ptr(), small.len(), &mut written, &mut err),
        0
    );
    assert_eq!(written, 4);
    assert_eq!(small[4], 0);

    // File round trip relative to the base dir.
    assert_eq!(jsonus_to_file(handle, c("out.json").as_ptr(), 2, &mut err), 0);
    let mut loaded = 0u32;
    assert_eq!(jsonus_from_file(c("out.json").as_ptr(), &mut loaded, &mut err), 0);
    assert_eq!(jsonus_get_string(loaded, c("b").as_ptr(), buf.as_mut_ptr(), buf.len(), &mut written, &mut err), 0);
    assert_eq!(read_buf(&buf, written), "y");
    assert_eq!(jsonus_from_file(c("absent.json").as_ptr(), &mut loaded, &mut err), -1);
    assert_eq!(take_error(err).0, 6);
    err = ptr::null_mut();

    // Malformed text and stale handles.
    assert_eq!(jsonus_from_string(c(r#"{"a":"#).as_ptr(), &mut other, &mut err), -1);
    assert_eq!(take_error(err).0, 3);
    err = ptr::null_mut();

    assert_eq!(jsonus_close(child, &mut err), 0);
    assert_eq!(jsonus_size(child, &mut size, &mut err), -1);
    assert_eq!(take_error(err).0, 7);
    err = ptr::null_mut();

    // Null pointers are usage errors, and a null out_err is tolerated.
    assert_eq!(jsonus_get_int(handle, ptr::null(), &mut int, &mut err), -1);
    assert_eq!(take_error(err).0, 2);
    assert_eq!(jsonus_get_int(handle, c("b").as_ptr(), &mut int, ptr::null_mut()), -1);

    // handle, other, loaded remain live.
    assert_eq!(jsonus_unload(), 3);
    assert_eq!(jsonus_unload(), 0);

    // Tokens kept across a reload never reach the new session's documents.
    assert_eq!(jsonus_load(base.as_ptr(), &mut err), 0);
    let mut fresh = 0u32;
    assert_eq!(jsonus_create(&mut fresh, &mut err), 0);
    for stale in [handle, other, loaded, child] {
        assert_ne!(fresh, stale);
    }
    assert_eq!(jsonus_size(handle, &mut size, &mut err), -1);
    assert_eq!(take_error(err).0, 7);
    assert_eq!(jsonus_unload(), 1);
}
