//! C FFI bindings for the tagbridge audio metadata engine.
//!
//! Provides a C-compatible API for reading and writing audio file tags from
//! any language that can call C functions (Go, Python, Swift, C++, etc.).
//!
//! Tag sets cross the boundary as null-terminated arrays of UTF-8 rows,
//! each row `key + "\t" + value`; multiple values of one key are joined by
//! a vertical tab (`'\u{0B}'`) on the way in and split into one row per
//! value on the way out. Errors never cross the boundary as codes or
//! strings: a failing call returns null (pointer results) or `false`
//! (boolean results).
//!
//! Every allocation handed to the caller has exactly one matching free
//! function in this module. Freeing with anything else is undefined
//! behavior.
//!
//! # Safety
//!
//! All functions in this module use raw pointers and are `unsafe` by nature
//! of the C FFI. Callers must ensure that:
//! - Pointers are valid and non-null unless documented otherwise
//! - Path and row strings are valid UTF-8 and null-terminated
//! - Buffers are freed exactly once, with the matching free function
//! - Thread safety is managed by the caller

pub mod handle;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use tagbridge_core::{merge, picture, rows, WriteFlags};

// ─────────────────────────── Argument helpers ───────────────────────────

/// Borrow a C string argument as UTF-8, or bail.
unsafe fn utf8_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Collect a null-terminated row array into owned strings.
///
/// Rows that are not valid UTF-8 are skipped, matching the lenient row
/// decoding on the other side of the boundary. A null array pointer is a
/// caller error and yields `None`.
unsafe fn collect_rows(rows: *const *const c_char) -> Option<Vec<String>> {
    if rows.is_null() {
        return None;
    }

    let mut out = Vec::new();
    let mut cursor = rows;
    loop {
        let row = unsafe { *cursor };
        if row.is_null() {
            break;
        }
        if let Ok(s) = unsafe { CStr::from_ptr(row) }.to_str() {
            out.push(s.to_owned());
        }
        cursor = unsafe { cursor.add(1) };
    }
    Some(out)
}

/// Leak a row list as a null-terminated `char*` array.
///
/// Each row becomes one heap `CString`; the array itself is a leaked boxed
/// slice of `row count + 1` pointers with a null sentinel last. The whole
/// structure is reclaimed by [`tagbridge_free_tags`]. Rows containing an
/// interior NUL cannot be represented as C strings and are dropped.
fn rows_into_raw(row_list: Vec<String>) -> *mut *mut c_char {
    let mut pointers: Vec<*mut c_char> = row_list
        .into_iter()
        .filter_map(|row| CString::new(row).ok())
        .map(CString::into_raw)
        .collect();
    pointers.push(ptr::null_mut());

    let mut boxed = pointers.into_boxed_slice();
    let array = boxed.as_mut_ptr();
    std::mem::forget(boxed);
    array
}

// ─────────────────────────── Core API ───────────────────────────

/// Return the library version string.
///
/// The returned pointer is valid for the lifetime of the library.
/// Do NOT free the returned string.
#[no_mangle]
pub extern "C" fn tagbridge_version() -> *const c_char {
    c"0.1.0".as_ptr()
}

/// Read the full tag set of the audio file at `path`.
///
/// Returns a null-terminated array of `key + "\t" + value` rows, one row
/// per value (a key with N values appears in N rows). A file with no tags
/// yields an array holding only the null sentinel. Returns null if the
/// path is null, not UTF-8, or not a readable audio file.
///
/// The caller must free the result with [`tagbridge_free_tags`].
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 string, or null.
#[no_mangle]
pub unsafe extern "C" fn tagbridge_read_tags(path: *const c_char) -> *mut *mut c_char {
    let Some(path) = (unsafe { utf8_arg(path) }) else {
        return ptr::null_mut();
    };

    match tagbridge_core::read_tags(Path::new(path)) {
        Ok(map) => rows_into_raw(rows::encode(&map)),
        Err(e) => {
            tracing::debug!(path, error = %e, "read_tags failed");
            ptr::null_mut()
        }
    }
}

/// Merge a tag delta into the audio file at `path` and persist it.
///
/// `tags` is a null-terminated array of rows. Each row replaces one key's
/// value list; a row with an empty value segment deletes the key; a row
/// without a tab is skipped. Multiple values for one key travel in a
/// single row, joined by `'\u{0B}'`. Unmentioned keys are kept.
///
/// `flags` is a bitmask: bit 0 clears all existing tags before applying
/// the delta, bit 1 skips the save when the merged set equals the stored
/// one (that skip still returns `true`).
///
/// Returns `false` on null arguments, a non-UTF-8 path, an unreadable
/// file, or a failed save.
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 string or null. `tags`
/// must be a valid null-terminated array of null-terminated strings, or
/// null.
#[no_mangle]
pub unsafe extern "C" fn tagbridge_write_tags(
    path: *const c_char,
    tags: *const *const c_char,
    flags: u32,
) -> bool {
    let Some(path) = (unsafe { utf8_arg(path) }) else {
        return false;
    };
    let Some(row_list) = (unsafe { collect_rows(tags) }) else {
        return false;
    };

    match merge::write_tags(Path::new(path), row_list, WriteFlags(flags)) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(path, error = %e, "write_tags failed");
            false
        }
    }
}

/// Read the audio properties of the file at `path`.
///
/// Returns a 4-element `i32` array: length in milliseconds, channel count,
/// sample rate in Hz, bitrate in kbps. Properties the container does not
/// expose are 0. Returns null if the file cannot be read.
///
/// The caller must free the result with [`tagbridge_free_audio_properties`].
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 string, or null.
#[no_mangle]
pub unsafe extern "C" fn tagbridge_read_audio_properties(path: *const c_char) -> *mut i32 {
    let Some(path) = (unsafe { utf8_arg(path) }) else {
        return ptr::null_mut();
    };

    match tagbridge_core::read_properties(Path::new(path)) {
        Ok(props) => Box::into_raw(Box::new(props.to_array())).cast::<i32>(),
        Err(e) => {
            tracing::debug!(path, error = %e, "read_audio_properties failed");
            ptr::null_mut()
        }
    }
}

/// Read the front cover of the file at `path`.
///
/// Prefers the picture classified as the front cover and falls back to the
/// first embedded picture. Writes the byte length to `out_len` and returns
/// the image buffer. Returns null if the file has no pictures or cannot be
/// read; `out_len` is untouched in that case.
///
/// The caller must free the buffer with [`tagbridge_free_buffer`].
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 string or null, and
/// `out_len` a valid non-null pointer.
#[no_mangle]
pub unsafe extern "C" fn tagbridge_read_front_cover(
    path: *const c_char,
    out_len: *mut u64,
) -> *mut u8 {
    if out_len.is_null() {
        return ptr::null_mut();
    }
    let Some(path) = (unsafe { utf8_arg(path) }) else {
        return ptr::null_mut();
    };

    match picture::read_front_cover(Path::new(path)) {
        Ok(data) => {
            let len = data.len() as u64;
            let mut boxed = data.into_boxed_slice();
            let ptr = boxed.as_mut_ptr();
            unsafe { *out_len = len };
            std::mem::forget(boxed);
            ptr
        }
        Err(e) => {
            tracing::debug!(path, error = %e, "read_front_cover failed");
            ptr::null_mut()
        }
    }
}

/// Replace the embedded picture set of the file at `path` with one front
/// cover built from `data`.
///
/// The MIME type is sniffed from the payload: a PNG signature means
/// `image/png`, anything else `image/jpeg`. Returns `false` on null
/// arguments, an unreadable file, or a failed save.
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 string or null, and
/// `data` a valid pointer to at least `len` readable bytes, or null.
#[no_mangle]
pub unsafe extern "C" fn tagbridge_write_front_cover(
    path: *const c_char,
    data: *const u8,
    len: u64,
) -> bool {
    let Some(path) = (unsafe { utf8_arg(path) }) else {
        return false;
    };
    if data.is_null() {
        return false;
    }
    let payload = unsafe { std::slice::from_raw_parts(data, len as usize) };

    match picture::write_front_cover(Path::new(path), payload) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(path, error = %e, "write_front_cover failed");
            false
        }
    }
}

/// Remove all embedded pictures from the file at `path`.
///
/// Succeeds (and saves) even when the file has no pictures. Returns
/// `false` on a null or non-UTF-8 path, an unreadable file, or a failed
/// save.
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 string, or null.
#[no_mangle]
pub unsafe extern "C" fn tagbridge_clear_pictures(path: *const c_char) -> bool {
    let Some(path) = (unsafe { utf8_arg(path) }) else {
        return false;
    };

    match picture::clear_pictures(Path::new(path)) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(path, error = %e, "clear_pictures failed");
            false
        }
    }
}

// ─────────────────────────── Memory management ───────────────────────────

/// Allocate a zeroed byte buffer the caller can fill and hand back across
/// the boundary (e.g. as the payload of [`tagbridge_write_front_cover`]).
///
/// Returns null when `len` is 0. The buffer must be released with
/// [`tagbridge_free_buffer`] and the same `len`.
#[no_mangle]
pub extern "C" fn tagbridge_alloc(len: u64) -> *mut u8 {
    if len == 0 {
        return ptr::null_mut();
    }
    let mut boxed = vec![0u8; len as usize].into_boxed_slice();
    let ptr = boxed.as_mut_ptr();
    std::mem::forget(boxed);
    ptr
}

/// Free a byte buffer returned by [`tagbridge_read_front_cover`] or
/// [`tagbridge_alloc`].
///
/// # Safety
///
/// `ptr` must be a pointer returned by one of those functions with `len`
/// matching its allocation length, or null (in which case this is a
/// no-op).
#[no_mangle]
pub unsafe extern "C" fn tagbridge_free_buffer(ptr: *mut u8, len: u64) {
    if !ptr.is_null() {
        let slice = unsafe { std::slice::from_raw_parts_mut(ptr, len as usize) };
        drop(unsafe { Box::from_raw(slice as *mut [u8]) });
    }
}

/// Free a single string returned by this library.
///
/// # Safety
///
/// `ptr` must be a valid pointer returned by a string-returning function
/// of this library (never [`tagbridge_version`]), or null (no-op).
#[no_mangle]
pub unsafe extern "C" fn tagbridge_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// Free a row array returned by [`tagbridge_read_tags`] or
/// [`handle::tagbridge_file_read_tags`], including every row in it.
///
/// # Safety
///
/// `rows` must be a valid pointer returned by one of those functions, or
/// null (no-op). The array must still carry its null sentinel.
#[no_mangle]
pub unsafe extern "C" fn tagbridge_free_tags(rows: *mut *mut c_char) {
    if rows.is_null() {
        return;
    }

    let mut count = 0usize;
    loop {
        let row = unsafe { *rows.add(count) };
        if row.is_null() {
            break;
        }
        drop(unsafe { CString::from_raw(row) });
        count += 1;
    }

    // Reclaim the pointer array itself: `count` rows plus the sentinel.
    let slice = unsafe { std::slice::from_raw_parts_mut(rows, count + 1) };
    drop(unsafe { Box::from_raw(slice as *mut [*mut c_char]) });
}

/// Free a properties array returned by [`tagbridge_read_audio_properties`]
/// or [`handle::tagbridge_file_audio_properties`].
///
/// # Safety
///
/// `ptr` must be a valid pointer returned by one of those functions, or
/// null (no-op).
#[no_mangle]
pub unsafe extern "C" fn tagbridge_free_audio_properties(ptr: *mut i32) {
    if !ptr.is_null() {
        drop(unsafe { Box::from_raw(ptr.cast::<[i32; 4]>()) });
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{rows_to_vec, wav_file};
    use std::ffi::CString;

    // ───────────────── tagbridge_version ─────────────────

    #[test]
    fn test_version() {
        let ptr = tagbridge_version();
        assert!(!ptr.is_null());
        let version = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(version, "0.1.0");
    }

    // ───────────────── tagbridge_read_tags ─────────────────

    #[test]
    fn test_read_tags_null_path() {
        let result = unsafe { tagbridge_read_tags(ptr::null()) };
        assert!(result.is_null());
    }

    #[test]
    fn test_read_tags_bad_path() {
        let bad = CString::new("/tmp/nonexistent_tagbridge_file_12345.wav").unwrap();
        let result = unsafe { tagbridge_read_tags(bad.as_ptr()) };
        assert!(result.is_null());
    }

    #[test]
    fn test_read_tags_fresh_file_is_empty_array() {
        let (_dir, c_path) = wav_file();

        let rows = unsafe { tagbridge_read_tags(c_path.as_ptr()) };
        assert!(!rows.is_null(), "fresh file should yield an empty array, not null");
        assert!(unsafe { *rows }.is_null(), "first element should be the sentinel");

        unsafe { tagbridge_free_tags(rows) };
    }

    // ───────────────── tagbridge_write_tags ─────────────────

    #[test]
    fn test_write_tags_null_arguments() {
        let (_dir, c_path) = wav_file();
        let rows = [ptr::null::<c_char>()];

        assert!(!unsafe { tagbridge_write_tags(ptr::null(), rows.as_ptr(), 0) });
        assert!(!unsafe { tagbridge_write_tags(c_path.as_ptr(), ptr::null(), 0) });
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let (_dir, c_path) = wav_file();

        let row_a = CString::new("ARTIST\tExample A\u{0B}Example B").unwrap();
        let row_b = CString::new("ALBUM\tExample").unwrap();
        let rows = [row_a.as_ptr(), row_b.as_ptr(), ptr::null()];

        assert!(unsafe { tagbridge_write_tags(c_path.as_ptr(), rows.as_ptr(), 0) });

        let out = unsafe { tagbridge_read_tags(c_path.as_ptr()) };
        assert!(!out.is_null());
        let mut read_back = unsafe { rows_to_vec(out) };
        read_back.sort();
        assert_eq!(
            read_back,
            vec!["ALBUM\tExample", "ARTIST\tExample A", "ARTIST\tExample B"]
        );

        unsafe { tagbridge_free_tags(out) };
    }

    #[test]
    fn test_write_tags_merges_and_deletes() {
        let (_dir, c_path) = wav_file();

        let first = CString::new("TITLE\tOld").unwrap();
        let second = CString::new("ARTIST\tA").unwrap();
        let rows = [first.as_ptr(), second.as_ptr(), ptr::null()];
        assert!(unsafe { tagbridge_write_tags(c_path.as_ptr(), rows.as_ptr(), 0) });

        // Delete TITLE with an empty value segment; ARTIST is unmentioned
        // and must survive.
        let deletion = CString::new("TITLE\t").unwrap();
        let rows = [deletion.as_ptr(), ptr::null()];
        assert!(unsafe { tagbridge_write_tags(c_path.as_ptr(), rows.as_ptr(), 0) });

        let out = unsafe { tagbridge_read_tags(c_path.as_ptr()) };
        let read_back = unsafe { rows_to_vec(out) };
        assert_eq!(read_back, vec!["ARTIST\tA"]);
        unsafe { tagbridge_free_tags(out) };
    }

    #[test]
    fn test_write_tags_clear_flag() {
        let (_dir, c_path) = wav_file();

        let row = CString::new("TITLE\tKeep me not").unwrap();
        let rows = [row.as_ptr(), ptr::null()];
        assert!(unsafe { tagbridge_write_tags(c_path.as_ptr(), rows.as_ptr(), 0) });

        let replacement = CString::new("ARTIST\tOnly one").unwrap();
        let rows = [replacement.as_ptr(), ptr::null()];
        assert!(unsafe {
            tagbridge_write_tags(c_path.as_ptr(), rows.as_ptr(), WriteFlags::CLEAR)
        });

        let out = unsafe { tagbridge_read_tags(c_path.as_ptr()) };
        let read_back = unsafe { rows_to_vec(out) };
        assert_eq!(read_back, vec!["ARTIST\tOnly one"]);
        unsafe { tagbridge_free_tags(out) };
    }

    #[test]
    fn test_write_tags_diff_save_still_reports_success() {
        let (_dir, c_path) = wav_file();

        let row = CString::new("ARTIST\tSame").unwrap();
        let rows = [row.as_ptr(), ptr::null()];

        assert!(unsafe {
            tagbridge_write_tags(c_path.as_ptr(), rows.as_ptr(), WriteFlags::DIFF_SAVE)
        });
        // Identical delta: the save is skipped but the call still succeeds.
        assert!(unsafe {
            tagbridge_write_tags(c_path.as_ptr(), rows.as_ptr(), WriteFlags::DIFF_SAVE)
        });
    }

    // ───────────────── tagbridge_read_audio_properties ─────────────────

    #[test]
    fn test_read_audio_properties() {
        let (_dir, c_path) = wav_file();

        let props = unsafe { tagbridge_read_audio_properties(c_path.as_ptr()) };
        assert!(!props.is_null());

        let values = unsafe { std::slice::from_raw_parts(props, 4) };
        assert_eq!(values[1], 1, "channels");
        assert_eq!(values[2], 44100, "sample rate");

        unsafe { tagbridge_free_audio_properties(props) };
    }

    #[test]
    fn test_read_audio_properties_bad_path() {
        let bad = CString::new("/tmp/nonexistent_tagbridge_file_12345.wav").unwrap();
        let props = unsafe { tagbridge_read_audio_properties(bad.as_ptr()) };
        assert!(props.is_null());
    }

    // ───────────────── front cover round trip ─────────────────

    #[test]
    fn test_front_cover_round_trip() {
        let (_dir, c_path) = wav_file();

        let image: Vec<u8> = {
            let mut data = picture::PNG_SIGNATURE.to_vec();
            data.extend_from_slice(&[0x42; 32]);
            data
        };
        assert!(unsafe {
            tagbridge_write_front_cover(c_path.as_ptr(), image.as_ptr(), image.len() as u64)
        });

        let mut out_len: u64 = 0;
        let data_ptr = unsafe { tagbridge_read_front_cover(c_path.as_ptr(), &mut out_len) };
        assert!(!data_ptr.is_null());
        assert_eq!(out_len, image.len() as u64);

        let read_back = unsafe { std::slice::from_raw_parts(data_ptr, out_len as usize) };
        assert_eq!(read_back, image.as_slice());

        unsafe { tagbridge_free_buffer(data_ptr, out_len) };
    }

    #[test]
    fn test_read_front_cover_no_pictures() {
        let (_dir, c_path) = wav_file();

        let mut out_len: u64 = 7;
        let data_ptr = unsafe { tagbridge_read_front_cover(c_path.as_ptr(), &mut out_len) };
        assert!(data_ptr.is_null());
        assert_eq!(out_len, 7, "out_len must be untouched on failure");
    }

    #[test]
    fn test_read_front_cover_null_out_len() {
        let (_dir, c_path) = wav_file();
        let data_ptr = unsafe { tagbridge_read_front_cover(c_path.as_ptr(), ptr::null_mut()) };
        assert!(data_ptr.is_null());
    }

    #[test]
    fn test_write_front_cover_null_data() {
        let (_dir, c_path) = wav_file();
        assert!(!unsafe { tagbridge_write_front_cover(c_path.as_ptr(), ptr::null(), 10) });
    }

    #[test]
    fn test_clear_pictures() {
        let (_dir, c_path) = wav_file();

        let image = [0xFFu8, 0xD8, 0xFF, 0xE0, 1, 2, 3];
        assert!(unsafe {
            tagbridge_write_front_cover(c_path.as_ptr(), image.as_ptr(), image.len() as u64)
        });
        assert!(unsafe { tagbridge_clear_pictures(c_path.as_ptr()) });

        let mut out_len: u64 = 0;
        let data_ptr = unsafe { tagbridge_read_front_cover(c_path.as_ptr(), &mut out_len) };
        assert!(data_ptr.is_null());
    }

    #[test]
    fn test_clear_pictures_on_pictureless_file_succeeds() {
        let (_dir, c_path) = wav_file();
        assert!(unsafe { tagbridge_clear_pictures(c_path.as_ptr()) });
    }

    // ───────────────── memory management ─────────────────

    #[test]
    fn test_alloc_and_free_buffer() {
        let ptr = tagbridge_alloc(16);
        assert!(!ptr.is_null());

        let slice = unsafe { std::slice::from_raw_parts(ptr, 16) };
        assert!(slice.iter().all(|&b| b == 0), "buffer should be zeroed");

        unsafe { tagbridge_free_buffer(ptr, 16) };
    }

    #[test]
    fn test_alloc_zero_returns_null() {
        assert!(tagbridge_alloc(0).is_null());
    }

    #[test]
    fn test_free_functions_accept_null() {
        // Must not crash.
        unsafe { tagbridge_free_buffer(ptr::null_mut(), 0) };
        unsafe { tagbridge_free_string(ptr::null_mut()) };
        unsafe { tagbridge_free_tags(ptr::null_mut()) };
        unsafe { tagbridge_free_audio_properties(ptr::null_mut()) };
    }
}
