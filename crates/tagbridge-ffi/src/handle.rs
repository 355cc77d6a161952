//! Handle-based call surface for callers that batch edits.
//!
//! [`tagbridge_file_open`] parses a file once and returns an opaque `u64`
//! handle; reads, in-memory writes, and the final save then address the
//! handle instead of re-probing the path on every call. Handles are
//! indices into a process-wide table, not pointers, so a stale or
//! fabricated handle fails cleanly instead of dereferencing freed memory.
//! Handle 0 is never issued and always invalid.
//!
//! Unlike the path-level [`crate::tagbridge_write_tags`], a handle write
//! only mutates the in-memory tag set; nothing reaches disk until
//! [`tagbridge_file_save`].
//!
//! # Safety
//!
//! The table is mutex-guarded, so the handle functions themselves are
//! thread-safe, but the usual FFI string and array rules from the crate
//! root still apply.

use std::collections::HashMap;
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tagbridge_core::{merge, rows, TagFile};

use crate::{collect_rows, rows_into_raw, utf8_arg};

static REGISTRY: OnceLock<Mutex<HashMap<u64, TagFile>>> = OnceLock::new();
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

fn registry() -> MutexGuard<'static, HashMap<u64, TagFile>> {
    REGISTRY
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Open the audio file at `path` and register it in the handle table.
///
/// Returns a non-zero handle on success, 0 on a null or non-UTF-8 path or
/// an unreadable file. The caller must release the handle with
/// [`tagbridge_file_close`].
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 string, or null.
#[no_mangle]
pub unsafe extern "C" fn tagbridge_file_open(path: *const c_char) -> u64 {
    let Some(path) = (unsafe { utf8_arg(path) }) else {
        return 0;
    };

    match TagFile::open(Path::new(path)) {
        Ok(file) => {
            let id = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
            registry().insert(id, file);
            tracing::debug!(path, handle = id, "opened file handle");
            id
        }
        Err(e) => {
            tracing::debug!(path, error = %e, "file_open failed");
            0
        }
    }
}

/// Whether `handle` currently addresses an open file.
#[no_mangle]
pub extern "C" fn tagbridge_file_is_valid(handle: u64) -> bool {
    registry().contains_key(&handle)
}

/// Read the handle's current in-memory tag set as a null-terminated row
/// array, in the same format as [`crate::tagbridge_read_tags`].
///
/// Unsaved edits from [`tagbridge_file_write_tags`] are visible here.
/// Returns null for an invalid handle. The caller must free the result
/// with [`crate::tagbridge_free_tags`].
#[no_mangle]
pub extern "C" fn tagbridge_file_read_tags(handle: u64) -> *mut *mut c_char {
    let table = registry();
    let Some(file) = table.get(&handle) else {
        return ptr::null_mut();
    };
    rows_into_raw(rows::encode(&file.tags()))
}

/// Merge a tag delta into the handle's in-memory tag set.
///
/// Row semantics match [`crate::tagbridge_write_tags`] without flags:
/// replace per key, delete on an empty value segment, skip rows without a
/// tab. Nothing is persisted until [`tagbridge_file_save`]. Returns
/// `false` for an invalid handle or a null row array.
///
/// # Safety
///
/// `tags` must be a valid null-terminated array of null-terminated
/// strings, or null.
#[no_mangle]
pub unsafe extern "C" fn tagbridge_file_write_tags(
    handle: u64,
    tags: *const *const c_char,
) -> bool {
    let Some(row_list) = (unsafe { collect_rows(tags) }) else {
        return false;
    };

    let mut table = registry();
    let Some(file) = table.get_mut(&handle) else {
        return false;
    };

    let merged = merge::apply(&file.tags(), row_list);
    file.set_tags(&merged).is_ok()
}

/// Read the handle's audio properties as a 4-element `i32` array, in the
/// same layout as [`crate::tagbridge_read_audio_properties`].
///
/// Returns null for an invalid handle. The caller must free the result
/// with [`crate::tagbridge_free_audio_properties`].
#[no_mangle]
pub extern "C" fn tagbridge_file_audio_properties(handle: u64) -> *mut i32 {
    let table = registry();
    let Some(file) = table.get(&handle) else {
        return ptr::null_mut();
    };
    Box::into_raw(Box::new(file.properties().to_array())).cast::<i32>()
}

/// Persist the handle's in-memory tag set back to its file.
///
/// Returns `false` for an invalid handle or a rejected write. The handle
/// stays open either way.
#[no_mangle]
pub extern "C" fn tagbridge_file_save(handle: u64) -> bool {
    let mut table = registry();
    let Some(file) = table.get_mut(&handle) else {
        return false;
    };

    match file.save() {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(handle, error = %e, "file_save failed");
            false
        }
    }
}

/// Remove `handle` from the table and drop the file.
///
/// Unsaved edits are discarded. Returns `false` if the handle was not
/// open; closing twice is safe and reports `false` the second time.
#[no_mangle]
pub extern "C" fn tagbridge_file_close(handle: u64) -> bool {
    registry().remove(&handle).is_some()
}
