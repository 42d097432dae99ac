//! `clap_ostream` / `clap_istream` over Rust buffers.

use clap_sys::stream::{clap_istream, clap_ostream};
use std::ffi::c_void;
use std::slice;

/// Output stream appending to `buffer`. Valid while `buffer` is borrowed.
pub(crate) fn output_stream(buffer: &mut Vec<u8>) -> clap_ostream {
    unsafe extern "C" fn write(stream: *const clap_ostream, data: *const c_void, size: u64) -> i64 {
        if stream.is_null() || (data.is_null() && size > 0) {
            return -1;
        }
        let out = &mut *((*stream).ctx as *mut Vec<u8>);
        if size > 0 {
            out.extend_from_slice(slice::from_raw_parts(data as *const u8, size as usize));
        }
        size as i64
    }

    clap_ostream {
        ctx: buffer as *mut Vec<u8> as *mut c_void,
        write: Some(write),
    }
}

/// Read cursor behind a [`clap_istream`].
pub(crate) struct InputCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> InputCursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Input stream reading from this cursor. Valid while the cursor is
    /// mutably borrowed.
    pub(crate) fn stream(&mut self) -> clap_istream {
        clap_istream {
            ctx: self as *mut InputCursor<'a> as *mut c_void,
            read: Some(read),
        }
    }
}

unsafe extern "C" fn read(stream: *const clap_istream, buffer: *mut c_void, size: u64) -> i64 {
    if stream.is_null() || (buffer.is_null() && size > 0) {
        return -1;
    }
    let cursor = &mut *((*stream).ctx as *mut InputCursor<'_>);
    let remaining = cursor.data.len() - cursor.position;
    let count = (size as usize).min(remaining);
    if count == 0 {
        return 0;
    }

    let source = &cursor.data[cursor.position..cursor.position + count];
    slice::from_raw_parts_mut(buffer as *mut u8, count).copy_from_slice(source);
    cursor.position += count;
    count as i64
}
