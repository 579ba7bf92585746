/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::ffi::{c_uchar, c_ulong};
use std::fmt;
use std::{mem, ptr, slice};

use freetype_sys::{FT_Stream, FT_StreamRec};
use log::debug;

use crate::assets::AssetSource;

/// The byte source backing an open face. Exactly one variant is associated
/// with a typeface, and destruction releases precisely that variant's
/// resources.
pub(crate) enum FontSource {
    /// A heap buffer the typeface exclusively owns. FreeType reads it in
    /// place, so the buffer must outlive the face.
    OwnedBuffer(Vec<u8>),
    /// A platform asset wrapped in a custom FreeType stream. FreeType calls
    /// the close callback; the record itself is freed when this variant
    /// drops.
    AssetStream(Box<AssetStreamRec>),
    /// FreeType opened the path itself and owns all storage internally.
    LibraryOwned,
}

impl fmt::Debug for FontSource {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::OwnedBuffer(buffer) => write!(formatter, "OwnedBuffer[{} bytes]", buffer.len()),
            Self::AssetStream(stream) => write!(formatter, "AssetStream[{} bytes]", stream.rec.size),
            Self::LibraryOwned => write!(formatter, "LibraryOwned"),
        }
    }
}

/// A custom FreeType stream backed by a platform asset.
///
/// The embedded `FT_StreamRec` must stay the first field: the read and close
/// callbacks recover this wrapper by casting the `FT_Stream` pointer FreeType
/// hands back.
#[repr(C)]
pub(crate) struct AssetStreamRec {
    rec: FT_StreamRec,
    asset: Option<Box<dyn AssetSource>>,
}

impl AssetStreamRec {
    /// Wrap an opened asset, or `None` for a zero-length asset (FreeType
    /// treats a zero stream size as a request to probe the stream itself).
    /// Dropping the rejected asset closes it.
    pub(crate) fn new(asset: Box<dyn AssetSource>) -> Option<Box<AssetStreamRec>> {
        let size = asset.length();
        if size == 0 {
            debug!("Font asset reports zero length");
            return None;
        }

        // This freetype-sys binding types `read`/`close` as non-nullable fn
        // pointers, so the record cannot be zero-initialized whole; set those
        // two fields before the value is materialized and leave the rest
        // zeroed (every other field is a nullable pointer or integer).
        let rec: FT_StreamRec = unsafe {
            let mut rec = mem::MaybeUninit::<FT_StreamRec>::zeroed();
            let ptr = rec.as_mut_ptr();
            (*ptr).read = asset_stream_read;
            (*ptr).close = asset_stream_close;
            rec.assume_init()
        };
        let mut wrapper = Box::new(AssetStreamRec {
            rec,
            asset: Some(asset),
        });
        wrapper.rec.size = size as c_ulong;
        wrapper.rec.pos = 0;

        Some(wrapper)
    }

    /// The raw stream pointer handed to `FT_Open_Args`. The box must not
    /// move while FreeType holds this pointer; the heap allocation keeps the
    /// record's address stable.
    pub(crate) fn as_ft_stream(&mut self) -> FT_Stream {
        &mut self.rec
    }
}

/// FreeType stream read callback. A zero `count` is a seek-only request:
/// report failure (non-zero) when the offset lies past the end of the asset.
/// The asset is repositioned only when the stream cursor and the requested
/// offset disagree.
extern "C" fn asset_stream_read(
    stream: FT_Stream,
    offset: c_ulong,
    buffer: *mut c_uchar,
    count: c_ulong,
) -> c_ulong {
    let wrapper = unsafe { &mut *stream.cast::<AssetStreamRec>() };
    let Some(asset) = wrapper.asset.as_mut() else {
        // Read after close; nothing can be served.
        return if count == 0 { 1 } else { 0 };
    };

    if count == 0 && offset > wrapper.rec.size {
        return 1;
    }

    if wrapper.rec.pos != offset && asset.seek(offset as u64).is_err() {
        return if count == 0 { 1 } else { 0 };
    }

    if count == 0 {
        return 0;
    }

    let buffer = unsafe { slice::from_raw_parts_mut(buffer, count as usize) };
    match asset.read(buffer) {
        Ok(bytes_read) => bytes_read as c_ulong,
        Err(error) => {
            debug!("Could not read font asset: {error}");
            0
        },
    }
}

/// FreeType stream close callback: releases the platform asset and
/// defensively zeroes the record's size and base. FreeType invokes this both
/// on face destruction and on a failed open, so repeated invocations must be
/// inert.
extern "C" fn asset_stream_close(stream: FT_Stream) {
    let wrapper = unsafe { &mut *stream.cast::<AssetStreamRec>() };
    drop(wrapper.asset.take());
    wrapper.rec.size = 0;
    wrapper.rec.base = ptr::null_mut();
}
