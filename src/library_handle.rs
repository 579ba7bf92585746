/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::ptr;
use std::sync::OnceLock;

use freetype_sys::{FT_Init_FreeType, FT_Library};
use parking_lot::ReentrantMutex;

/// The process-wide FreeType library instance.
///
/// FreeType requires face creation and destruction on one library handle to
/// be externally synchronized, even for unrelated faces, so the raw handle is
/// only reachable through the mutex returned by
/// [`FreeTypeLibraryHandle::get`].
/// See <https://freetype.org/freetype2/docs/reference/ft2-library_setup.html>.
pub(crate) struct FreeTypeLibraryHandle {
    pub freetype_library: FT_Library,
}

// The handle is only ever dereferenced while the enclosing mutex is held.
unsafe impl Send for FreeTypeLibraryHandle {}

static FREETYPE_LIBRARY_HANDLE: OnceLock<ReentrantMutex<FreeTypeLibraryHandle>> = OnceLock::new();

impl FreeTypeLibraryHandle {
    /// Return the shared library handle, initializing it on first use. The
    /// handle lives until process exit; FreeType is never torn down while
    /// faces may still be open.
    pub(crate) fn get() -> &'static ReentrantMutex<FreeTypeLibraryHandle> {
        FREETYPE_LIBRARY_HANDLE.get_or_init(|| {
            let mut freetype_library: FT_Library = ptr::null_mut();
            let result = unsafe { FT_Init_FreeType(&mut freetype_library) };
            assert!(
                result == 0 && !freetype_library.is_null(),
                "Unable to initialize FreeType library"
            );
            ReentrantMutex::new(FreeTypeLibraryHandle { freetype_library })
        })
    }
}
