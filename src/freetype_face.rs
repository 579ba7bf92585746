/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::ffi::c_long;
use std::ptr;

use freetype_sys::{
    FT_Done_Face, FT_FACE_FLAG_SCALABLE, FT_Face, FT_FaceRec, FT_Open_Args, FT_Open_Face,
    FTErrorMethods,
};

use crate::library_handle::FreeTypeLibraryHandle;

/// A safe wrapper around [FT_Face].
pub(crate) struct FreeTypeFace {
    /// ## Safety Invariant
    /// The pointer must have been returned from [FT_Open_Face] and must not
    /// be freed before `FreeTypeFace::drop` is called.
    face: ptr::NonNull<FT_FaceRec>,
}

impl FreeTypeFace {
    /// Open a face from the given arguments, holding the library mutex for
    /// the open call and the scalability check. Faces without scalable
    /// outlines are closed and rejected before the mutex is released.
    pub(crate) fn open(args: &FT_Open_Args) -> Result<Self, &'static str> {
        let library = FreeTypeLibraryHandle::get().lock();

        let mut face: FT_Face = ptr::null_mut();
        let result = unsafe { FT_Open_Face(library.freetype_library, args, 0, &mut face) };
        if !result.succeeded() {
            return Err("Could not open FreeType face");
        }
        let Some(face) = ptr::NonNull::new(face) else {
            return Err("Could not open FreeType face");
        };

        // Dropping on the rejection path below runs FT_Done_Face while the
        // (reentrant) library mutex is still held by this thread.
        let face = Self { face };
        if !face.scalable() {
            return Err("Face is not a scalable outline font");
        }

        Ok(face)
    }

    pub(crate) fn as_ref(&self) -> &FT_FaceRec {
        unsafe { self.face.as_ref() }
    }

    pub(crate) fn as_ptr(&self) -> FT_Face {
        self.face.as_ptr()
    }

    /// Return true iff the font face flags contain [FT_FACE_FLAG_SCALABLE].
    pub(crate) fn scalable(&self) -> bool {
        self.as_ref().face_flags & FT_FACE_FLAG_SCALABLE as c_long != 0
    }
}

/// FT_Face can be used in multiple threads, but from only one thread at a
/// time. See <https://freetype.org/freetype2/docs/reference/ft2-face_creation.html#ft_face>.
unsafe impl Send for FreeTypeFace {}

impl Drop for FreeTypeFace {
    fn drop(&mut self) {
        // The FreeType documentation says that both `FT_Open_Face` and
        // `FT_Done_Face` should be protected by a mutex.
        // See https://freetype.org/freetype2/docs/reference/ft2-library_setup.html.
        let _guard = FreeTypeLibraryHandle::get().lock();
        if unsafe { FT_Done_Face(self.face.as_ptr()) } != 0 {
            panic!("FT_Done_Face failed");
        }
    }
}
