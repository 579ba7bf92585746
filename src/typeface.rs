/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::{mem, ptr};

use euclid::default::{Box2D, Point2D};
use freetype_sys::{
    FT_Error, FT_Face, FT_Fixed, FT_Get_Char_Index, FT_Get_Kerning, FT_Int32, FT_KERNING_UNSCALED,
    FT_LOAD_NO_SCALE, FT_LOAD_VERTICAL_LAYOUT, FT_Load_Sfnt_Table, FT_Long, FT_OPEN_MEMORY,
    FT_OPEN_PATHNAME, FT_OPEN_STREAM, FT_Open_Args, FT_String, FT_Stroker, FT_Stroker_Done,
    FT_Stroker_New, FT_UInt, FT_ULong, FT_Vector, FTErrorMethods,
};

// `FT_Get_Advance` (FreeType's ftadvanc.h) is not surfaced by the
// freetype-sys binding in use, so declare it directly. The symbol lives in
// the libfreetype that freetype-sys already links against.
unsafe extern "C" {
    fn FT_Get_Advance(
        face: FT_Face,
        gindex: FT_UInt,
        load_flags: FT_Int32,
        padvance: *mut FT_Fixed,
    ) -> FT_Error;
}
use log::{debug, warn};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::assets::AssetStore;
use crate::freetype_face::FreeTypeFace;
use crate::library_handle::FreeTypeLibraryHandle;
use crate::shaping::{LayoutOrientation, ShapingFontMethods};
use crate::stream::{AssetStreamRec, FontSource};
use crate::{FontTableTag, GlyphId};

/// The shaping-engine-facing handle to a typeface. Clones share the opened
/// face; the last clone dropped releases the underlying library resources.
pub type TypefaceRef = Arc<Typeface>;

/// One opened, scalable font face together with the byte source backing it.
///
/// Metric accessors read face fields that are fixed at open time and take no
/// lock. Everything that drives the underlying library through the face
/// handle goes through [`Typeface::lock`].
pub struct Typeface {
    face: FreeTypeFace,
    /// Serializes every post-open operation on this face. Distinct
    /// typefaces never contend on it.
    state: ReentrantMutex<FaceState>,
    source: FontSource,
}

struct FaceState {
    /// Outline-stroking helper, created on first request and cached for the
    /// rest of the typeface's lifetime.
    stroker: Cell<FT_Stroker>,
}

impl Typeface {
    /// Open a named, application-bundled asset. `None` when the asset does
    /// not exist, is empty, or does not hold a scalable outline font.
    pub fn from_asset(assets: &dyn AssetStore, path: &str) -> Option<TypefaceRef> {
        let Some(asset) = assets.open(path) else {
            debug!("No font asset at {path:?}");
            return None;
        };
        let mut stream = AssetStreamRec::new(asset)?;

        let mut args: FT_Open_Args = unsafe { mem::zeroed() };
        args.flags = FT_OPEN_STREAM;
        args.stream = stream.as_ft_stream();

        match Self::create_with_args(&args, FontSource::AssetStream(stream)) {
            Ok(typeface) => Some(typeface),
            Err(reason) => {
                warn!("Could not create typeface from asset {path:?}: {reason}");
                None
            },
        }
    }

    /// Open from a filesystem path. The underlying library manages all I/O
    /// and memory for this variant.
    pub fn from_file(path: &str) -> Option<TypefaceRef> {
        let Ok(pathname) = CString::new(path) else {
            warn!("Font path contains a NUL byte: {path:?}");
            return None;
        };

        let mut args: FT_Open_Args = unsafe { mem::zeroed() };
        args.flags = FT_OPEN_PATHNAME;
        args.pathname = pathname.as_ptr() as *mut FT_String;

        match Self::create_with_args(&args, FontSource::LibraryOwned) {
            Ok(typeface) => Some(typeface),
            Err(reason) => {
                debug!("Could not create typeface from file {path:?}: {reason}");
                None
            },
        }
    }

    /// Open from an opaque byte stream. The stream is fully drained into an
    /// owned buffer up front, since its lifetime is not guaranteed to
    /// outlive this call.
    pub fn from_stream(stream: &mut dyn Read) -> Option<TypefaceRef> {
        let mut buffer = Vec::new();
        if let Err(error) = stream.read_to_end(&mut buffer) {
            warn!("Could not drain font stream: {error}");
            return None;
        }
        if buffer.is_empty() {
            debug!("Font stream yielded no bytes");
            return None;
        }

        let mut args: FT_Open_Args = unsafe { mem::zeroed() };
        args.flags = FT_OPEN_MEMORY;
        args.memory_base = buffer.as_ptr();
        args.memory_size = buffer.len() as FT_Long;

        match Self::create_with_args(&args, FontSource::OwnedBuffer(buffer)) {
            Ok(typeface) => Some(typeface),
            Err(reason) => {
                warn!("Could not create typeface from stream: {reason}");
                None
            },
        }
    }

    /// The common open path every byte-source variant converges on. On
    /// failure the face handle never escapes and `source` is dropped, which
    /// releases whatever the variant owns.
    fn create_with_args(
        args: &FT_Open_Args,
        source: FontSource,
    ) -> Result<TypefaceRef, &'static str> {
        let face = FreeTypeFace::open(args)?;
        Ok(Arc::new(Typeface {
            face,
            state: ReentrantMutex::new(FaceState {
                stroker: Cell::new(ptr::null_mut()),
            }),
            source,
        }))
    }

    /// Acquire this typeface's lock. The returned guard is the proof of
    /// lock required by the operations that serialize on one face.
    pub fn lock(&self) -> LockedFace<'_> {
        LockedFace {
            typeface: self,
            state: self.state.lock(),
        }
    }

    /// Copy out a named font table using the two-phase size-then-fill
    /// protocol. `None` when the table is not present or has zero length.
    pub fn copy_table(&self, tag: FontTableTag) -> Option<Vec<u8>> {
        let locked = self.lock();
        let length = locked.load_table(tag, None);
        if length == 0 {
            return None;
        }
        let mut buffer = vec![0; length];
        locked.load_table(tag, Some(&mut buffer));
        Some(buffer)
    }

    /// Design units per em.
    pub fn units_per_em(&self) -> u16 {
        self.face.as_ref().units_per_EM
    }

    /// Typographic ascender in font units.
    pub fn ascent(&self) -> i32 {
        i32::from(self.face.as_ref().ascender)
    }

    /// Typographic descender in font units, reported as a positive distance
    /// below the baseline.
    pub fn descent(&self) -> i32 {
        -i32::from(self.face.as_ref().descender)
    }

    /// Line gap in font units: the face height beyond ascender plus
    /// descender.
    pub fn leading(&self) -> i32 {
        let face = self.face.as_ref();
        i32::from(face.height) - (i32::from(face.ascender) - i32::from(face.descender))
    }

    /// Number of glyphs in the face.
    pub fn glyph_count(&self) -> u32 {
        self.face.as_ref().num_glyphs as u32
    }

    /// The union of all glyph bounding boxes, in font units.
    pub fn bounding_box(&self) -> Box2D<i32> {
        let bbox = self.face.as_ref().bbox;
        Box2D::new(
            Point2D::new(bbox.xMin as i32, bbox.yMin as i32),
            Point2D::new(bbox.xMax as i32, bbox.yMax as i32),
        )
    }

    /// Center of the underline stroke relative to the baseline, in font
    /// units.
    pub fn underline_position(&self) -> i32 {
        i32::from(self.face.as_ref().underline_position)
    }

    /// Thickness of the underline stroke in font units.
    pub fn underline_thickness(&self) -> i32 {
        i32::from(self.face.as_ref().underline_thickness)
    }

    /// The face's family name, if the font carries one.
    pub fn family_name(&self) -> Option<String> {
        unsafe { c_string_field(self.face.as_ref().family_name) }
    }

    /// The face's style name, if the font carries one.
    pub fn style_name(&self) -> Option<String> {
        unsafe { c_string_field(self.face.as_ref().style_name) }
    }
}

/// FT_Face can be used in multiple threads, but from only one thread at a
/// time. Post-open operations serialize on the per-typeface lock, and the
/// fields read without it are fixed at open time.
/// See <https://freetype.org/freetype2/docs/reference/ft2-face_creation.html#ft_face>.
unsafe impl Sync for Typeface {}
unsafe impl Send for Typeface {}

impl Drop for Typeface {
    fn drop(&mut self) {
        // Running means the last handle is gone: no shaping-engine reference
        // or in-flight call remains. The stroker goes first; the face
        // (closed under the library mutex, which fires the asset stream's
        // close callback) and the byte source storage follow in field order.
        let stroker = self.state.lock().stroker.get();
        if !stroker.is_null() {
            unsafe { FT_Stroker_Done(stroker) };
        }
    }
}

impl fmt::Debug for Typeface {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Typeface")
            .field("family", &self.family_name())
            .field("glyphs", &self.glyph_count())
            .field("source", &self.source)
            .finish()
    }
}

/// Proof that one typeface's lock is held, carrying the operations that
/// must serialize on the face handle.
pub struct LockedFace<'a> {
    typeface: &'a Typeface,
    state: ReentrantMutexGuard<'a, FaceState>,
}

impl LockedFace<'_> {
    /// Size query (`buffer` absent) or fill (`buffer` present) for a raw
    /// font table; see [`ShapingFontMethods::load_table`] for the protocol.
    pub fn load_table(&self, tag: FontTableTag, buffer: Option<&mut [u8]>) -> usize {
        let face = self.typeface.face.as_ptr();
        match buffer {
            None => {
                let mut length: FT_ULong = 0;
                let result = unsafe {
                    FT_Load_Sfnt_Table(face, tag as FT_ULong, 0, ptr::null_mut(), &mut length)
                };
                if !result.succeeded() {
                    return 0;
                }
                length as usize
            },
            Some(buffer) => {
                let mut length = buffer.len() as FT_ULong;
                let result = unsafe {
                    FT_Load_Sfnt_Table(face, tag as FT_ULong, 0, buffer.as_mut_ptr(), &mut length)
                };
                if !result.succeeded() {
                    return 0;
                }
                length as usize
            },
        }
    }

    /// Raw glyph index for a codepoint, unvalidated: corrupt fonts may
    /// report indices that do not fit a [`GlyphId`].
    pub(crate) fn glyph_index(&self, codepoint: u32) -> u32 {
        unsafe { FT_Get_Char_Index(self.typeface.face.as_ptr(), codepoint as FT_ULong) as u32 }
    }

    /// Unscaled advance in font units, vertical-layout metrics for vertical
    /// orientation. Glyphs the face cannot load report 0.
    pub fn advance(&self, orientation: LayoutOrientation, glyph_id: GlyphId) -> i32 {
        let mut load_flags = FT_LOAD_NO_SCALE;
        if orientation == LayoutOrientation::Vertical {
            load_flags |= FT_LOAD_VERTICAL_LAYOUT;
        }

        let mut advance: FT_Fixed = 0;
        let result = unsafe {
            FT_Get_Advance(
                self.typeface.face.as_ptr(),
                glyph_id as FT_UInt,
                load_flags as FT_Int32,
                &mut advance,
            )
        };
        if !result.succeeded() {
            debug!("Unable to get advance of glyph {glyph_id}. reason: {result:?}");
            return 0;
        }

        advance as i32
    }

    /// Unscaled horizontal kerning between two glyphs, in font units. Fonts
    /// without kerning data report zero.
    pub fn glyph_h_kerning(&self, first_glyph: GlyphId, second_glyph: GlyphId) -> i32 {
        let mut delta = FT_Vector { x: 0, y: 0 };
        unsafe {
            FT_Get_Kerning(
                self.typeface.face.as_ptr(),
                first_glyph as FT_UInt,
                second_glyph as FT_UInt,
                FT_KERNING_UNSCALED as FT_UInt,
                &mut delta,
            );
        }
        delta.x as i32
    }

    /// The outline-stroking helper for this face, created on first request.
    /// The handle stays owned by the typeface and is released when the
    /// typeface is. Stroker allocation only touches the library's memory
    /// routines, but the raw library handle is only reachable under its
    /// mutex, so the (uncontended, reentrant) lock is taken for the call.
    pub fn stroker(&self) -> Result<FT_Stroker, &'static str> {
        let cached = self.state.stroker.get();
        if !cached.is_null() {
            return Ok(cached);
        }

        let library = FreeTypeLibraryHandle::get().lock();
        let mut stroker: FT_Stroker = ptr::null_mut();
        let result = unsafe { FT_Stroker_New(library.freetype_library, &mut stroker) };
        if !result.succeeded() || stroker.is_null() {
            return Err("Could not create stroker");
        }

        self.state.stroker.set(stroker);
        Ok(stroker)
    }
}

impl ShapingFontMethods for Typeface {
    fn load_table(&self, tag: FontTableTag, buffer: Option<&mut [u8]>) -> usize {
        self.lock().load_table(tag, buffer)
    }

    fn glyph_id_for_codepoint(&self, codepoint: u32) -> GlyphId {
        let glyph_id = self.lock().glyph_index(codepoint);
        if glyph_id > u32::from(GlyphId::MAX) {
            warn!("Received invalid glyph id {glyph_id} for code point {codepoint}");
            return 0;
        }

        glyph_id as GlyphId
    }

    fn advance_for_glyph(&self, orientation: LayoutOrientation, glyph_id: GlyphId) -> i32 {
        self.lock().advance(orientation, glyph_id)
    }
}

/// Copy a NUL-terminated face string field. The pointers FreeType exposes
/// here stay valid for the face's lifetime.
unsafe fn c_string_field(field: *mut FT_String) -> Option<String> {
    if field.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(field) };
    Some(name.to_string_lossy().into_owned())
}
