/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Lifecycle and thread-safe access for loaded font faces.
//!
//! A [`Typeface`] wraps one FreeType face opened from an application-bundled
//! asset, a filesystem path, or an arbitrary byte stream, and implements the
//! [`ShapingFontMethods`] contract that a shaping engine queries font data
//! through without knowing how the font was opened or where its bytes live.
//!
//! FreeType's library handle is not safe for concurrent face creation, even
//! across unrelated faces, so all face open and close calls serialize on one
//! process-wide lock. Every other operation serializes on the typeface's own
//! lock, which lets shaping work on distinct fonts proceed in parallel.

#![deny(unsafe_op_in_unsafe_fn)]

mod assets;
mod freetype_face;
mod library_handle;
mod shaping;
mod stream;
mod typeface;

pub use crate::assets::{AssetSource, AssetStore, DirectoryAssets};
pub use crate::shaping::{LayoutOrientation, ShapingFontMethods};
pub use crate::typeface::{LockedFace, Typeface, TypefaceRef};

/// A four-byte OpenType table tag, most significant byte first.
pub type FontTableTag = u32;

/// A glyph identifier. Shaping output represents glyphs in 16 bits; indices
/// reported by the underlying library that do not fit are treated as "no
/// glyph" rather than truncated.
pub type GlyphId = u16;

/// Build a [`FontTableTag`] from four characters, e.g.
/// `ot_tag!('h', 'e', 'a', 'd')`.
#[macro_export]
macro_rules! ot_tag {
    ($t1:expr, $t2:expr, $t3:expr, $t4:expr) => {
        (($t1 as u32) << 24) | (($t2 as u32) << 16) | (($t3 as u32) << 8) | ($t4 as u32)
    };
}
