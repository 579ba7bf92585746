/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::{FontTableTag, GlyphId};

/// Which layout orientation a glyph advance is measured for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LayoutOrientation {
    Horizontal,
    Vertical,
}

/// The contract a shaping engine uses to query font data, independent of how
/// the font was opened or where its bytes live.
///
/// Each call serializes on the typeface's own lock for the duration of the
/// underlying library call, so a shaping engine may call in concurrently from
/// any number of threads. No ordering is promised between concurrent calls
/// beyond mutual exclusion, and calls on distinct typefaces never contend.
pub trait ShapingFontMethods: Send + Sync {
    /// Two-phase access to a raw font table.
    ///
    /// With `buffer` absent this is a size query: the named table's length
    /// in bytes is returned without copying any data, 0 when the table is
    /// missing. With `buffer` present, up to `buffer.len()` bytes of the
    /// table are copied into it and the number of bytes copied is returned.
    /// Querying the size first lets the caller allocate an exact-size buffer
    /// for the fill call.
    fn load_table(&self, tag: FontTableTag, buffer: Option<&mut [u8]>) -> usize;

    /// Map a Unicode codepoint to its glyph identifier, 0 when the font has
    /// no glyph for the codepoint.
    fn glyph_id_for_codepoint(&self, codepoint: u32) -> GlyphId;

    /// The unscaled advance of a glyph in font units, using vertical-layout
    /// metrics for [`LayoutOrientation::Vertical`]. Advances are recomputed
    /// on every call; callers that query them hot should cache externally.
    fn advance_for_glyph(&self, orientation: LayoutOrientation, glyph_id: GlyphId) -> i32;
}
