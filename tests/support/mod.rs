/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Test fixtures: a programmatically built minimal TrueType font, a
//! bitmap-only BDF font, and instrumented asset stores for resource-count
//! assertions.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::{env, fs, io, process};

use typeface::{AssetSource, AssetStore};

/// Glyph metrics baked into [`minimal_truetype`], for assertions.
pub const UNITS_PER_EM: u16 = 1000;
pub const ASCENT: i32 = 800;
pub const DESCENT: i32 = 200;
pub const LINE_GAP: i32 = 90;
pub const ADVANCES: [i32; 3] = [500, 550, 600];
pub const UNDERLINE_POSITION: i32 = -75;
pub const UNDERLINE_THICKNESS: i32 = 50;

#[derive(Default)]
struct TableBuf {
    bytes: Vec<u8>,
}

impl TableBuf {
    fn u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    fn i16(&mut self, value: i16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    fn zeros(&mut self, count: usize) {
        self.bytes.resize(self.bytes.len() + count, 0);
    }
}

/// One square outline glyph: four on-curve points, (0,0) to (500,700).
fn simple_glyph() -> Vec<u8> {
    let mut glyph = TableBuf::default();
    glyph.i16(1); // one contour
    glyph.i16(0);
    glyph.i16(0);
    glyph.i16(500);
    glyph.i16(700);
    glyph.u16(3); // end point of the contour
    glyph.u16(0); // no instructions
    for _ in 0..4 {
        glyph.bytes.push(0x01); // on-curve, 16-bit deltas
    }
    for dx in [0i16, 500, 0, -500] {
        glyph.i16(dx);
    }
    for dy in [0i16, 0, 700, 0] {
        glyph.i16(dy);
    }
    glyph.bytes
}

fn head_table() -> Vec<u8> {
    let mut head = TableBuf::default();
    head.u32(0x00010000); // version
    head.u32(0x00010000); // fontRevision
    head.u32(0); // checkSumAdjustment, patched after assembly
    head.u32(0x5F0F3CF5); // magicNumber
    head.u16(0x0003); // flags
    head.u16(UNITS_PER_EM);
    head.zeros(16); // created + modified
    head.i16(0); // xMin
    head.i16(0); // yMin
    head.i16(500); // xMax
    head.i16(700); // yMax
    head.u16(0); // macStyle
    head.u16(8); // lowestRecPPEM
    head.i16(2); // fontDirectionHint
    head.i16(0); // short loca offsets
    head.i16(0); // glyphDataFormat
    head.bytes
}

fn hhea_table() -> Vec<u8> {
    let mut hhea = TableBuf::default();
    hhea.u32(0x00010000);
    hhea.i16(ASCENT as i16);
    hhea.i16(-DESCENT as i16);
    hhea.i16(LINE_GAP as i16);
    hhea.u16(600); // advanceWidthMax
    hhea.i16(0); // minLeftSideBearing
    hhea.i16(0); // minRightSideBearing
    hhea.i16(500); // xMaxExtent
    hhea.i16(1); // caretSlopeRise
    hhea.i16(0); // caretSlopeRun
    hhea.i16(0); // caretOffset
    hhea.zeros(8); // reserved
    hhea.i16(0); // metricDataFormat
    hhea.u16(3); // numberOfHMetrics
    hhea.bytes
}

fn maxp_table() -> Vec<u8> {
    let mut maxp = TableBuf::default();
    maxp.u32(0x00010000);
    maxp.u16(3); // numGlyphs
    maxp.u16(4); // maxPoints
    maxp.u16(1); // maxContours
    maxp.u16(0); // maxCompositePoints
    maxp.u16(0); // maxCompositeContours
    maxp.u16(2); // maxZones
    maxp.u16(0); // maxTwilightPoints
    maxp.zeros(14); // maxStorage through maxComponentDepth
    maxp.bytes
}

fn hmtx_table() -> Vec<u8> {
    let mut hmtx = TableBuf::default();
    for advance in ADVANCES {
        hmtx.u16(advance as u16);
        hmtx.i16(0);
    }
    hmtx.bytes
}

/// Format 4 cmap mapping 'A' to glyph 1 and 'B' to glyph 2.
fn cmap_table() -> Vec<u8> {
    let mut cmap = TableBuf::default();
    cmap.u16(0); // version
    cmap.u16(1); // one encoding record
    cmap.u16(3); // platform: Microsoft
    cmap.u16(1); // encoding: Unicode BMP
    cmap.u32(12); // subtable offset
    cmap.u16(4); // format
    cmap.u16(32); // length
    cmap.u16(0); // language
    cmap.u16(4); // segCountX2
    cmap.u16(4); // searchRange
    cmap.u16(1); // entrySelector
    cmap.u16(0); // rangeShift
    cmap.u16(0x0042); // endCode
    cmap.u16(0xFFFF);
    cmap.u16(0); // reservedPad
    cmap.u16(0x0041); // startCode
    cmap.u16(0xFFFF);
    cmap.i16(-64); // idDelta: 0x41 maps to glyph 1
    cmap.i16(1);
    cmap.u16(0); // idRangeOffset
    cmap.u16(0);
    cmap.bytes
}

fn loca_table(glyph_len: usize) -> Vec<u8> {
    let mut loca = TableBuf::default();
    loca.u16(0); // glyph 0 is empty
    loca.u16(0);
    loca.u16((glyph_len / 2) as u16);
    loca.u16(glyph_len as u16);
    loca.bytes
}

fn name_table() -> Vec<u8> {
    let family: Vec<u8> = "Test Sans"
        .encode_utf16()
        .flat_map(|unit| unit.to_be_bytes())
        .collect();
    let style: Vec<u8> = "Regular"
        .encode_utf16()
        .flat_map(|unit| unit.to_be_bytes())
        .collect();

    let mut name = TableBuf::default();
    name.u16(0); // format
    name.u16(2); // count
    name.u16(6 + 2 * 12); // stringOffset
    for (name_id, string, offset) in [(1, &family, 0), (2, &style, family.len())] {
        name.u16(3); // platform: Microsoft
        name.u16(1); // encoding: Unicode BMP
        name.u16(0x0409); // language: en-US
        name.u16(name_id);
        name.u16(string.len() as u16);
        name.u16(offset as u16);
    }
    name.bytes.extend_from_slice(&family);
    name.bytes.extend_from_slice(&style);
    name.bytes
}

fn post_table() -> Vec<u8> {
    let mut post = TableBuf::default();
    post.u32(0x00030000); // version: no glyph names
    post.u32(0); // italicAngle
    post.i16(UNDERLINE_POSITION as i16);
    post.i16(UNDERLINE_THICKNESS as i16);
    post.u32(0); // isFixedPitch
    post.zeros(16); // memory hints
    post.bytes
}

fn table_checksum(data: &[u8]) -> u32 {
    let mut sum = 0u32;
    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum = sum.wrapping_add(u32::from_be_bytes(word));
    }
    sum
}

/// A complete, minimal TrueType font: three glyphs (.notdef, 'A', 'B'), a
/// format 4 cmap, and the metric values in the constants above.
pub fn minimal_truetype() -> Vec<u8> {
    let glyph = simple_glyph();
    let mut glyf = glyph.clone();
    glyf.extend_from_slice(&glyph);

    let tables: [(&[u8; 4], Vec<u8>); 9] = [
        (b"cmap", cmap_table()),
        (b"glyf", glyf),
        (b"head", head_table()),
        (b"hhea", hhea_table()),
        (b"hmtx", hmtx_table()),
        (b"loca", loca_table(glyph.len())),
        (b"maxp", maxp_table()),
        (b"name", name_table()),
        (b"post", post_table()),
    ];

    let num_tables = tables.len() as u16;
    let mut power = 1u16;
    let mut entry_selector = 0u16;
    while power * 2 <= num_tables {
        power *= 2;
        entry_selector += 1;
    }
    let search_range = power * 16;

    let mut font = TableBuf::default();
    font.u32(0x00010000); // sfnt version
    font.u16(num_tables);
    font.u16(search_range);
    font.u16(entry_selector);
    font.u16(num_tables * 16 - search_range);

    let mut offset = 12 + 16 * tables.len();
    let mut head_offset = 0;
    for (tag, data) in &tables {
        if *tag == b"head" {
            head_offset = offset;
        }
        font.bytes.extend_from_slice(&tag[..]);
        font.u32(table_checksum(data));
        font.u32(offset as u32);
        font.u32(data.len() as u32);
        offset += (data.len() + 3) & !3;
    }
    for (_, data) in &tables {
        font.bytes.extend_from_slice(data);
        while font.bytes.len() % 4 != 0 {
            font.bytes.push(0);
        }
    }

    let adjustment = 0xB1B0AFBAu32.wrapping_sub(table_checksum(&font.bytes));
    font.bytes[head_offset + 8..head_offset + 12].copy_from_slice(&adjustment.to_be_bytes());

    font.bytes
}

/// A bitmap-only BDF font; FreeType opens it, but it has no scalable
/// outlines.
pub fn bitmap_only_bdf() -> Vec<u8> {
    b"STARTFONT 2.1\n\
FONT -misc-fixed-medium-r-normal--8-80-75-75-c-80-iso10646-1\n\
SIZE 8 75 75\n\
FONTBOUNDINGBOX 8 8 0 -2\n\
STARTPROPERTIES 2\n\
FONT_ASCENT 6\n\
FONT_DESCENT 2\n\
ENDPROPERTIES\n\
CHARS 1\n\
STARTCHAR A\n\
ENCODING 65\n\
SWIDTH 1000 0\n\
DWIDTH 8 0\n\
BBX 8 8 0 -2\n\
BITMAP\n\
18\n\
24\n\
42\n\
42\n\
7E\n\
42\n\
42\n\
00\n\
ENDCHAR\n\
ENDFONT\n"
        .to_vec()
}

/// A font file written to the system temp directory, removed on drop.
pub struct TempFont {
    pub path: PathBuf,
}

impl TempFont {
    pub fn new(stem: &str, bytes: &[u8]) -> TempFont {
        let path = env::temp_dir().join(format!("typeface-test-{}-{stem}", process::id()));
        fs::write(&path, bytes).unwrap();
        TempFont { path }
    }

    pub fn path_str(&self) -> &str {
        self.path.to_str().unwrap()
    }
}

impl Drop for TempFont {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// An in-memory asset store serving one named asset, counting opens and
/// closes so tests can assert that every opened asset is closed exactly
/// once.
pub struct CountingAssets {
    name: &'static str,
    data: Vec<u8>,
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl CountingAssets {
    pub fn new(name: &'static str, data: Vec<u8>) -> CountingAssets {
        CountingAssets {
            name,
            data,
            opens: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn opened(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl AssetStore for CountingAssets {
    fn open(&self, path: &str) -> Option<Box<dyn AssetSource>> {
        if path != self.name {
            return None;
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(CountingAsset {
            data: Cursor::new(self.data.clone()),
            closes: self.closes.clone(),
        }))
    }
}

struct CountingAsset {
    data: Cursor<Vec<u8>>,
    closes: Arc<AtomicUsize>,
}

impl AssetSource for CountingAsset {
    fn length(&self) -> u64 {
        self.data.get_ref().len() as u64
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.data.set_position(offset);
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.data, buffer)
    }
}

impl Drop for CountingAsset {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A reader that always fails, for exercising the stream drain error path.
pub struct FailingReader;

impl io::Read for FailingReader {
    fn read(&mut self, _buffer: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("stream went away"))
    }
}
