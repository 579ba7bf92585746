/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fs::File;
use std::io;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// One opened, application-bundled asset: a byte source with seek and read
/// semantics. The underlying platform resource is released on drop.
pub trait AssetSource: Send {
    /// Total length of the asset in bytes.
    fn length(&self) -> u64;

    /// Position the read cursor `offset` bytes from the start.
    fn seek(&mut self, offset: u64) -> io::Result<()>;

    /// Read up to `buffer.len()` bytes at the current cursor, returning the
    /// number of bytes read.
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
}

/// The host platform's asset catalog, opening named assets bundled with the
/// application.
pub trait AssetStore {
    /// Open the named asset, or `None` if it does not exist.
    fn open(&self, path: &str) -> Option<Box<dyn AssetSource>>;
}

/// An [`AssetStore`] serving assets from a directory on disk.
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }
}

impl AssetStore for DirectoryAssets {
    fn open(&self, path: &str) -> Option<Box<dyn AssetSource>> {
        let file = File::open(self.root.join(path)).ok()?;
        let length = file.metadata().ok()?.len();
        Some(Box::new(FileAsset { file, length }))
    }
}

struct FileAsset {
    file: File,
    length: u64,
}

impl AssetSource for FileAsset {
    fn length(&self) -> u64 {
        self.length
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.file.read(buffer)
    }
}
