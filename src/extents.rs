//! Copying item payloads out of the source stream.

use crate::boxes::{BoxId, FourCC};
use crate::iinf::{IinfBox, InfeBox};
use crate::iloc::{IlocBox, IlocExtent, IlocItem};
use crate::leaf::DataBox;
use crate::tree::{BoxTree, LookupError};
use crate::util::copy_range;
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

const IINF: FourCC = FourCC(*b"iinf");
const IDAT: FourCC = FourCC(*b"idat");

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("item {item_id}: {what}")]
    Unsupported { item_id: u32, what: String },
    #[error("item {item_id}: extent [{start:#x}, +{len}) lies outside its source (ends at {source_end:#x})")]
    OutOfBounds {
        item_id: u32,
        start: u64,
        len: u64,
        source_end: u64,
    },
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Resolves items of one `iloc` box to byte ranges and copies them out.
///
/// Item types come from the `iinf` box sitting next to the `iloc`.
pub struct ItemExtractor<'a> {
    tree: &'a BoxTree,
    iloc_id: BoxId,
    iloc: &'a IlocBox,
    source_len: u64,
}

impl<'a> ItemExtractor<'a> {
    /// `source_len` is the length of the stream items are read from.
    pub fn new(
        tree: &'a BoxTree,
        iloc_id: BoxId,
        source_len: u64,
    ) -> std::result::Result<Self, LookupError> {
        let iloc = tree
            .get::<IlocBox>(iloc_id)
            .ok_or_else(|| LookupError::TypeMismatch {
                path: tree.path_of(iloc_id),
                expected: "iloc",
            })?;
        Ok(Self {
            tree,
            iloc_id,
            iloc,
            source_len,
        })
    }

    pub fn iloc(&self) -> &'a IlocBox {
        self.iloc
    }

    /// Item record for `item_id` from the sibling `iinf`.
    pub fn item_info(&self, item_id: u32) -> std::result::Result<&'a InfeBox, LookupError> {
        let (_, iinf) = self.tree.sibling::<IinfBox>(self.iloc_id, IINF)?;
        iinf.item_with_id(item_id)
    }

    /// Absolute `(start, len)` of each extent of `item_id`, in order.
    pub fn extent_ranges(&self, item_id: u32) -> Result<Vec<(u64, u64)>> {
        let item = self.iloc.get_with_id(item_id)?;
        item.extents
            .iter()
            .map(|e| self.extent_range(item, e))
            .collect()
    }

    fn extent_range(&self, item: &IlocItem, extent: &IlocExtent) -> Result<(u64, u64)> {
        let item_id = item.item_id;
        if item.data_reference_index != 0 {
            return Err(ExtractError::Unsupported {
                item_id,
                what: format!("data in external file (reference {})", item.data_reference_index),
            });
        }

        let (source_start, source_end) = match item.construction_method {
            0 => (0, self.source_len),
            1 => {
                let (_, idat) = self.tree.sibling::<DataBox>(self.iloc_id, IDAT)?;
                (idat.offset, idat.offset + idat.len)
            }
            m => {
                return Err(ExtractError::Unsupported {
                    item_id,
                    what: format!("construction method {m}"),
                });
            }
        };

        // The base offset stays opaque; extents are placed by their own offset.
        let start = source_start.checked_add(extent.offset);
        let out_of_bounds = |start: u64, len: u64| ExtractError::OutOfBounds {
            item_id,
            start,
            len,
            source_end,
        };
        let start = start.ok_or_else(|| out_of_bounds(u64::MAX, extent.length))?;
        let len = if extent.length == 0 {
            source_end.saturating_sub(start)
        } else {
            extent.length
        };
        match start.checked_add(len) {
            Some(end) if end <= source_end => Ok((start, len)),
            _ => Err(out_of_bounds(start, len)),
        }
    }

    /// Copy every extent of `item_id`, concatenated, into `out`.
    pub fn write_item<R: Read + Seek, W: Write + ?Sized>(
        &self,
        r: &mut R,
        item_id: u32,
        out: &mut W,
    ) -> Result<u64> {
        let mut total = 0;
        for (start, len) in self.extent_ranges(item_id)? {
            total += copy_range(r, start, len, out)?;
        }
        debug!("item {item_id}: wrote {total} bytes");
        Ok(total)
    }

    /// Copy extent number `index` of `item_id` into `out`.
    pub fn write_extent<R: Read + Seek, W: Write + ?Sized>(
        &self,
        r: &mut R,
        item_id: u32,
        index: usize,
        out: &mut W,
    ) -> Result<u64> {
        let item = self.iloc.get_with_id(item_id)?;
        let extent = item
            .extents
            .get(index)
            .ok_or(LookupError::ExtentNotFound { item_id, index })?;
        let (start, len) = self.extent_range(item, extent)?;
        Ok(copy_range(r, start, len, out)?)
    }

    /// File name used for an item, or one of its extents.
    pub fn file_name(
        &self,
        item_id: u32,
        extent: Option<usize>,
    ) -> std::result::Result<String, LookupError> {
        let tag: String = self
            .item_info(item_id)?
            .item_type_tag()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let ext = if tag.is_empty() { "bin".to_string() } else { tag };
        Ok(match extent {
            Some(n) => format!("item-{item_id}-extent-{n}.{ext}"),
            None => format!("item-{item_id}.{ext}"),
        })
    }

    /// Write one file per item into `dir`, each holding the item's extents
    /// concatenated.
    pub fn write<R: Read + Seek>(&self, r: &mut R, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for item in self.iloc.items() {
            let path = dir.join(self.file_name(item.item_id, None)?);
            write_file(&path, |out| self.write_item(r, item.item_id, out))?;
            written.push(path);
        }
        Ok(written)
    }

    /// Write one file per extent of `item_id` into `dir`.
    pub fn write_extents<R: Read + Seek>(
        &self,
        r: &mut R,
        item_id: u32,
        dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let item = self.iloc.get_with_id(item_id)?;
        let mut written = Vec::new();
        for index in 0..item.extents.len() {
            let path = dir.join(self.file_name(item_id, Some(index))?);
            write_file(&path, |out| self.write_extent(r, item_id, index, out))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Create `path` and fill it; a file left incomplete by an error is removed.
fn write_file<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<u64>,
{
    let mut out = BufWriter::new(File::create(path)?);
    let filled = fill(&mut out).and_then(|_| Ok(out.flush()?));
    if let Err(e) = filled {
        drop(out);
        if let Err(rm) = fs::remove_file(path) {
            warn!("could not remove partial {}: {rm}", path.display());
        }
        return Err(e);
    }
    Ok(())
}
