use crate::boxes::{BoxHeader, BoxId, BoxNode, FourCC};
use crate::index::LoadedBoxIndex;
use crate::registry::{BuildContext, Built, Registry};
use crate::tree::{BoxTree, LookupError};
use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};

/// Smallest possible header: 32-bit size plus 4CC.
pub const MIN_HEADER_SIZE: u64 = 8;

/// Deepest nesting level accepted; top-level boxes are at depth 0.
pub const MAX_DEPTH: usize = 64;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed box at {offset:#x}: invalid type bytes {tag:02x?}")]
    InvalidTag { offset: u64, tag: [u8; 4] },
    #[error("malformed box at {offset:#x}: size {size} is smaller than its {header_size}-byte header")]
    InvalidSize {
        offset: u64,
        size: u64,
        header_size: u64,
    },
    #[error("malformed box at {offset:#x}: size 0 (extends to end of container) is not supported")]
    ZeroSize { offset: u64 },
    #[error("malformed box at {offset:#x}: size {size} is too large")]
    SizeTooLarge { offset: u64, size: u64 },
    #[error("malformed box at {offset:#x}: ends at {end:#x}, past the end of its container at {limit:#x}")]
    Overrun { offset: u64, end: u64, limit: u64 },
    #[error("malformed box at {offset:#x}: nested {depth} levels deep, limit is {}", MAX_DEPTH)]
    TooDeep { offset: u64, depth: usize },
    #[error("malformed {typ} box at {offset:#x}: children start {children_at} bytes into a {payload_len}-byte payload")]
    BadChildOffset {
        typ: FourCC,
        offset: u64,
        children_at: u64,
        payload_len: u64,
    },
    #[error("unsupported {typ} version {version}")]
    UnsupportedVersion { typ: FourCC, version: u8 },
    #[error("unsupported {typ}: {what}")]
    Unsupported { typ: FourCC, what: String },
    #[error("invalid {typ}: {what}")]
    InvalidField { typ: FourCC, what: String },
    #[error("duplicate item {what} in {typ}")]
    DuplicateItem { typ: FourCC, what: String },
    #[error("building {path}: {source}")]
    Lookup {
        path: String,
        #[source]
        source: LookupError,
    },
    #[error("truncated bit field: {0}")]
    Bits(#[from] bitreader::BitReaderError),
}

impl ParseError {
    /// True for errors caused by corrupt or unsupported box content, as
    /// opposed to I/O failures, missing relatives or duplicate items.
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            ParseError::Io(_) | ParseError::Lookup { .. } | ParseError::DuplicateItem { .. }
        )
    }

    pub(crate) fn unsupported(typ: FourCC, what: impl Into<String>) -> Self {
        ParseError::Unsupported {
            typ,
            what: what.into(),
        }
    }

    pub(crate) fn lookup(path: String, source: LookupError) -> Self {
        ParseError::Lookup { path, source }
    }

    pub(crate) fn invalid(typ: FourCC, what: impl Into<String>) -> Self {
        ParseError::InvalidField {
            typ,
            what: what.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Decode the box header at the reader's current position.
///
/// Leaves the reader positioned at the first payload byte.
pub fn read_box_header<R: Read + Seek>(r: &mut R) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    let size32 = r.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;
    let typ = FourCC(typ);

    // A garbage tag almost always means we are reading from the wrong place.
    if !typ.is_printable() {
        return Err(ParseError::InvalidTag { offset: start, tag: typ.0 });
    }
    if size32 == 0 {
        return Err(ParseError::ZeroSize { offset: start });
    }

    let mut size = size32 as u64;
    if size32 == 1 {
        size = r.read_u64::<BigEndian>()?;
    }

    let mut uuid = None;
    if typ == FourCC::UUID {
        let mut u = [0u8; 16];
        r.read_exact(&mut u)?;
        uuid = Some(u);
    }

    let header_size = match (size32 == 1, uuid.is_some()) {
        (true, true) => 8 + 8 + 16,
        (true, false) => 8 + 8,
        (false, true) => 8 + 16,
        (false, false) => 8,
    } as u64;

    if size > i64::MAX as u64 || start.checked_add(size).is_none() {
        return Err(ParseError::SizeTooLarge { offset: start, size });
    }
    if size < header_size {
        return Err(ParseError::InvalidSize {
            offset: start,
            size,
            header_size,
        });
    }

    Ok(BoxHeader {
        size,
        typ,
        uuid,
        header_size,
        start,
    })
}

/// Seek to `offset` and decode the box header found there.
pub fn read_box_header_at<R: Read + Seek>(r: &mut R, offset: u64) -> Result<BoxHeader> {
    r.seek(SeekFrom::Start(offset))?;
    read_box_header(r)
}

/// Parse every box in `[0, len)` into a new tree.
pub fn parse<R: Read + Seek>(r: &mut R, len: u64, registry: &Registry) -> Result<BoxTree> {
    let mut tree = BoxTree::new();
    let top = read_level(r, registry, &mut tree, None, 0, len, 0)?;
    tree.attach_children(None, top);
    Ok(tree)
}

/// Parse the sibling boxes filling `[start, start + len)` as children of
/// `parent` (top level when `None`).
///
/// Each box is built and indexed before its own children are read, so a
/// factory can always see its ancestors and everything parsed before it.
/// Boxes nested deeper than [`MAX_DEPTH`] fail with [`ParseError::TooDeep`].
pub fn read_boxes<R: Read + Seek>(
    r: &mut R,
    registry: &Registry,
    tree: &mut BoxTree,
    parent: Option<BoxId>,
    start: u64,
    len: u64,
) -> Result<LoadedBoxIndex> {
    let depth = parent.map_or(0, |p| tree.lineage(p).len());
    read_level(r, registry, tree, parent, start, len, depth)
}

fn read_level<R: Read + Seek>(
    r: &mut R,
    registry: &Registry,
    tree: &mut BoxTree,
    parent: Option<BoxId>,
    start: u64,
    len: u64,
    depth: usize,
) -> Result<LoadedBoxIndex> {
    let limit = start
        .checked_add(len)
        .ok_or(ParseError::SizeTooLarge { offset: start, size: len })?;

    let mut loaded = LoadedBoxIndex::new();
    let mut offset = start;
    while offset < limit {
        if depth > MAX_DEPTH {
            return Err(ParseError::TooDeep { offset, depth });
        }
        if limit - offset < MIN_HEADER_SIZE {
            return Err(ParseError::Overrun {
                offset,
                end: offset + MIN_HEADER_SIZE,
                limit,
            });
        }
        let hdr = read_box_header_at(r, offset)?;
        if hdr.end() > limit {
            return Err(ParseError::Overrun {
                offset,
                end: hdr.end(),
                limit,
            });
        }
        offset = hdr.end();
        let typ = hdr.typ;
        let id = build_box(r, registry, tree, parent, hdr, depth)?;
        loaded.push(typ, id);
    }
    Ok(loaded)
}

fn build_box<R: Read + Seek>(
    r: &mut R,
    registry: &Registry,
    tree: &mut BoxTree,
    parent: Option<BoxId>,
    hdr: BoxHeader,
    depth: usize,
) -> Result<BoxId> {
    let Some(factory) = registry.get(&hdr.key()) else {
        warn!(
            "skipping unknown box {} at {:#x} ({} bytes)",
            hdr.key(),
            hdr.start,
            hdr.size
        );
        return Ok(tree.push(BoxNode {
            hdr,
            parent,
            value: None,
            children: None,
        }));
    };

    r.seek(SeekFrom::Start(hdr.payload_offset()))?;
    let Built { value, children_at } = {
        let mut payload = (&mut *r).take(hdr.payload_len());
        let mut ctx = BuildContext::new(&hdr, parent, tree);
        factory.build(&mut payload, &mut ctx)?
    };

    let payload_offset = hdr.payload_offset();
    let payload_len = hdr.payload_len();
    let typ = hdr.typ;
    let start = hdr.start;

    let id = tree.push(BoxNode {
        hdr,
        parent,
        value: Some(value),
        children: None,
    });
    let path = tree.path_of(id);
    let entry = tree.index_mut().add(&path, id);
    debug!("built {entry} at {start:#x}");

    if let Some(children_at) = children_at {
        if children_at > payload_len {
            return Err(ParseError::BadChildOffset {
                typ,
                offset: start,
                children_at,
                payload_len,
            });
        }
        let children = read_level(
            r,
            registry,
            tree,
            Some(id),
            payload_offset + children_at,
            payload_len - children_at,
            depth + 1,
        )?;
        tree.attach_children(Some(id), children);
    }

    Ok(id)
}
