use crate::index::LoadedBoxIndex;
use crate::registry::BoxValue;
use std::fmt;

/// Four-character box type code.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const UUID: FourCC = FourCC(*b"uuid");

    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }

    /// True when every byte is printable ASCII (0x20..=0x7e).
    pub fn is_printable(&self) -> bool {
        self.0.iter().all(|c| (32..=126).contains(c))
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl From<u32> for FourCC {
    fn from(v: u32) -> Self {
        FourCC(v.to_be_bytes())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl serde::Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

/// Registry key: plain 4CC, or the extended type of a `uuid` box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxKey {
    FourCC(FourCC),
    Uuid([u8; 16]),
}

impl fmt::Display for BoxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxKey::FourCC(cc) => write!(f, "{cc}"),
            BoxKey::Uuid(u) => write!(f, "uuid:{}", hex::encode(u)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHeader {
    pub size: u64,        // total size including header
    pub typ: FourCC,      // 4CC or b"uuid"
    pub uuid: Option<[u8; 16]>,
    pub header_size: u64, // 8, 16, 24 or 32
    pub start: u64,       // file offset of header start
}

impl BoxHeader {
    pub fn key(&self) -> BoxKey {
        match self.uuid {
            Some(u) => BoxKey::Uuid(u),
            None => BoxKey::FourCC(self.typ),
        }
    }

    pub fn payload_offset(&self) -> u64 {
        self.start + self.header_size
    }

    pub fn payload_len(&self) -> u64 {
        self.size - self.header_size
    }

    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// Index of a node in its [`BoxTree`](crate::tree::BoxTree) arena.
///
/// Ids are handed out in parse order, so a parent always has a smaller id
/// than any of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct BoxId(pub usize);

/// One parsed box.
///
/// `value` is `None` for box types with no registered factory; those are kept
/// in the tree so their bytes are accounted for, but are never indexed.
#[derive(Debug)]
pub struct BoxNode {
    pub hdr: BoxHeader,
    pub parent: Option<BoxId>,
    pub value: Option<BoxValue>,
    pub children: Option<LoadedBoxIndex>,
}

impl BoxNode {
    pub fn name(&self) -> FourCC {
        self.hdr.typ
    }

    pub fn size(&self) -> u64 {
        self.hdr.size
    }

    /// One-line summary of the built value, if any.
    pub fn inline_string(&self) -> Option<String> {
        self.value.as_ref().map(|v| v.inline_string())
    }
}
