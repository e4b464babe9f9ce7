use crate::boxes::{BoxHeader, BoxId, BoxNode, FourCC};
use crate::index::{FullBoxIndex, LoadedBoxIndex};
use crate::registry::BoxValue;

/// Errors raised when a box, item or extent that a caller asks for is absent.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no box indexed at {0}")]
    NotFound(String),
    #[error("box at {path} is not a {expected}")]
    TypeMismatch { path: String, expected: &'static str },
    #[error("no {0} ancestor")]
    NoAncestor(&'static str),
    #[error("item {0} not found in iloc")]
    LocationItemNotFound(u32),
    #[error("item {0} not found in iinf")]
    InfoItemNotFound(u32),
    #[error("no item named {0:?} in iinf")]
    InfoNameNotFound(String),
    #[error("item {item_id} has no extent {index}")]
    ExtentNotFound { item_id: u32, index: usize },
}

/// A built box type that can be pulled back out of a [`BoxValue`].
pub trait TypedBox: Sized {
    /// Name used in lookup errors.
    const NAME: &'static str;

    fn from_value(value: &BoxValue) -> Option<&Self>;
    fn from_value_mut(value: &mut BoxValue) -> Option<&mut Self>;
}

macro_rules! typed_box {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl $crate::tree::TypedBox for $ty {
            const NAME: &'static str = $name;

            fn from_value(value: &$crate::registry::BoxValue) -> Option<&Self> {
                match value {
                    $crate::registry::BoxValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_value_mut(value: &mut $crate::registry::BoxValue) -> Option<&mut Self> {
                match value {
                    $crate::registry::BoxValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}
pub(crate) use typed_box;

/// Arena of every box parsed from one resource, plus both indices.
///
/// Nodes refer to their parent by [`BoxId`], never by pointer.
#[derive(Debug, Default)]
pub struct BoxTree {
    nodes: Vec<BoxNode>,
    index: FullBoxIndex,
    top: LoadedBoxIndex,
}

impl BoxTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, node: BoxNode) -> BoxId {
        let id = BoxId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn index_mut(&mut self) -> &mut FullBoxIndex {
        &mut self.index
    }

    pub(crate) fn attach_children(&mut self, parent: Option<BoxId>, children: LoadedBoxIndex) {
        match parent {
            Some(id) => self.nodes[id.0].children = Some(children),
            None => self.top = children,
        }
    }

    pub fn node(&self, id: BoxId) -> &BoxNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (BoxId, &BoxNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (BoxId(i), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index(&self) -> &FullBoxIndex {
        &self.index
    }

    pub fn top_level(&self) -> &LoadedBoxIndex {
        &self.top
    }

    /// Children of `id`; empty for leaves.
    pub fn children(&self, id: BoxId) -> Option<&LoadedBoxIndex> {
        self.node(id).children.as_ref()
    }

    /// Ids from the root down to and including `id`.
    pub fn lineage(&self, id: BoxId) -> Vec<BoxId> {
        let mut chain = vec![id];
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            chain.push(p);
            cur = self.node(p).parent;
        }
        chain.reverse();
        chain
    }

    /// Dotted type path from the root down to `id`, e.g. `meta.iinf.infe`.
    pub fn path_of(&self, id: BoxId) -> String {
        self.lineage(id)
            .into_iter()
            .map(|i| self.node(i).hdr.typ.as_str_lossy())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Path a child of `parent` with type `typ` would be indexed under.
    pub fn child_path(&self, parent: Option<BoxId>, typ: FourCC) -> String {
        match parent {
            Some(p) => format!("{}.{}", self.path_of(p), typ.as_str_lossy()),
            None => typ.as_str_lossy(),
        }
    }

    pub fn get<T: TypedBox>(&self, id: BoxId) -> Option<&T> {
        self.node(id).value.as_ref().and_then(T::from_value)
    }

    pub(crate) fn get_mut<T: TypedBox>(&mut self, id: BoxId) -> Option<&mut T> {
        self.nodes[id.0].value.as_mut().and_then(T::from_value_mut)
    }

    /// First box indexed at `path`, typed.
    pub fn find<T: TypedBox>(&self, path: &str) -> Result<&T, LookupError> {
        self.find_with_id::<T>(path).map(|(_, v)| v)
    }

    /// Like [`find`](Self::find) but also returns the box id.
    pub fn find_with_id<T: TypedBox>(&self, path: &str) -> Result<(BoxId, &T), LookupError> {
        let id = self
            .index
            .get(path, 0)
            .ok_or_else(|| LookupError::NotFound(path.to_string()))?;
        let v = id_value(self, id, path)?;
        Ok((id, v))
    }

    /// Every box indexed at `path` that has type `T`, in sequence order.
    pub fn find_all<T: TypedBox>(&self, path: &str) -> Vec<(BoxId, &T)> {
        self.index
            .all(path)
            .into_iter()
            .filter_map(|id| self.get::<T>(id).map(|v| (id, v)))
            .collect()
    }

    /// Nearest box holding a `T`, starting at `id` and walking up.
    pub fn ancestor<T: TypedBox>(&self, id: Option<BoxId>) -> Result<(BoxId, &T), LookupError> {
        let mut cur = id;
        while let Some(i) = cur {
            if let Some(v) = self.get::<T>(i) {
                return Ok((i, v));
            }
            cur = self.node(i).parent;
        }
        Err(LookupError::NoAncestor(T::NAME))
    }

    /// Sibling of `id` with type `typ`, typed.
    pub fn sibling<T: TypedBox>(&self, id: BoxId, typ: FourCC) -> Result<(BoxId, &T), LookupError> {
        let parent = self.node(id).parent;
        let siblings = match parent {
            Some(p) => self.children(p),
            None => Some(&self.top),
        };
        let path = self.child_path(parent, typ);
        let sib = siblings
            .and_then(|s| s.first(typ))
            .ok_or_else(|| LookupError::NotFound(path.clone()))?;
        let v = id_value(self, sib, &path)?;
        Ok((sib, v))
    }

    /// Sorted index listing with offsets, sizes and value summaries.
    pub fn dump_index(&self) -> String {
        let mut out = String::new();
        for (entry, id) in self.index.iter() {
            let node = self.node(id);
            out.push_str(&format!(
                "{:<32} @{:#010x} size={:<10} {}\n",
                entry.to_string(),
                node.hdr.start,
                node.hdr.size,
                node.inline_string().unwrap_or_default()
            ));
        }
        out
    }

    /// Header of `id`.
    pub fn header(&self, id: BoxId) -> &BoxHeader {
        &self.node(id).hdr
    }
}

fn id_value<'a, T: TypedBox>(tree: &'a BoxTree, id: BoxId, path: &str) -> Result<&'a T, LookupError> {
    tree.get::<T>(id).ok_or_else(|| LookupError::TypeMismatch {
        path: path.to_string(),
        expected: T::NAME,
    })
}
