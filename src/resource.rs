use crate::boxes::BoxId;
use crate::extents::ItemExtractor;
use crate::iloc::IlocBox;
use crate::index::{FullBoxIndex, LoadedBoxIndex};
use crate::known_boxes::full_name;
use crate::parser::{self, Result};
use crate::pitm::PitmBox;
use crate::registry::{BoxValue, Registry};
use crate::tree::{BoxTree, LookupError, TypedBox};
use serde::Serialize;
use std::io::{Read, Seek};

/// A fully parsed file: the box tree and its indices.
///
/// Parsing either succeeds completely or returns an error; a `Resource` is
/// never partial. It holds no reference to the stream, so it can be shared
/// freely once built.
#[derive(Debug)]
pub struct Resource {
    tree: BoxTree,
    len: u64,
}

impl Resource {
    /// Parse the first `len` bytes of `r`.
    ///
    /// # Example
    /// ```no_run
    /// use heifbox::{Resource, default_registry};
    /// use std::fs::File;
    ///
    /// let mut file = File::open("image.heic")?;
    /// let len = file.metadata()?.len();
    /// let registry = default_registry()?;
    /// let resource = Resource::open(&mut file, len, &registry)?;
    /// println!("{}", resource.dump_index());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<R: Read + Seek>(r: &mut R, len: u64, registry: &Registry) -> Result<Self> {
        let tree = parser::parse(r, len, registry)?;
        Ok(Self { tree, len })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn tree(&self) -> &BoxTree {
        &self.tree
    }

    pub fn index(&self) -> &FullBoxIndex {
        self.tree.index()
    }

    pub fn top_level_children(&self) -> &LoadedBoxIndex {
        self.tree.top_level()
    }

    pub fn find<T: TypedBox>(&self, path: &str) -> std::result::Result<&T, LookupError> {
        self.tree.find::<T>(path)
    }

    pub fn find_all<T: TypedBox>(&self, path: &str) -> Vec<(BoxId, &T)> {
        self.tree.find_all::<T>(path)
    }

    /// Id of the primary item, from `meta.pitm`.
    pub fn primary_item_id(&self) -> std::result::Result<u32, LookupError> {
        self.find::<PitmBox>("meta.pitm").map(|p| p.item_id)
    }

    /// Extractor over the items of `meta.iloc`.
    pub fn extractor(&self) -> std::result::Result<ItemExtractor<'_>, LookupError> {
        let (id, _) = self.tree.find_with_id::<IlocBox>("meta.iloc")?;
        ItemExtractor::new(&self.tree, id, self.len)
    }

    /// Sorted listing of every indexed box.
    pub fn dump_index(&self) -> String {
        self.tree.dump_index()
    }

    /// Serialisable view of the whole tree.
    pub fn to_json(&self) -> Vec<JsonBox<'_>> {
        self.tree
            .top_level()
            .iter()
            .map(|id| build_json(&self.tree, id))
            .collect()
    }
}

/// A JSON-serializable representation of a single box.
#[derive(Serialize)]
pub struct JsonBox<'a> {
    /// Absolute byte offset of this box in the file
    pub offset: u64,
    /// Total size of this box including header and payload
    pub size: u64,
    pub header_size: u64,
    /// Four-character box type code (e.g., "ftyp", "iloc")
    pub typ: String,
    /// Extended type of `uuid` boxes, as hex
    pub uuid: Option<String>,
    /// Human-readable box type name (e.g., "Item Location Box")
    pub full_name: &'static str,
    /// Dotted path the box is indexed under
    pub path: String,
    /// Built value; `None` for box types nothing is registered for
    pub value: Option<&'a BoxValue>,
    pub children: Option<Vec<JsonBox<'a>>>,
}

fn build_json(tree: &BoxTree, id: BoxId) -> JsonBox<'_> {
    let node = tree.node(id);
    let hdr = &node.hdr;
    JsonBox {
        offset: hdr.start,
        size: hdr.size,
        header_size: hdr.header_size,
        typ: hdr.typ.to_string(),
        uuid: hdr.uuid.map(hex::encode),
        full_name: full_name(hdr.typ),
        path: tree.path_of(id),
        value: node.value.as_ref(),
        children: node
            .children
            .as_ref()
            .map(|kids| kids.iter().map(|c| build_json(tree, c)).collect()),
    }
}
