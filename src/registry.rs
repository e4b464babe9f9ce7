use crate::boxes::{BoxHeader, BoxId, BoxKey, FourCC};
use crate::iinf::{IinfBox, IinfFactory, InfeBox, InfeFactory};
use crate::iloc::{IlocBox, IlocFactory};
use crate::iref::{IrefBox, IrefFactory, ItemReferenceBox, ItemReferenceFactory};
use crate::leaf::{
    ContainerBox, ContainerFactory, DataBox, DataFactory, FtypBox, FtypFactory, HdlrBox,
    HdlrFactory, MdhdBox, MdhdFactory, MetaBox, MetaFactory, MvhdBox, MvhdFactory, TkhdBox,
    TkhdFactory,
};
use crate::parser::Result;
use crate::pitm::{PitmBox, PitmFactory};
use crate::tree::{BoxTree, LookupError, TypedBox};
use std::collections::HashMap;
use std::io::Read;

/// A value built by a box factory.
///
/// Factories outside this crate that have nothing structured to offer may
/// return a text summary or the raw payload.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum BoxValue {
    Text(String),
    Bytes(Vec<u8>),
    Ftyp(FtypBox),
    Container(ContainerBox),
    Meta(MetaBox),
    Hdlr(HdlrBox),
    Mvhd(MvhdBox),
    Tkhd(TkhdBox),
    Mdhd(MdhdBox),
    Data(DataBox),
    Iinf(IinfBox),
    Infe(InfeBox),
    Iloc(IlocBox),
    Iref(IrefBox),
    ItemReference(ItemReferenceBox),
    Pitm(PitmBox),
}

impl BoxValue {
    /// One-line, human-readable summary.
    pub fn inline_string(&self) -> String {
        match self {
            BoxValue::Text(s) => s.clone(),
            BoxValue::Bytes(b) => format!("{} bytes", b.len()),
            BoxValue::Ftyp(v) => v.to_string(),
            BoxValue::Container(_) => String::new(),
            BoxValue::Meta(v) => format!("version={} flags={:#06x}", v.version, v.flags),
            BoxValue::Hdlr(v) => format!("handler={} name={:?}", v.handler_type, v.name),
            BoxValue::Mvhd(v) => format!("timescale={} duration={}", v.timescale, v.duration),
            BoxValue::Tkhd(v) => format!(
                "track_id={} duration={} width={} height={}",
                v.track_id, v.duration, v.width, v.height
            ),
            BoxValue::Mdhd(v) => format!(
                "timescale={} duration={} language={}",
                v.timescale, v.duration, v.language
            ),
            BoxValue::Data(v) => format!("payload @{:#x} len={}", v.offset, v.len),
            BoxValue::Iinf(v) => format!("entry_count={} items={}", v.entry_count, v.items().len()),
            BoxValue::Infe(v) => v.to_string(),
            BoxValue::Iloc(v) => format!("version={} items={}", v.version, v.items().len()),
            BoxValue::Iref(v) => format!("version={} references={}", v.version, v.references().len()),
            BoxValue::ItemReference(v) => v.to_string(),
            BoxValue::Pitm(v) => format!("item_id={}", v.item_id),
        }
    }
}

/// What a factory hands back to the tree builder.
#[derive(Debug)]
pub struct Built {
    pub value: BoxValue,
    /// Offset inside the payload at which child boxes begin; `None` for leaves.
    pub children_at: Option<u64>,
}

impl Built {
    pub fn leaf(value: BoxValue) -> Self {
        Self {
            value,
            children_at: None,
        }
    }

    pub fn with_children(value: BoxValue, children_at: u64) -> Self {
        Self {
            value,
            children_at: Some(children_at),
        }
    }
}

/// State visible to a factory while it builds one box.
///
/// Every ancestor of the box being built, and every box parsed before it, is
/// already in the tree and its index.
pub struct BuildContext<'a> {
    hdr: &'a BoxHeader,
    parent: Option<BoxId>,
    tree: &'a mut BoxTree,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(hdr: &'a BoxHeader, parent: Option<BoxId>, tree: &'a mut BoxTree) -> Self {
        Self { hdr, parent, tree }
    }

    pub fn header(&self) -> &BoxHeader {
        self.hdr
    }

    pub fn parent(&self) -> Option<BoxId> {
        self.parent
    }

    /// Dotted path this box will be indexed under.
    pub fn path(&self) -> String {
        self.tree.child_path(self.parent, self.hdr.typ)
    }

    pub fn tree(&self) -> &BoxTree {
        self.tree
    }

    /// Nearest ancestor of type `T`.
    pub fn ancestor<T: TypedBox>(&self) -> std::result::Result<&T, LookupError> {
        self.tree.ancestor::<T>(self.parent).map(|(_, v)| v)
    }

    pub fn ancestor_mut<T: TypedBox>(&mut self) -> std::result::Result<&mut T, LookupError> {
        let id = self.tree.ancestor::<T>(self.parent)?.0;
        self.tree
            .get_mut::<T>(id)
            .ok_or(LookupError::NoAncestor(T::NAME))
    }

    /// Box already indexed at `path`.
    pub fn find<T: TypedBox>(&self, path: &str) -> std::result::Result<&T, LookupError> {
        self.tree.find::<T>(path)
    }
}

/// Builds a typed value for one box type.
///
/// `r` is limited to the box payload (everything after the header).
pub trait BoxFactory: Send + Sync {
    fn build(&self, r: &mut dyn Read, ctx: &mut BuildContext<'_>) -> Result<Built>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a factory is already registered for {key} ({existing})")]
    DuplicateRegistration { key: BoxKey, existing: String },
}

/// Factories keyed by `BoxKey` (4CC or UUID).
///
/// Built once before parsing and passed by reference to the parser.
pub struct Registry {
    map: HashMap<BoxKey, FactoryEntry>,
}

struct FactoryEntry {
    inner: Box<dyn BoxFactory>,
    name: String,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Add a factory. A key can be registered only once.
    ///
    /// `name` is human-readable and used only for debugging / logging.
    pub fn register(
        &mut self,
        key: BoxKey,
        name: &str,
        factory: Box<dyn BoxFactory>,
    ) -> std::result::Result<(), RegistryError> {
        if let Some(existing) = self.map.get(&key) {
            return Err(RegistryError::DuplicateRegistration {
                key,
                existing: existing.name.clone(),
            });
        }
        self.map.insert(
            key,
            FactoryEntry {
                inner: factory,
                name: name.to_string(),
            },
        );
        Ok(())
    }

    /// Fluent form of [`register`](Self::register).
    pub fn with_factory(
        mut self,
        key: BoxKey,
        name: &str,
        factory: Box<dyn BoxFactory>,
    ) -> std::result::Result<Self, RegistryError> {
        self.register(key, name, factory)?;
        Ok(self)
    }

    pub fn get(&self, key: &BoxKey) -> Option<&dyn BoxFactory> {
        self.map.get(key).map(|e| e.inner.as_ref())
    }

    pub fn name_of(&self, key: &BoxKey) -> Option<&str> {
        self.map.get(key).map(|e| e.name.as_str())
    }

    pub fn contains(&self, key: &BoxKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

const CONTAINERS: &[(&[u8; 4], &str)] = &[
    (b"moov", "Movie Box"),
    (b"trak", "Track Box"),
    (b"mdia", "Media Box"),
    (b"minf", "Media Information Box"),
    (b"stbl", "Sample Table Box"),
    (b"edts", "Edit Box"),
    (b"dinf", "Data Information Box"),
    (b"udta", "User Data Box"),
    (b"mvex", "Movie Extends Box"),
    (b"moof", "Movie Fragment Box"),
    (b"traf", "Track Fragment Box"),
    (b"iprp", "Item Properties Box"),
    (b"ipco", "Item Property Container Box"),
];

const ITEM_REFERENCES: &[(&[u8; 4], &str)] = &[
    (b"cdsc", "Content Describes Reference"),
    (b"dimg", "Derived Image Reference"),
    (b"thmb", "Thumbnail Reference"),
    (b"auxl", "Auxiliary Image Reference"),
    (b"base", "Base Image Reference"),
    (b"prem", "Pre-multiplied Image Reference"),
];

/// Registry with every factory this crate provides.
pub fn default_registry() -> std::result::Result<Registry, RegistryError> {
    let fourcc = |t: &[u8; 4]| BoxKey::FourCC(FourCC(*t));

    let mut reg = Registry::new()
        .with_factory(fourcc(b"ftyp"), "File Type Box", Box::new(FtypFactory))?
        .with_factory(fourcc(b"meta"), "Meta Box", Box::new(MetaFactory))?
        .with_factory(fourcc(b"hdlr"), "Handler Reference Box", Box::new(HdlrFactory))?
        .with_factory(fourcc(b"mvhd"), "Movie Header Box", Box::new(MvhdFactory))?
        .with_factory(fourcc(b"tkhd"), "Track Header Box", Box::new(TkhdFactory))?
        .with_factory(fourcc(b"mdhd"), "Media Header Box", Box::new(MdhdFactory))?
        .with_factory(fourcc(b"mdat"), "Media Data Box", Box::new(DataFactory))?
        .with_factory(fourcc(b"idat"), "Item Data Box", Box::new(DataFactory))?
        .with_factory(fourcc(b"iinf"), "Item Info Box", Box::new(IinfFactory))?
        .with_factory(fourcc(b"infe"), "Item Info Entry", Box::new(InfeFactory))?
        .with_factory(fourcc(b"iloc"), "Item Location Box", Box::new(IlocFactory))?
        .with_factory(fourcc(b"iref"), "Item Reference Box", Box::new(IrefFactory))?
        .with_factory(fourcc(b"pitm"), "Primary Item Box", Box::new(PitmFactory))?;

    for (t, name) in CONTAINERS {
        reg.register(fourcc(t), name, Box::new(ContainerFactory))?;
    }
    for (t, name) in ITEM_REFERENCES {
        reg.register(fourcc(t), name, Box::new(ItemReferenceFactory))?;
    }

    Ok(reg)
}
