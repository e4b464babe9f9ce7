//! Item information: the `iinf` directory and its `infe` entries.
//!
//! See ISO 14496-12:2015 § 8.11.6. Each `infe` registers itself with the
//! enclosing `iinf` as it is built, so the directory is complete by the time
//! the `iinf` box's children have been read.

use crate::boxes::FourCC;
use crate::parser::{ParseError, Result};
use crate::registry::{BoxFactory, BoxValue, BuildContext, Built};
use crate::tree::{LookupError, typed_box};
use crate::util::{read_cstring, read_fullbox_header};
use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;

const IINF: FourCC = FourCC(*b"iinf");
const MIME: FourCC = FourCC(*b"mime");
const URI: FourCC = FourCC(*b"uri ");

/// Item Information Box.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IinfBox {
    pub version: u8,
    pub flags: u32,
    /// Entry count as declared in the box; see [`items`](Self::items) for
    /// what was actually found.
    pub entry_count: u32,
    items: Vec<InfeBox>,
    #[serde(skip)]
    by_id: HashMap<u32, usize>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}
typed_box!(IinfBox, Iinf, "iinf");

impl IinfBox {
    pub fn new(version: u8, flags: u32, entry_count: u32) -> Self {
        Self {
            version,
            flags,
            entry_count,
            ..Self::default()
        }
    }

    /// Record an item entry. Item ids and non-empty names must be unique.
    pub fn add_item(&mut self, infe: InfeBox) -> Result<()> {
        if self.by_id.contains_key(&infe.item_id) {
            return Err(ParseError::DuplicateItem {
                typ: IINF,
                what: format!("id {}", infe.item_id),
            });
        }
        // Many writers leave every name empty; only real names must be unique.
        if !infe.name.is_empty() && self.by_name.contains_key(&infe.name) {
            return Err(ParseError::DuplicateItem {
                typ: IINF,
                what: format!("name {:?}", infe.name),
            });
        }

        let slot = self.items.len();
        self.by_id.insert(infe.item_id, slot);
        if !infe.name.is_empty() {
            self.by_name.insert(infe.name.clone(), slot);
        }
        self.items.push(infe);

        if self.items.len() as u64 > self.entry_count as u64 {
            warn!(
                "iinf declares {} entries but holds at least {}",
                self.entry_count,
                self.items.len()
            );
        }
        Ok(())
    }

    /// Entries in file order.
    pub fn items(&self) -> &[InfeBox] {
        &self.items
    }

    pub fn item_with_id(&self, item_id: u32) -> std::result::Result<&InfeBox, LookupError> {
        self.by_id
            .get(&item_id)
            .map(|&i| &self.items[i])
            .ok_or(LookupError::InfoItemNotFound(item_id))
    }

    pub fn item_with_name(&self, name: &str) -> std::result::Result<&InfeBox, LookupError> {
        self.by_name
            .get(name)
            .map(|&i| &self.items[i])
            .ok_or_else(|| LookupError::InfoNameNotFound(name.to_string()))
    }
}

pub struct IinfFactory;

impl BoxFactory for IinfFactory {
    fn build(&self, r: &mut dyn Read, _ctx: &mut BuildContext<'_>) -> Result<Built> {
        let (version, flags) = read_fullbox_header(r)?;
        let (entry_count, children_at) = if version == 0 {
            (r.read_u16::<BigEndian>()? as u32, 4 + 2)
        } else {
            (r.read_u32::<BigEndian>()?, 4 + 4)
        };

        Ok(Built::with_children(
            BoxValue::Iinf(IinfBox::new(version, flags, entry_count)),
            children_at,
        ))
    }
}

/// Item Info Entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InfeBox {
    pub version: u8,
    pub flags: u32,
    pub item_id: u32,
    pub protection_index: u16,
    /// Present from version 2 on.
    pub item_type: Option<FourCC>,
    pub name: String,
    /// Versions 0 and 1, or `mime` items.
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    /// `uri ` items only.
    pub uri_type: Option<String>,
    /// Version 1 only, when present.
    pub extension_type: Option<FourCC>,
}
typed_box!(InfeBox, Infe, "infe");

impl InfeBox {
    /// Short tag describing the item's content, suitable for a file extension.
    pub fn item_type_tag(&self) -> String {
        if let Some(t) = self.item_type {
            return t.as_str_lossy().trim().to_string();
        }
        match self.content_type.as_deref() {
            Some(ct) if !ct.is_empty() => ct.rsplit('/').next().unwrap_or(ct).to_string(),
            _ => "item".to_string(),
        }
    }
}

impl fmt::Display for InfeBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item_id={} type={}", self.item_id, self.item_type_tag())?;
        if !self.name.is_empty() {
            write!(f, " name={:?}", self.name)?;
        }
        Ok(())
    }
}

pub struct InfeFactory;

impl InfeFactory {
    fn read(r: &mut dyn Read, typ: FourCC) -> Result<InfeBox> {
        let (version, flags) = read_fullbox_header(r)?;
        let item_id = match version {
            0..=2 => r.read_u16::<BigEndian>()? as u32,
            3 => r.read_u32::<BigEndian>()?,
            _ => return Err(ParseError::UnsupportedVersion { typ, version }),
        };

        let protection_index = r.read_u16::<BigEndian>()?;
        if protection_index != 0 {
            return Err(ParseError::unsupported(
                typ,
                format!("protected item {item_id} (protection index {protection_index})"),
            ));
        }

        let mut infe = InfeBox {
            version,
            flags,
            item_id,
            protection_index,
            item_type: None,
            name: String::new(),
            content_type: None,
            content_encoding: None,
            uri_type: None,
            extension_type: None,
        };

        if version < 2 {
            infe.name = read_cstring(r)?;
            infe.content_type = Some(read_cstring(r)?);
            infe.content_encoding = Some(read_cstring(r)?);
            if version == 1 {
                let mut ext = Vec::new();
                (&mut *r).take(4).read_to_end(&mut ext)?;
                infe.extension_type = match ext.len() {
                    0 => None,
                    4 => Some(FourCC([ext[0], ext[1], ext[2], ext[3]])),
                    n => {
                        return Err(ParseError::invalid(
                            typ,
                            format!("truncated extension type ({n} bytes)"),
                        ));
                    }
                };
            }
        } else {
            let item_type = FourCC::from(r.read_u32::<BigEndian>()?);
            infe.item_type = Some(item_type);
            infe.name = read_cstring(r)?;
            if item_type == MIME {
                infe.content_type = Some(read_cstring(r)?);
                infe.content_encoding = Some(read_cstring(r)?);
            } else if item_type == URI {
                infe.uri_type = Some(read_cstring(r)?);
            }
        }

        Ok(infe)
    }
}

impl BoxFactory for InfeFactory {
    fn build(&self, r: &mut dyn Read, ctx: &mut BuildContext<'_>) -> Result<Built> {
        let infe = Self::read(r, ctx.header().typ)?;
        debug!("infe {infe}");

        let path = ctx.path();
        ctx.ancestor_mut::<IinfBox>()
            .map_err(|source| ParseError::lookup(path, source))?
            .add_item(infe.clone())?;

        Ok(Built::leaf(BoxValue::Infe(infe)))
    }
}
