//! Item references (`iref`) and the single-type reference boxes nested in
//! it, such as `cdsc` ("content describes") and `dimg` ("derived image").
//!
//! See ISO 14496-12:2015 § 8.11.12.

use crate::boxes::FourCC;
use crate::parser::{ParseError, Result};
use crate::registry::{BoxFactory, BoxValue, BuildContext, Built};
use crate::tree::typed_box;
use crate::util::read_fullbox_header;
use byteorder::{BigEndian, ReadBytesExt};
use log::debug;
use std::fmt;
use std::io::Read;

/// Item Reference Box. Collects every reference box nested in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct IrefBox {
    pub version: u8,
    pub flags: u32,
    references: Vec<ItemReferenceBox>,
}
typed_box!(IrefBox, Iref, "iref");

impl IrefBox {
    /// Item ids are 16-bit in version 0 and 32-bit otherwise.
    pub fn wide_ids(&self) -> bool {
        self.version != 0
    }

    pub fn references(&self) -> &[ItemReferenceBox] {
        &self.references
    }

    /// References whose source is `item_id`, in file order.
    pub fn references_from(&self, item_id: u32) -> impl Iterator<Item = &ItemReferenceBox> {
        self.references
            .iter()
            .filter(move |r| r.from_item_id == item_id)
    }
}

pub struct IrefFactory;

impl BoxFactory for IrefFactory {
    fn build(&self, r: &mut dyn Read, _ctx: &mut BuildContext<'_>) -> Result<Built> {
        let (version, flags) = read_fullbox_header(r)?;
        Ok(Built::with_children(
            BoxValue::Iref(IrefBox {
                version,
                flags,
                references: Vec::new(),
            }),
            4,
        ))
    }
}

/// One reference box: a source item and the items it points at.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ItemReferenceBox {
    pub reference_type: FourCC,
    pub from_item_id: u32,
    pub to_item_ids: Vec<u32>,
}
typed_box!(ItemReferenceBox, ItemReference, "item reference");

/// The `cdsc` layout is shared by every reference type.
pub type CdscBox = ItemReferenceBox;

impl fmt::Display for ItemReferenceBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from={} to={:?}",
            self.reference_type, self.from_item_id, self.to_item_ids
        )
    }
}

fn read_item_id<R: Read + ?Sized>(r: &mut R, wide: bool) -> Result<u32> {
    Ok(if wide {
        r.read_u32::<BigEndian>()?
    } else {
        r.read_u16::<BigEndian>()? as u32
    })
}

/// Builds any single-type reference box.
///
/// The id width comes from the enclosing `iref`, so a reference box found
/// anywhere else is rejected.
pub struct ItemReferenceFactory;

impl BoxFactory for ItemReferenceFactory {
    fn build(&self, r: &mut dyn Read, ctx: &mut BuildContext<'_>) -> Result<Built> {
        let path = ctx.path();
        let wide = ctx
            .ancestor::<IrefBox>()
            .map_err(|source| ParseError::lookup(path.clone(), source))?
            .wide_ids();

        let from_item_id = read_item_id(r, wide)?;
        let count = r.read_u16::<BigEndian>()?;
        let mut to_item_ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            to_item_ids.push(read_item_id(r, wide)?);
        }

        let reference = ItemReferenceBox {
            reference_type: ctx.header().typ,
            from_item_id,
            to_item_ids,
        };
        debug!("{path}: {reference}");

        ctx.ancestor_mut::<IrefBox>()
            .map_err(|source| ParseError::lookup(path, source))?
            .references
            .push(reference.clone());

        Ok(Built::leaf(BoxValue::ItemReference(reference)))
    }
}
