//! Item location: where each item's bytes live.
//!
//! See ISO 14496-12:2015 § 8.11.3.

use crate::boxes::FourCC;
use crate::parser::{ParseError, Result};
use crate::registry::{BoxFactory, BoxValue, BuildContext, Built};
use crate::tree::{LookupError, typed_box};
use crate::util::read_fullbox_header;
use bitreader::BitReader;
use log::{debug, warn};
use std::collections::HashMap;
use std::io::Read;

const ILOC: FourCC = FourCC(*b"iloc");

/// Width in bytes of a variable-sized `iloc` field; one of 0, 4 or 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct IlocIntegerWidth(pub u8);

impl IlocIntegerWidth {
    pub const ZERO: Self = Self(0);
    pub const FOUR: Self = Self(4);
    pub const EIGHT: Self = Self(8);

    pub fn is_valid(self) -> bool {
        matches!(self.0, 0 | 4 | 8)
    }

    pub fn bits(self) -> u8 {
        self.0 * 8
    }

    fn parse(nibble: u8, field: &str) -> Result<Self> {
        let width = Self(nibble);
        if !width.is_valid() {
            return Err(ParseError::invalid(
                ILOC,
                format!("{field} is {nibble}, must be one of 0, 4, 8"),
            ));
        }
        Ok(width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IlocExtent {
    /// Only present in versions 1 and 2 when `index_size` is non-zero.
    pub index: Option<u64>,
    pub offset: u64,
    /// Zero means "to the end of the source".
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IlocItem {
    pub item_id: u32,
    /// 0 = file offset, 1 = `idat` offset, 2 = item offset. Always 0 in version 0.
    pub construction_method: u8,
    pub data_reference_index: u16,
    /// Base offset exactly as stored, `base_offset_size` bytes wide.
    pub base_offset: Vec<u8>,
    pub extents: Vec<IlocExtent>,
}

impl IlocItem {
    /// Base offset as a number.
    pub fn base_offset_value(&self) -> u64 {
        self.base_offset
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }

    /// Sum of all extent lengths.
    pub fn total_length(&self) -> u64 {
        self.extents.iter().map(|e| e.length).sum()
    }
}

/// Item Location Box.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IlocBox {
    pub version: u8,
    pub flags: u32,
    pub offset_size: IlocIntegerWidth,
    pub length_size: IlocIntegerWidth,
    pub base_offset_size: IlocIntegerWidth,
    /// Always zero in version 0, where the nibble is reserved.
    pub index_size: IlocIntegerWidth,
    items: Vec<IlocItem>,
    #[serde(skip)]
    by_id: HashMap<u32, usize>,
}
typed_box!(IlocBox, Iloc, "iloc");

impl IlocBox {
    /// Items in file order.
    pub fn items(&self) -> &[IlocItem] {
        &self.items
    }

    pub fn get_with_id(&self, item_id: u32) -> std::result::Result<&IlocItem, LookupError> {
        self.by_id
            .get(&item_id)
            .map(|&i| &self.items[i])
            .ok_or(LookupError::LocationItemNotFound(item_id))
    }

    /// Decode an `iloc` payload, starting with the version/flags prefix.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut prefix = payload;
        let (version, flags) = read_fullbox_header(&mut prefix)?;
        if version > 2 {
            return Err(ParseError::UnsupportedVersion { typ: ILOC, version });
        }

        let mut bits = BitReader::new(prefix);
        let offset_size = IlocIntegerWidth::parse(bits.read_u8(4)?, "offset_size")?;
        let length_size = IlocIntegerWidth::parse(bits.read_u8(4)?, "length_size")?;
        let base_offset_size = IlocIntegerWidth::parse(bits.read_u8(4)?, "base_offset_size")?;
        let index_size = match version {
            0 => {
                let _reserved = bits.read_u8(4)?;
                IlocIntegerWidth::ZERO
            }
            _ => IlocIntegerWidth::parse(bits.read_u8(4)?, "index_size")?,
        };

        let item_count = match version {
            0 | 1 => bits.read_u32(16)?,
            _ => bits.read_u32(32)?,
        };

        let mut iloc = IlocBox {
            version,
            flags,
            offset_size,
            length_size,
            base_offset_size,
            index_size,
            items: Vec::new(),
            by_id: HashMap::new(),
        };

        for _ in 0..item_count {
            let item_id = match version {
                0 | 1 => bits.read_u32(16)?,
                _ => bits.read_u32(32)?,
            };
            let construction_method = match version {
                0 => 0,
                _ => {
                    let _reserved = bits.read_u16(12)?;
                    bits.read_u8(4)?
                }
            };
            let data_reference_index = bits.read_u16(16)?;

            let mut base_offset = Vec::with_capacity(base_offset_size.0 as usize);
            for _ in 0..base_offset_size.0 {
                base_offset.push(bits.read_u8(8)?);
            }

            let extent_count = bits.read_u16(16)?;
            let mut extents = Vec::with_capacity(extent_count as usize);
            for _ in 0..extent_count {
                let index = if index_size.0 > 0 {
                    Some(bits.read_u64(index_size.bits())?)
                } else {
                    None
                };
                // A zero-width field reads as 0.
                let offset = bits.read_u64(offset_size.bits())?;
                let length = bits.read_u64(length_size.bits())?;
                extents.push(IlocExtent {
                    index,
                    offset,
                    length,
                });
            }

            iloc.add_item(IlocItem {
                item_id,
                construction_method,
                data_reference_index,
                base_offset,
                extents,
            })?;
        }

        let trailing = bits.remaining() / 8;
        if trailing > 0 {
            warn!("iloc has {trailing} trailing bytes");
        }

        Ok(iloc)
    }

    fn add_item(&mut self, item: IlocItem) -> Result<()> {
        if self.by_id.contains_key(&item.item_id) {
            return Err(ParseError::DuplicateItem {
                typ: ILOC,
                what: format!("id {}", item.item_id),
            });
        }
        debug!(
            "iloc item {} method={} extents={}",
            item.item_id,
            item.construction_method,
            item.extents.len()
        );
        self.by_id.insert(item.item_id, self.items.len());
        self.items.push(item);
        Ok(())
    }
}

pub struct IlocFactory;

impl BoxFactory for IlocFactory {
    fn build(&self, r: &mut dyn Read, _ctx: &mut BuildContext<'_>) -> Result<Built> {
        let mut payload = Vec::new();
        r.read_to_end(&mut payload)?;
        Ok(Built::leaf(BoxValue::Iloc(IlocBox::parse(&payload)?)))
    }
}
