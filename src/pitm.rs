use crate::parser::{ParseError, Result};
use crate::registry::{BoxFactory, BoxValue, BuildContext, Built};
use crate::tree::typed_box;
use crate::util::read_fullbox_header;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

/// Primary Item Box (ISO 14496-12:2015 § 8.11.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PitmBox {
    pub version: u8,
    pub flags: u32,
    pub item_id: u32,
}
typed_box!(PitmBox, Pitm, "pitm");

pub struct PitmFactory;

impl BoxFactory for PitmFactory {
    fn build(&self, r: &mut dyn Read, ctx: &mut BuildContext<'_>) -> Result<Built> {
        let (version, flags) = read_fullbox_header(r)?;
        let item_id = match version {
            0 => r.read_u16::<BigEndian>()? as u32,
            1 => r.read_u32::<BigEndian>()?,
            _ => {
                return Err(ParseError::UnsupportedVersion {
                    typ: ctx.header().typ,
                    version,
                });
            }
        };

        Ok(Built::leaf(BoxValue::Pitm(PitmBox {
            version,
            flags,
            item_id,
        })))
    }
}
