//! Simple fixed-layout boxes: file type, plain containers, handler and
//! header boxes, and payload-only boxes like `mdat`.

use crate::boxes::FourCC;
use crate::parser::{ParseError, Result};
use crate::registry::{BoxFactory, BoxValue, BuildContext, Built};
use crate::tree::typed_box;
use crate::util::{read_cstring, read_fullbox_header};
use byteorder::{BigEndian, ReadBytesExt};
use std::fmt;
use std::io::Read;

fn read_all(r: &mut dyn Read) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    Ok(buf)
}

fn lang_from_u16(code: u16) -> String {
    if code == 0 {
        return "und".to_string();
    }
    let c1 = ((code >> 10) & 0x1F) as u8 + 0x60;
    let c2 = ((code >> 5) & 0x1F) as u8 + 0x60;
    let c3 = (code & 0x1F) as u8 + 0x60;
    format!("{}{}{}", c1 as char, c2 as char, c3 as char)
}

// ---------- ftyp ----------

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FtypBox {
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
}
typed_box!(FtypBox, Ftyp, "ftyp");

impl fmt::Display for FtypBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "major={} minor={} compatible={:?}",
            self.major_brand, self.minor_version, self.compatible_brands
        )
    }
}

pub struct FtypFactory;

impl BoxFactory for FtypFactory {
    fn build(&self, r: &mut dyn Read, ctx: &mut BuildContext<'_>) -> Result<Built> {
        let buf = read_all(r)?;
        if buf.len() < 8 {
            return Err(ParseError::invalid(
                ctx.header().typ,
                format!("payload too short ({} bytes)", buf.len()),
            ));
        }

        let major_brand = FourCC([buf[0], buf[1], buf[2], buf[3]]);
        let minor_version = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let compatible_brands = buf[8..]
            .chunks_exact(4)
            .map(|c| FourCC([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Built::leaf(BoxValue::Ftyp(FtypBox {
            major_brand,
            minor_version,
            compatible_brands,
        })))
    }
}

// ---------- plain containers ----------

/// A box whose payload is nothing but child boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ContainerBox;
typed_box!(ContainerBox, Container, "container");

pub struct ContainerFactory;

impl BoxFactory for ContainerFactory {
    fn build(&self, _r: &mut dyn Read, _ctx: &mut BuildContext<'_>) -> Result<Built> {
        Ok(Built::with_children(BoxValue::Container(ContainerBox), 0))
    }
}

// ---------- meta ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetaBox {
    pub version: u8,
    pub flags: u32,
    /// QuickTime writes `meta` without the version/flags prefix.
    pub quicktime: bool,
}
typed_box!(MetaBox, Meta, "meta");

pub struct MetaFactory;

impl BoxFactory for MetaFactory {
    fn build(&self, r: &mut dyn Read, _ctx: &mut BuildContext<'_>) -> Result<Built> {
        let mut head = Vec::new();
        (&mut *r).take(8).read_to_end(&mut head)?;

        // In the QuickTime layout the first child's type sits where a full
        // box would have its first child's size.
        if head.len() == 8 && &head[4..8] == b"hdlr" {
            return Ok(Built::with_children(
                BoxValue::Meta(MetaBox {
                    version: 0,
                    flags: 0,
                    quicktime: true,
                }),
                0,
            ));
        }

        let mut prefix = head.as_slice();
        let (version, flags) = read_fullbox_header(&mut prefix)?;
        Ok(Built::with_children(
            BoxValue::Meta(MetaBox {
                version,
                flags,
                quicktime: false,
            }),
            4,
        ))
    }
}

// ---------- hdlr ----------

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HdlrBox {
    pub version: u8,
    pub flags: u32,
    pub handler_type: FourCC,
    pub name: String,
}
typed_box!(HdlrBox, Hdlr, "hdlr");

pub struct HdlrFactory;

impl BoxFactory for HdlrFactory {
    fn build(&self, r: &mut dyn Read, _ctx: &mut BuildContext<'_>) -> Result<Built> {
        let (version, flags) = read_fullbox_header(r)?;
        let _pre_defined = r.read_u32::<BigEndian>()?;
        let handler_type = FourCC::from(r.read_u32::<BigEndian>()?);
        let mut reserved = [0u8; 12];
        r.read_exact(&mut reserved)?;
        let name = read_cstring(r)?;

        Ok(Built::leaf(BoxValue::Hdlr(HdlrBox {
            version,
            flags,
            handler_type,
            name,
        })))
    }
}

// ---------- mvhd ----------

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MvhdBox {
    pub version: u8,
    pub timescale: u32,
    pub duration: u64,
}
typed_box!(MvhdBox, Mvhd, "mvhd");

pub struct MvhdFactory;

impl BoxFactory for MvhdFactory {
    fn build(&self, r: &mut dyn Read, ctx: &mut BuildContext<'_>) -> Result<Built> {
        let (version, _flags) = read_fullbox_header(r)?;
        let (timescale, duration) = match version {
            1 => {
                let _creation = r.read_u64::<BigEndian>()?;
                let _modification = r.read_u64::<BigEndian>()?;
                (r.read_u32::<BigEndian>()?, r.read_u64::<BigEndian>()?)
            }
            0 => {
                let _creation = r.read_u32::<BigEndian>()?;
                let _modification = r.read_u32::<BigEndian>()?;
                (r.read_u32::<BigEndian>()?, r.read_u32::<BigEndian>()? as u64)
            }
            _ => {
                return Err(ParseError::UnsupportedVersion {
                    typ: ctx.header().typ,
                    version,
                });
            }
        };

        Ok(Built::leaf(BoxValue::Mvhd(MvhdBox {
            version,
            timescale,
            duration,
        })))
    }
}

// ---------- tkhd ----------

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TkhdBox {
    pub version: u8,
    pub flags: u32,
    pub track_id: u32,
    pub duration: u64,
    pub width: f64,
    pub height: f64,
}
typed_box!(TkhdBox, Tkhd, "tkhd");

pub struct TkhdFactory;

impl BoxFactory for TkhdFactory {
    fn build(&self, r: &mut dyn Read, ctx: &mut BuildContext<'_>) -> Result<Built> {
        let (version, flags) = read_fullbox_header(r)?;
        let (track_id, duration) = match version {
            1 => {
                // creation_time (8), modification_time (8), track_id (4), reserved (4), duration (8)
                let _creation = r.read_u64::<BigEndian>()?;
                let _modification = r.read_u64::<BigEndian>()?;
                let track_id = r.read_u32::<BigEndian>()?;
                let _reserved = r.read_u32::<BigEndian>()?;
                (track_id, r.read_u64::<BigEndian>()?)
            }
            0 => {
                let _creation = r.read_u32::<BigEndian>()?;
                let _modification = r.read_u32::<BigEndian>()?;
                let track_id = r.read_u32::<BigEndian>()?;
                let _reserved = r.read_u32::<BigEndian>()?;
                (track_id, r.read_u32::<BigEndian>()? as u64)
            }
            _ => {
                return Err(ParseError::UnsupportedVersion {
                    typ: ctx.header().typ,
                    version,
                });
            }
        };

        // reserved[2], layer, alternate_group, volume, reserved, matrix
        let mut skip = [0u8; 8 + 8 + 36];
        r.read_exact(&mut skip)?;
        let width = r.read_u32::<BigEndian>()? as f64 / 65536.0;
        let height = r.read_u32::<BigEndian>()? as f64 / 65536.0;

        Ok(Built::leaf(BoxValue::Tkhd(TkhdBox {
            version,
            flags,
            track_id,
            duration,
            width,
            height,
        })))
    }
}

// ---------- mdhd ----------

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MdhdBox {
    pub version: u8,
    pub timescale: u32,
    pub duration: u64,
    pub language: String,
}
typed_box!(MdhdBox, Mdhd, "mdhd");

pub struct MdhdFactory;

impl BoxFactory for MdhdFactory {
    fn build(&self, r: &mut dyn Read, ctx: &mut BuildContext<'_>) -> Result<Built> {
        let (version, _flags) = read_fullbox_header(r)?;
        let (timescale, duration) = match version {
            1 => {
                let _creation = r.read_u64::<BigEndian>()?;
                let _modification = r.read_u64::<BigEndian>()?;
                (r.read_u32::<BigEndian>()?, r.read_u64::<BigEndian>()?)
            }
            0 => {
                let _creation = r.read_u32::<BigEndian>()?;
                let _modification = r.read_u32::<BigEndian>()?;
                (r.read_u32::<BigEndian>()?, r.read_u32::<BigEndian>()? as u64)
            }
            _ => {
                return Err(ParseError::UnsupportedVersion {
                    typ: ctx.header().typ,
                    version,
                });
            }
        };
        let language = lang_from_u16(r.read_u16::<BigEndian>()?);

        Ok(Built::leaf(BoxValue::Mdhd(MdhdBox {
            version,
            timescale,
            duration,
            language,
        })))
    }
}

// ---------- mdat / idat ----------

/// Where a payload-only box (`mdat`, `idat`) keeps its bytes. The payload
/// itself is never read during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DataBox {
    pub offset: u64,
    pub len: u64,
}
typed_box!(DataBox, Data, "data box");

pub struct DataFactory;

impl BoxFactory for DataFactory {
    fn build(&self, _r: &mut dyn Read, ctx: &mut BuildContext<'_>) -> Result<Built> {
        let hdr = ctx.header();
        Ok(Built::leaf(BoxValue::Data(DataBox {
            offset: hdr.payload_offset(),
            len: hdr.payload_len(),
        })))
    }
}
