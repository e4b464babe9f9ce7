#![allow(dead_code)]

use heifbox::{ParseError, Resource, default_registry};
use std::io::Cursor;

/// Box with a 32-bit size field.
pub fn bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

/// Box using the `size == 1` form with a 64-bit size after the type.
pub fn bx64(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&1u32.to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(&(16 + payload.len() as u64).to_be_bytes());
    v.extend_from_slice(payload);
    v
}

/// Full box: version and 24-bit flags, then `payload`.
pub fn full(typ: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut p = vec![version];
    p.extend_from_slice(&flags.to_be_bytes()[1..]);
    p.extend_from_slice(payload);
    bx(typ, &p)
}

pub fn cat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

/// Version 0 `infe`: 16-bit id, protection index 0, three strings.
pub fn infe_v0(id: u16, name: &str, content_type: &str, encoding: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&id.to_be_bytes());
    p.extend_from_slice(&0u16.to_be_bytes());
    for s in [name, content_type, encoding] {
        p.extend_from_slice(s.as_bytes());
        p.push(0);
    }
    full(b"infe", 0, 0, &p)
}

/// Version 2 `infe`: 16-bit id, protection index 0, item type, name.
pub fn infe_v2(id: u16, item_type: &[u8; 4], name: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&id.to_be_bytes());
    p.extend_from_slice(&0u16.to_be_bytes());
    p.extend_from_slice(item_type);
    p.extend_from_slice(name.as_bytes());
    p.push(0);
    full(b"infe", 2, 0, &p)
}

/// Version 0 `iinf` holding the given entries.
pub fn iinf_v0(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut p = (entries.len() as u16).to_be_bytes().to_vec();
    for e in entries {
        p.extend_from_slice(e);
    }
    full(b"iinf", 0, 0, &p)
}

/// Version 0 `iloc` with every width 4 and no index: items of
/// `(id, [(offset, length)])`, base offset 0.
pub fn iloc_v0(items: &[(u16, &[(u32, u32)])]) -> Vec<u8> {
    let mut p = vec![0x44, 0x40];
    p.extend_from_slice(&(items.len() as u16).to_be_bytes());
    for (id, extents) in items {
        p.extend_from_slice(&id.to_be_bytes());
        p.extend_from_slice(&0u16.to_be_bytes()); // data_reference_index
        p.extend_from_slice(&0u32.to_be_bytes()); // base_offset
        p.extend_from_slice(&(extents.len() as u16).to_be_bytes());
        for (off, len) in *extents {
            p.extend_from_slice(&off.to_be_bytes());
            p.extend_from_slice(&len.to_be_bytes());
        }
    }
    full(b"iloc", 0, 0, &p)
}

pub fn ftyp() -> Vec<u8> {
    let mut p = b"isom".to_vec();
    p.extend_from_slice(&0x200u32.to_be_bytes());
    p.extend_from_slice(b"iso2avc1mp41");
    bx(b"ftyp", &p)
}

pub fn open(data: &[u8]) -> Result<Resource, ParseError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let registry = default_registry().expect("default registry");
    let mut cur = Cursor::new(data.to_vec());
    Resource::open(&mut cur, data.len() as u64, &registry)
}
