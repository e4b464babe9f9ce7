mod common;

use common::{bx, cat, ftyp, open};
use heifbox::hex_range;
use heifbox::known_boxes::full_name;
use heifbox::FourCC;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("heifbox_{name}_{}.bin", std::process::id()));
    let mut f = File::create(&path).unwrap();
    f.write_all(bytes).unwrap();
    path
}

#[test]
fn hex_range_reads_within_bounds() {
    let data = (0u8..64u8).collect::<Vec<_>>();
    let path = temp_file("hex_within", &data);
    let mut f = File::open(&path).unwrap();

    let dump = hex_range(&mut f, 64, 16, 16).expect("hex_range failed");

    assert_eq!(dump.offset, 16);
    assert_eq!(dump.length, 16);
    assert!(dump.hex.starts_with("00000010  10 11 12"));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn hex_range_clamps_to_eof() {
    let data = (0u8..32u8).collect::<Vec<_>>();
    let path = temp_file("hex_clamp", &data);
    let mut f = File::open(&path).unwrap();

    // ask past EOF
    let dump = hex_range(&mut f, 32, 24, 32).expect("hex_range failed");
    assert_eq!(dump.offset, 24);
    assert_eq!(dump.length, 8);

    let dump = hex_range(&mut f, 32, 40, 8).unwrap();
    assert_eq!(dump.length, 0);
    assert!(dump.hex.is_empty());
    std::fs::remove_file(path).unwrap();
}

#[test]
fn hex_range_of_an_indexed_payload() {
    let data = cat(&[&ftyp(), &bx(b"idat", b"HELLO")]);
    let res = open(&data).unwrap();
    let id = res.index().get("idat", 0).unwrap();
    let hdr = res.tree().header(id);

    let dump = hex_range(
        &mut std::io::Cursor::new(data.clone()),
        data.len() as u64,
        hdr.payload_offset(),
        hdr.payload_len(),
    )
    .unwrap();
    assert_eq!(dump.offset, 36);
    assert!(dump.hex.contains("|HELLO|"));
}

#[test]
fn display_names() {
    assert_eq!(full_name(FourCC(*b"ftyp")), "File Type Box");
    assert_eq!(full_name(FourCC(*b"iloc")), "Item Location Box");
    assert_eq!(full_name(FourCC(*b"zzzz")), "Unknown Box");
}
