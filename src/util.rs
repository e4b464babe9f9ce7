use byteorder::{BigEndian, ReadBytesExt};
use log::debug;
use std::io::{self, Read, Seek, SeekFrom, Write};

pub fn read_slice<R: Read + Seek>(r: &mut R, offset: u64, len: u64) -> io::Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut v = Vec::new();
    r.take(len).read_to_end(&mut v)?;
    if (v.len() as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("wanted {len} bytes at {offset:#x}, got {}", v.len()),
        ));
    }
    Ok(v)
}

/// Copy exactly `len` bytes starting at `offset` into `out`.
pub fn copy_range<R: Read + Seek, W: Write + ?Sized>(
    r: &mut R,
    offset: u64,
    len: u64,
    out: &mut W,
) -> io::Result<u64> {
    r.seek(SeekFrom::Start(offset))?;
    let copied = io::copy(&mut r.take(len), out)?;
    if copied < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("wanted {len} bytes at {offset:#x}, got {copied}"),
        ));
    }
    Ok(copied)
}

/// Version byte and 24-bit flags that open every full box.
pub fn read_fullbox_header<R: Read + ?Sized>(r: &mut R) -> io::Result<(u8, u32)> {
    let version = r.read_u8()?;
    let flags = r.read_u24::<BigEndian>()?;
    Ok((version, flags))
}

/// Read a NUL-terminated UTF-8 string.
///
/// A string cut short by the end of the box is accepted; some writers drop
/// the final terminator.
pub fn read_cstring<R: Read + ?Sized>(r: &mut R) -> io::Result<String> {
    let mut bytes = Vec::new();
    loop {
        let mut b = [0u8; 1];
        if r.read(&mut b)? == 0 {
            if !bytes.is_empty() {
                debug!("unterminated string {:?}", String::from_utf8_lossy(&bytes));
            }
            break;
        }
        if b[0] == 0 {
            break;
        }
        bytes.push(b[0]);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Result of a hex dump operation containing the formatted hex output.
#[derive(Debug, serde::Serialize)]
pub struct HexDump {
    /// Starting offset of the dumped data
    pub offset: u64,
    /// Actual number of bytes that were read and dumped
    pub length: u64,
    /// Formatted hex dump with addresses and ASCII column
    pub hex: String,
}

/// Hex-dump up to `max_len` bytes at `offset`, never reading past `size`.
pub fn hex_range<R: Read + Seek>(
    r: &mut R,
    size: u64,
    offset: u64,
    max_len: u64,
) -> io::Result<HexDump> {
    let to_read = size.saturating_sub(offset).min(max_len);
    if to_read == 0 {
        return Ok(HexDump {
            offset,
            length: 0,
            hex: String::new(),
        });
    }

    let data = read_slice(r, offset, to_read)?;
    Ok(HexDump {
        offset,
        length: to_read,
        hex: hex_dump(&data, offset),
    })
}

pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{:02x} ", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", offs, hexs, ascii));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn cstring_stops_at_nul() {
        let mut cur = Cursor::new(b"abc\0def\0".to_vec());
        assert_eq!(read_cstring(&mut cur).unwrap(), "abc");
        assert_eq!(read_cstring(&mut cur).unwrap(), "def");
        assert_eq!(read_cstring(&mut cur).unwrap(), "");
    }

    #[test]
    fn cstring_accepts_missing_terminator() {
        let mut cur = Cursor::new(b"tail".to_vec());
        assert_eq!(read_cstring(&mut cur).unwrap(), "tail");
    }

    #[test]
    fn fullbox_header_splits_version_and_flags() {
        let mut cur = Cursor::new(vec![2, 0x01, 0x02, 0x03]);
        assert_eq!(read_fullbox_header(&mut cur).unwrap(), (2, 0x010203));
    }

    #[test]
    fn copy_range_rejects_short_source() {
        let mut cur = Cursor::new(vec![0u8; 10]);
        let mut out: Vec<u8> = Vec::new();
        assert!(copy_range(&mut cur, 8, 4, &mut out).is_err());
    }

    #[test]
    fn hex_range_clamps_to_size() {
        let mut cur = Cursor::new((0u8..32).collect::<Vec<_>>());
        let dump = hex_range(&mut cur, 32, 24, 32).unwrap();
        assert_eq!(dump.length, 8);
        assert!(dump.hex.starts_with("00000018"));
    }
}
