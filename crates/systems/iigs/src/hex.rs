//! Intel-HEX loading for test programs, plus the data-body exporter the
//! memory dumps use.
//!
//! Only record types 00 (data) and 01 (end-of-file) are accepted. The
//! checksum byte is the two's complement of the sum of length, address,
//! record type, and data bytes; any mismatch aborts the load.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HexError {
    #[error("line {line}: record does not start with ':'")]
    MissingColon { line: usize },
    #[error("line {line}: invalid hex digit")]
    InvalidDigit { line: usize },
    #[error("line {line}: record truncated")]
    Truncated { line: usize },
    #[error("line {line}: unsupported record type {kind:#04X}")]
    UnsupportedRecord { line: usize, kind: u8 },
    #[error("line {line}: checksum mismatch (expected {expected:#04X}, found {found:#04X})")]
    Checksum {
        line: usize,
        expected: u8,
        found: u8,
    },
    #[error("missing end-of-file record")]
    MissingEof,
}

const RECORD_DATA: u8 = 0x00;
const RECORD_EOF: u8 = 0x01;

fn parse_byte(digits: &[u8], line: usize) -> Result<u8, HexError> {
    let s = std::str::from_utf8(digits).map_err(|_| HexError::InvalidDigit { line })?;
    u8::from_str_radix(s, 16).map_err(|_| HexError::InvalidDigit { line })
}

/// Parse Intel-HEX `text` into a 64 KiB bank image. Record addresses wrap
/// within the bank. Returns on the EOF record; running past the end of the
/// text without one is an error.
pub fn load(text: &str, memory: &mut [u8]) -> Result<(), HexError> {
    debug_assert_eq!(memory.len(), 0x1_0000);

    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let bytes = trimmed.as_bytes();
        if bytes[0] != b':' {
            return Err(HexError::MissingColon { line });
        }
        let body = &bytes[1..];
        if body.len() < 10 {
            return Err(HexError::Truncated { line });
        }

        let length = parse_byte(&body[0..2], line)? as usize;
        let addr_hi = parse_byte(&body[2..4], line)?;
        let addr_lo = parse_byte(&body[4..6], line)?;
        let kind = parse_byte(&body[6..8], line)?;

        if body.len() < 10 + length * 2 {
            return Err(HexError::Truncated { line });
        }

        let mut checksum = (length as u8)
            .wrapping_add(addr_hi)
            .wrapping_add(addr_lo)
            .wrapping_add(kind);
        let address = ((addr_hi as u16) << 8) | addr_lo as u16;

        match kind {
            RECORD_DATA => {
                for i in 0..length {
                    let byte = parse_byte(&body[8 + i * 2..10 + i * 2], line)?;
                    checksum = checksum.wrapping_add(byte);
                    memory[(address as usize + i) & 0xFFFF] = byte;
                }
            }
            RECORD_EOF => {}
            _ => return Err(HexError::UnsupportedRecord { line, kind }),
        }

        let expected = checksum.wrapping_neg();
        let found = parse_byte(&body[8 + length * 2..10 + length * 2], line)?;
        if expected != found {
            return Err(HexError::Checksum {
                line,
                expected,
                found,
            });
        }

        if kind == RECORD_EOF {
            return Ok(());
        }
    }

    Err(HexError::MissingEof)
}

/// Emit the data-body hex digits for `byte_count` bytes starting at `addr`
/// (wrapping within the bank), returning the digits and the running byte
/// sum for the caller's checksum. At most 255 bytes fit one record.
pub fn encode_data_body(memory: &[u8], addr: u16, byte_count: usize) -> Option<(String, u8)> {
    if byte_count == 0 || byte_count > 255 {
        return None;
    }
    let mut out = String::with_capacity(byte_count * 2);
    let mut sum: u8 = 0;
    for i in 0..byte_count {
        let byte = memory[(addr as usize + i) & 0xFFFF];
        out.push_str(&format!("{:02X}", byte));
        sum = sum.wrapping_add(byte);
    }
    Some((out, sum))
}
