//! Fixed-length text decoding for archive metadata.
//!
//! Neither format auto-detects encodings. ZIP names and comments are either
//! code-page text or UTF-8, chosen by general-purpose flag bit 11; ISO9660
//! identifiers are code-page text on a Primary volume and UCS-2 big-endian
//! (Joliet) on a Supplementary volume. Callers always pass the selector.

/// How a byte range should be turned into a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// 7-bit ASCII with the high half mapped through [`EXTENDED_ASCII`].
    ExtendedAscii,
    /// UTF-8, decoded lossily.
    Utf8,
    /// Big-endian UCS-2 pairs (Joliet identifiers).
    Ucs2Be,
}

/// Code page for bytes 0x80..=0xFF of "extended ASCII" text.
///
/// Glyphs with no sensible mapping render as '_'.
const EXTENDED_ASCII: [char; 128] = [
    '\u{C7}', '\u{FC}', '\u{E9}', '\u{E2}', '\u{E4}', '\u{E0}', '\u{E5}', '\u{E7}', //
    '\u{EA}', '\u{EB}', '\u{E8}', '\u{EF}', '\u{EE}', '\u{EC}', '\u{C4}', '\u{C5}', //
    '\u{C9}', '\u{E6}', '\u{C6}', '\u{F4}', '\u{F6}', '\u{F2}', '\u{FB}', '\u{F9}', //
    '\u{FF}', '\u{D6}', '\u{DC}', '\u{F8}', '\u{A3}', '\u{D8}', '\u{D7}', '\u{192}', //
    '\u{E1}', '\u{ED}', '\u{F3}', '\u{FA}', '\u{F1}', '\u{D1}', '\u{AA}', '\u{BA}', //
    '\u{BF}', '\u{AE}', '\u{AC}', '\u{BD}', '\u{BC}', '\u{A1}', '\u{AB}', '\u{BB}', //
    '_', '_', '_', '\u{A6}', '\u{A6}', '\u{C1}', '\u{C2}', '\u{C0}', //
    '\u{A9}', '\u{A6}', '\u{A6}', '+', '+', '\u{A2}', '\u{A5}', '+', //
    '+', '-', '-', '+', '-', '+', '\u{E3}', '\u{C3}', //
    '+', '+', '-', '-', '\u{A6}', '-', '+', '\u{A4}', //
    '\u{F0}', '\u{D0}', '\u{CA}', '\u{CB}', '\u{C8}', 'i', '\u{CD}', '\u{CE}', //
    '\u{CF}', '+', '+', '_', '_', '\u{A6}', '\u{CC}', '_', //
    '\u{D3}', '\u{DF}', '\u{D4}', '\u{D2}', '\u{F5}', '\u{D5}', '\u{B5}', '\u{FE}', //
    '\u{DE}', '\u{DA}', '\u{DB}', '\u{D9}', '\u{FD}', '\u{DD}', '\u{AF}', '\u{B4}', //
    '\u{AD}', '\u{B1}', '_', '\u{BE}', '\u{B6}', '\u{A7}', '\u{F7}', '\u{B8}', //
    '\u{B0}', '\u{A8}', '\u{B7}', '\u{B9}', '\u{B3}', '\u{B2}', '_', ' ', //
];

/// Decode a fixed-length byte range with an explicit encoding.
///
/// Zero-length input decodes to an empty string without touching the bytes.
/// In Joliet, a single-byte identifier is special: the root, current and
/// parent directory sentinels stay one byte even though everything else is
/// two bytes per character.
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    match encoding {
        TextEncoding::ExtendedAscii => bytes
            .iter()
            .map(|&b| {
                if b < 0x80 {
                    b as char
                } else {
                    EXTENDED_ASCII[(b - 0x80) as usize]
                }
            })
            .collect(),
        TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Ucs2Be => {
            if bytes.len() == 1 {
                return (bytes[0] as char).to_string();
            }
            // Length should be even; pessimistically floor just in case.
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
    }
}
