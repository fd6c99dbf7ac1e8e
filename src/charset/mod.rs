pub mod tables;

use crate::error::EncodingError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Internal encoding of candidates. Legacy codepages map every byte to one
/// character; `Ascii` and `Utf8` have no usable 8-bit half.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Encoding {
    #[default]
    #[strum(to_string = "ascii")]
    #[serde(rename = "ascii")]
    Ascii,
    #[strum(to_string = "utf-8", serialize = "utf8")]
    #[serde(rename = "utf-8")]
    Utf8,
    #[strum(to_string = "iso-8859-1", serialize = "latin1")]
    #[serde(rename = "iso-8859-1")]
    Iso8859_1,
    #[strum(to_string = "iso-8859-15", serialize = "latin9")]
    #[serde(rename = "iso-8859-15")]
    Iso8859_15,
    #[strum(to_string = "cp1252")]
    #[serde(rename = "cp1252")]
    Cp1252,
    #[strum(to_string = "koi8-r")]
    #[serde(rename = "koi8-r")]
    Koi8R,
}

impl Encoding {
    pub fn is_codepage(self) -> bool {
        !matches!(self, Encoding::Ascii | Encoding::Utf8)
    }

    /// Character a byte stands for, `None` for unassigned bytes and controls.
    pub fn decode_byte(self, b: u8) -> Option<char> {
        if b < 0x80 {
            return Some(b as char).filter(|c| !c.is_control());
        }
        let code = match self {
            Encoding::Ascii | Encoding::Utf8 => return None,
            Encoding::Iso8859_1 => b as u32,
            Encoding::Iso8859_15 => tables::ISO_8859_15_OVERRIDES
                .iter()
                .find(|(byte, _)| *byte == b)
                .map_or(b as u32, |(_, cp)| *cp as u32),
            Encoding::Cp1252 => {
                if b < 0xA0 {
                    tables::CP1252_C1[(b - 0x80) as usize] as u32
                } else {
                    b as u32
                }
            }
            Encoding::Koi8R => tables::KOI8_R_HIGH[(b - 0x80) as usize] as u32,
        };
        char::from_u32(code).filter(|c| *c != '\0' && !c.is_control())
    }

    /// Byte representing `c`, searching the high half only for non-ASCII input.
    pub fn encode_char(self, c: char) -> Option<u8> {
        if c.is_ascii() {
            return Some(c as u8);
        }
        (0x80..=0xFFu8).find(|&b| self.decode_byte(b) == Some(c))
    }

    fn high_half(self) -> impl Iterator<Item = (u8, char)> {
        (0x80..=0xFFu8).filter_map(move |b| self.decode_byte(b).map(|c| (b, c)))
    }

    fn high_lower(self) -> Vec<u8> {
        self.high_half()
            .filter(|(_, c)| c.is_alphabetic() && !c.is_uppercase())
            .map(|(b, _)| b)
            .collect()
    }

    fn high_upper(self) -> Vec<u8> {
        self.high_half()
            .filter(|(_, c)| c.is_alphabetic() && !c.is_lowercase())
            .map(|(b, _)| b)
            .collect()
    }

    fn high_alpha(self) -> Vec<u8> {
        self.high_half()
            .filter(|(_, c)| c.is_alphabetic())
            .map(|(b, _)| b)
            .collect()
    }

    fn high_digits(self) -> Vec<u8> {
        self.high_half()
            .filter(|(_, c)| c.is_numeric())
            .map(|(b, _)| b)
            .collect()
    }

    fn high_specials(self) -> Vec<u8> {
        self.high_half()
            .filter(|(_, c)| !c.is_alphanumeric())
            .map(|(b, _)| b)
            .collect()
    }

    /// Swaps the case of a single byte, leaving caseless bytes alone.
    pub fn toggle_case(self, b: u8) -> u8 {
        if b.is_ascii() {
            return if b.is_ascii_lowercase() {
                b.to_ascii_uppercase()
            } else {
                b.to_ascii_lowercase()
            };
        }
        let Some(c) = self.decode_byte(b) else {
            return b;
        };
        let mut swapped: Vec<char> = if c.is_lowercase() {
            c.to_uppercase().collect()
        } else {
            c.to_lowercase().collect()
        };
        // ß upper-cases to "SS", which is not a single byte anywhere.
        match (swapped.pop(), swapped.is_empty()) {
            (Some(s), true) => self.encode_char(s).unwrap_or(b),
            _ => b,
        }
    }

    /// Converts UTF-8 text to the internal encoding. ASCII passes through
    /// unchanged; multi-byte characters need a legacy codepage.
    pub fn from_utf8(self, text: &str) -> Result<Vec<u8>, EncodingError> {
        if text.is_ascii() {
            return Ok(text.as_bytes().to_vec());
        }
        if !self.is_codepage() {
            return Err(EncodingError::CodepageRequired);
        }
        text.chars()
            .map(|c| {
                self.encode_char(c).ok_or(EncodingError::Unmappable {
                    code: c as u32,
                    encoding: self.to_string(),
                })
            })
            .collect()
    }

    /// Inverse of [`Encoding::from_utf8`], used to print candidates.
    pub fn to_utf8_lossy(self, bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|&b| self.decode_byte(b).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

/// Expands a built-in placeholder symbol into its member bytes.
///
/// Case-insensitive consumers get `u`/`U` folded onto `l`/`L`, so duplicate
/// work is never generated for them. The result carries no duplicates and
/// keeps first-seen order.
pub fn class_members(
    symbol: u8,
    encoding: Encoding,
    case_sensitive: bool,
) -> Result<Vec<u8>, EncodingError> {
    let symbol = match symbol {
        b'u' if !case_sensitive => b'l',
        b'U' if !case_sensitive => b'L',
        s => s,
    };

    if matches!(symbol, b'L' | b'U' | b'D' | b'S') && !encoding.is_codepage() {
        return Err(EncodingError::EncodingRequired {
            symbol: symbol as char,
            encoding: encoding.to_string(),
        });
    }

    let members: Vec<u8> = match symbol {
        b'l' => tables::LOWER.to_vec(),
        b'u' => tables::UPPER.to_vec(),
        b'd' => tables::DIGITS.to_vec(),
        b's' => tables::SPECIALS.to_vec(),
        b'L' => encoding.high_lower(),
        b'U' => encoding.high_upper(),
        b'D' => encoding.high_digits(),
        b'S' => encoding.high_specials(),
        b'h' => (b'0'..=b'9').chain(b'a'..=b'f').collect(),
        b'H' => (b'0'..=b'9').chain(b'A'..=b'F').collect(),
        b'b' => (0x01..=0xFF).collect(),
        b'B' => (0x80..=0xFF).collect(),
        b'a' => printable(case_sensitive).to_vec(),
        b'A' => {
            let mut all = printable(case_sensitive).to_vec();
            if encoding.is_codepage() {
                if case_sensitive {
                    all.extend(encoding.high_alpha());
                } else {
                    all.extend(encoding.high_lower());
                }
                all.extend(encoding.high_digits());
                all.extend(encoding.high_specials());
            }
            all
        }
        _ => Vec::new(),
    };

    Ok(members.into_iter().unique().collect())
}

/// True when `symbol` names a built-in class.
pub fn is_class_symbol(symbol: u8) -> bool {
    crate::consts::BUILT_IN_CHARSET.contains(&symbol)
}

fn printable(case_sensitive: bool) -> &'static [u8] {
    if case_sensitive {
        tables::PRINTABLE_CASED
    } else {
        tables::PRINTABLE_FOLDED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ascii_classes() {
        let l = class_members(b'l', Encoding::Ascii, true).unwrap();
        assert_eq!(l.len(), 26);
        assert_eq!(class_members(b'd', Encoding::Ascii, true).unwrap().len(), 10);
        assert_eq!(class_members(b'a', Encoding::Ascii, true).unwrap().len(), 95);
        assert_eq!(class_members(b'b', Encoding::Ascii, true).unwrap().len(), 255);
    }

    #[test]
    fn test_case_folding() {
        let folded = class_members(b'u', Encoding::Ascii, false).unwrap();
        assert_eq!(folded, tables::LOWER);
        let a = class_members(b'a', Encoding::Ascii, false).unwrap();
        assert!(a.iter().all(|b| !b.is_ascii_uppercase()));
    }

    #[test]
    fn test_legacy_class_needs_codepage() {
        let err = class_members(b'L', Encoding::Utf8, true).unwrap_err();
        assert!(matches!(err, EncodingError::EncodingRequired { symbol: 'L', .. }));
        assert!(class_members(b'L', Encoding::Iso8859_1, true).unwrap().contains(&0xE9));
    }

    #[test]
    fn test_latin1_classes() {
        let upper = class_members(b'U', Encoding::Iso8859_1, true).unwrap();
        assert!(upper.contains(&0xC9)); // É
        assert!(!upper.contains(&0xD7)); // ×
        let specials = class_members(b'S', Encoding::Iso8859_1, true).unwrap();
        assert!(specials.contains(&0xD7));
        let digits = class_members(b'D', Encoding::Iso8859_1, true).unwrap();
        assert!(digits.contains(&0xB2));
    }

    #[test]
    fn test_utf8_conversion() {
        assert_eq!(Encoding::Cp1252.from_utf8("€a").unwrap(), vec![0x80, b'a']);
        assert_eq!(Encoding::Koi8R.from_utf8("я").unwrap(), vec![0xD1]);
        assert_eq!(
            Encoding::Utf8.from_utf8("é"),
            Err(EncodingError::CodepageRequired)
        );
        assert!(matches!(
            Encoding::Iso8859_1.from_utf8("€"),
            Err(EncodingError::Unmappable { code: 0x20AC, .. })
        ));
    }

    #[test]
    fn test_toggle_case() {
        assert_eq!(Encoding::Ascii.toggle_case(b'a'), b'A');
        assert_eq!(Encoding::Ascii.toggle_case(b'7'), b'7');
        assert_eq!(Encoding::Iso8859_1.toggle_case(0xE9), 0xC9);
        assert_eq!(Encoding::Koi8R.toggle_case(0xC1), 0xE1);
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(Encoding::from_str("ISO-8859-1").unwrap(), Encoding::Iso8859_1);
        assert_eq!(Encoding::from_str("utf8").unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::Koi8R.to_string(), "koi8-r");
    }
}
